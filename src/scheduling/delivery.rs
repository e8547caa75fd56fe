use async_trait::async_trait;

use crate::task::{OwnerId, Task, TaskDate, TaskId, TaskTime};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderNotification {
    pub owner: OwnerId,
    pub task_id: TaskId,
    pub text: String,
    pub date: TaskDate,
    pub time: TaskTime,
}

impl ReminderNotification {
    pub fn for_task(task: &Task, date: TaskDate, time: TaskTime) -> Self {
        Self {
            owner: task.owner.clone(),
            task_id: task.id,
            text: task.text.clone(),
            date,
            time,
        }
    }
}

#[async_trait]
pub trait ReminderDeliveryChannel: Send + Sync + 'static {
    async fn send_reminder_notification(
        &self,
        notification: &ReminderNotification,
    ) -> anyhow::Result<()>;
}

/// Writes every reminder to the log. Stands in for a real channel.
pub struct LogDeliveryChannel;

#[async_trait]
impl ReminderDeliveryChannel for LogDeliveryChannel {
    async fn send_reminder_notification(
        &self,
        notification: &ReminderNotification,
    ) -> anyhow::Result<()> {
        log::info!(
            "Reminder for owner {}: \"{}\" is due at {} {}",
            notification.owner,
            notification.text,
            notification.date,
            notification.time
        );
        Ok(())
    }
}
