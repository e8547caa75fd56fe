use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::{
    clock::Clock,
    storage::{StorageError, TaskStorage},
    task::{TaskDate, TaskTime},
};

use super::delivery::{ReminderDeliveryChannel, ReminderNotification};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub due: usize,
    pub reminded: usize,
    pub failed: usize,
}

/// Finds unreminded tasks scheduled for the current minute, notifies their
/// owners and flags them so they fire only once per schedule.
///
/// Matching is exact on date and minute. A minute the scanner never observes
/// is never caught up on.
pub struct DueReminderScanner {
    storage: Arc<dyn TaskStorage>,
    delivery_channel: Arc<dyn ReminderDeliveryChannel>,
    clock: Arc<dyn Clock>,
    timezone: Tz,
}

impl DueReminderScanner {
    pub fn new(
        storage: Arc<dyn TaskStorage>,
        delivery_channel: Arc<dyn ReminderDeliveryChannel>,
        clock: Arc<dyn Clock>,
        timezone: Tz,
    ) -> Self {
        Self {
            storage,
            delivery_channel,
            clock,
            timezone,
        }
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub async fn tick(&self) -> Result<TickReport, StorageError> {
        self.scan_at(self.clock.now()).await
    }

    pub async fn scan_at(&self, now: DateTime<Utc>) -> Result<TickReport, StorageError> {
        let (date, time) = scan_moment(now, &self.timezone);
        let due_tasks = self.storage.get_due_tasks(&date, &time).await?;

        let mut report = TickReport {
            due: due_tasks.len(),
            ..Default::default()
        };

        for task in due_tasks {
            let notification = ReminderNotification::for_task(&task, date, time);
            if let Err(error) = self
                .delivery_channel
                .send_reminder_notification(&notification)
                .await
            {
                log::warn!(
                    "Could not deliver reminder. [task_id = {}, error = {:#}]",
                    task.id,
                    error
                );
            }

            match self.storage.mark_reminded(&task).await {
                Ok(true) => report.reminded += 1,
                Ok(false) => {
                    log::info!(
                        "Task changed while reminding, leaving flag untouched. [task_id = {}]",
                        task.id
                    );
                }
                Err(error) => {
                    report.failed += 1;
                    log::error!(
                        "Could not flag task as reminded. [task_id = {}, error = {}]",
                        task.id,
                        error
                    );
                }
            }
        }

        Ok(report)
    }
}

/// The calendar date and minute `now` falls on in `timezone`.
pub(crate) fn scan_moment(now: DateTime<Utc>, timezone: &Tz) -> (TaskDate, TaskTime) {
    let local = now.with_timezone(timezone).naive_local();
    (TaskDate::new(local.date()), TaskTime::new(local.time()))
}
