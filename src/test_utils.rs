use std::{
    collections::HashSet,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use tokio::time::Instant;

use crate::{
    clock::Clock,
    scheduling::delivery::{ReminderDeliveryChannel, ReminderNotification},
    storage::{NewTask, StorageError, TaskChanges, TaskStorage},
    task::{OwnerId, Task, TaskDate, TaskId, TaskTime},
};

pub fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .unwrap()
}

pub fn clock_at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> ManualClock {
    ManualClock::new(utc(year, month, day, hour, minute))
}

/// Clock that only moves when told to.
pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance(&self, delta: TimeDelta) {
        *self.0.lock().unwrap() += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

/// Wall clock driven by tokio's (pausable) clock, for tests running with
/// `start_paused = true`.
pub struct PausedClock {
    base: DateTime<Utc>,
    started: Instant,
}

impl PausedClock {
    pub fn starting_at(base: DateTime<Utc>) -> Self {
        Self {
            base,
            started: Instant::now(),
        }
    }
}

impl Clock for PausedClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = TimeDelta::from_std(self.started.elapsed()).unwrap();
        self.base + elapsed
    }
}

#[derive(Clone)]
pub struct RecordingDeliveryChannel {
    sent: Arc<Mutex<Vec<ReminderNotification>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingDeliveryChannel {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            failing: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn sent(&self) -> Vec<ReminderNotification> {
        self.sent.lock().unwrap().clone()
    }

    /// Records notifications but reports every delivery as failed.
    pub fn fail_deliveries(&self) {
        self.failing.store(true, Ordering::Relaxed);
    }
}

#[async_trait]
impl ReminderDeliveryChannel for RecordingDeliveryChannel {
    async fn send_reminder_notification(
        &self,
        notification: &ReminderNotification,
    ) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(notification.clone());
        if self.failing.load(Ordering::Relaxed) {
            anyhow::bail!("delivery channel is down");
        }
        Ok(())
    }
}

/// Delegates to an inner store but fails `mark_reminded` for chosen tasks.
pub struct FlakyStorage {
    inner: Arc<dyn TaskStorage>,
    failing: Mutex<HashSet<TaskId>>,
}

impl FlakyStorage {
    pub fn new(inner: Arc<dyn TaskStorage>) -> Self {
        Self {
            inner,
            failing: Mutex::new(HashSet::new()),
        }
    }

    pub fn fail_mark_reminded_for(&self, id: TaskId) {
        self.failing.lock().unwrap().insert(id);
    }
}

#[async_trait]
impl TaskStorage for FlakyStorage {
    async fn insert(&self, task: NewTask) -> Result<Task, StorageError> {
        self.inner.insert(task).await
    }

    async fn get_all_owner_tasks(&self, owner: &OwnerId) -> Result<Vec<Task>, StorageError> {
        self.inner.get_all_owner_tasks(owner).await
    }

    async fn get(&self, owner: &OwnerId, id: TaskId) -> Result<Option<Task>, StorageError> {
        self.inner.get(owner, id).await
    }

    async fn update(
        &self,
        owner: &OwnerId,
        id: TaskId,
        changes: TaskChanges,
    ) -> Result<Option<Task>, StorageError> {
        self.inner.update(owner, id, changes).await
    }

    async fn delete(&self, owner: &OwnerId, id: TaskId) -> Result<bool, StorageError> {
        self.inner.delete(owner, id).await
    }

    async fn get_due_tasks(
        &self,
        date: &TaskDate,
        time: &TaskTime,
    ) -> Result<Vec<Task>, StorageError> {
        self.inner.get_due_tasks(date, time).await
    }

    async fn mark_reminded(&self, task: &Task) -> Result<bool, StorageError> {
        if self.failing.lock().unwrap().contains(&task.id) {
            return Err(StorageError::Sqlite(rusqlite::Error::InvalidQuery));
        }
        self.inner.mark_reminded(task).await
    }
}
