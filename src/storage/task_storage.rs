use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::task::{OwnerId, Task, TaskDate, TaskId, TaskTime};

use super::{NewTask, StorageError, model::TaskChanges};

/// Every accessor that addresses a single task takes the owner as well, so a
/// task belonging to someone else is indistinguishable from a missing one.
#[async_trait]
pub trait TaskStorage: Send + Sync {
    async fn insert(&self, task: NewTask) -> Result<Task, StorageError>;
    /// Newest first.
    async fn get_all_owner_tasks(&self, owner: &OwnerId) -> Result<Vec<Task>, StorageError>;
    async fn get(&self, owner: &OwnerId, id: TaskId) -> Result<Option<Task>, StorageError>;
    async fn update(
        &self,
        owner: &OwnerId,
        id: TaskId,
        changes: TaskChanges,
    ) -> Result<Option<Task>, StorageError>;
    /// Returns whether a task was removed.
    async fn delete(&self, owner: &OwnerId, id: TaskId) -> Result<bool, StorageError>;
    /// Unreminded tasks scheduled exactly at `date` and `time`, across all owners.
    async fn get_due_tasks(
        &self,
        date: &TaskDate,
        time: &TaskTime,
    ) -> Result<Vec<Task>, StorageError>;
    /// Flags `task` as reminded if it is still stored with the schedule it had
    /// when it was read. Returns whether the flag was written.
    async fn mark_reminded(&self, task: &Task) -> Result<bool, StorageError>;
}

struct StoredTask {
    seq: u64,
    task: Task,
}

#[derive(Default)]
struct InMemoryTaskStore {
    next_seq: u64,
    tasks: HashMap<TaskId, StoredTask>,
}

impl InMemoryTaskStore {
    fn owned_mut(&mut self, owner: &OwnerId, id: TaskId) -> Option<&mut Task> {
        self.tasks
            .get_mut(&id)
            .map(|stored| &mut stored.task)
            .filter(|task| &task.owner == owner)
    }
}

pub struct InMemoryTaskStorage {
    store: RwLock<InMemoryTaskStore>,
}

impl InMemoryTaskStorage {
    pub fn new() -> Self {
        InMemoryTaskStorage {
            store: RwLock::new(InMemoryTaskStore::default()),
        }
    }
}

impl Default for InMemoryTaskStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStorage for InMemoryTaskStorage {
    async fn insert(&self, task: NewTask) -> Result<Task, StorageError> {
        let mut store = self.store.write().await;
        let seq = store.next_seq;
        let NewTask {
            owner,
            text,
            date,
            time,
            created_at,
        } = task;
        let task_insert = Task {
            id: TaskId::new_v4(),
            owner,
            text,
            completed: false,
            date,
            time,
            created_at,
            reminded: false,
        };

        store.tasks.insert(
            task_insert.id,
            StoredTask {
                seq,
                task: task_insert.clone(),
            },
        );
        store.next_seq += 1;

        log::debug!("Inserted task {} for owner {}", task_insert.id, task_insert.owner);
        Ok(task_insert)
    }

    async fn get_all_owner_tasks(&self, owner: &OwnerId) -> Result<Vec<Task>, StorageError> {
        let store = self.store.read().await;
        let mut owned: Vec<&StoredTask> = store
            .tasks
            .values()
            .filter(|stored| &stored.task.owner == owner)
            .collect();
        owned.sort_by(|a, b| {
            b.task
                .created_at
                .cmp(&a.task.created_at)
                .then(b.seq.cmp(&a.seq))
        });

        Ok(owned.into_iter().map(|stored| stored.task.clone()).collect())
    }

    async fn get(&self, owner: &OwnerId, id: TaskId) -> Result<Option<Task>, StorageError> {
        let store = self.store.read().await;
        Ok(store
            .tasks
            .get(&id)
            .map(|stored| &stored.task)
            .filter(|task| &task.owner == owner)
            .cloned())
    }

    async fn update(
        &self,
        owner: &OwnerId,
        id: TaskId,
        changes: TaskChanges,
    ) -> Result<Option<Task>, StorageError> {
        let mut store = self.store.write().await;
        match store.owned_mut(owner, id) {
            Some(task) => {
                changes.apply_to(task);
                Ok(Some(task.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, owner: &OwnerId, id: TaskId) -> Result<bool, StorageError> {
        let mut store = self.store.write().await;
        if store.owned_mut(owner, id).is_none() {
            return Ok(false);
        }

        Ok(store.tasks.remove(&id).is_some())
    }

    async fn get_due_tasks(
        &self,
        date: &TaskDate,
        time: &TaskTime,
    ) -> Result<Vec<Task>, StorageError> {
        let store = self.store.read().await;
        Ok(store
            .tasks
            .values()
            .filter(|stored| stored.task.is_due_at(date, time))
            .map(|stored| stored.task.clone())
            .collect())
    }

    async fn mark_reminded(&self, task: &Task) -> Result<bool, StorageError> {
        let mut store = self.store.write().await;
        match store.owned_mut(&task.owner, task.id) {
            Some(stored) if stored.date == task.date && stored.time == task.time => {
                stored.reminded = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
