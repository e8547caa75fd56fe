use std::sync::Arc;

use thiserror::Error;

use crate::{
    clock::Clock,
    storage::{NewTask, StorageError, TaskChanges, TaskStorage},
    task::{OwnerId, Task, TaskDate, TaskFieldError, TaskId, TaskTime},
};

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    InvalidField(#[from] TaskFieldError),

    #[error("Todo not found")]
    NotFound,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub struct CreateTask {
    pub text: String,
    pub date: Option<TaskDate>,
    pub time: Option<TaskTime>,
}

/// Task operations on behalf of a single owner at a time. The owner is always
/// passed explicitly and forwarded to the store.
#[derive(Clone)]
pub struct TaskRepository {
    storage: Arc<dyn TaskStorage>,
    clock: Arc<dyn Clock>,
}

impl TaskRepository {
    pub fn new(storage: Arc<dyn TaskStorage>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    pub async fn list(&self, owner: &OwnerId) -> Result<Vec<Task>, TaskError> {
        Ok(self.storage.get_all_owner_tasks(owner).await?)
    }

    pub async fn get(&self, owner: &OwnerId, id: TaskId) -> Result<Task, TaskError> {
        self.storage
            .get(owner, id)
            .await?
            .ok_or(TaskError::NotFound)
    }

    pub async fn create(&self, owner: &OwnerId, task: CreateTask) -> Result<Task, TaskError> {
        let new_task = NewTask {
            owner: owner.clone(),
            text: normalize_text(task.text)?,
            date: task.date,
            time: task.time,
            created_at: self.clock.now(),
        };
        let created = self.storage.insert(new_task).await?;

        log::info!("Created task {} for owner {}", created.id, owner);
        Ok(created)
    }

    pub async fn update(
        &self,
        owner: &OwnerId,
        id: TaskId,
        changes: TaskChanges,
    ) -> Result<Task, TaskError> {
        let changes = TaskChanges {
            text: changes.text.map(normalize_text).transpose()?,
            ..changes
        };
        let reschedule = changes.touches_schedule();

        let updated = self
            .storage
            .update(owner, id, changes)
            .await?
            .ok_or(TaskError::NotFound)?;

        if reschedule {
            log::info!("Task {} rescheduled, reminder re-armed", id);
        }
        Ok(updated)
    }

    /// Succeeds whether or not the task existed.
    pub async fn delete(&self, owner: &OwnerId, id: TaskId) -> Result<(), TaskError> {
        if self.storage.delete(owner, id).await? {
            log::info!("Deleted task {} for owner {}", id, owner);
        } else {
            log::debug!("Delete of task {} for owner {} matched nothing", id, owner);
        }
        Ok(())
    }
}

fn normalize_text(text: String) -> Result<String, TaskError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(TaskError::Validation("text is required".to_owned()));
    }
    Ok(trimmed.to_owned())
}
