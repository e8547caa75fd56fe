mod model;
mod sqlite;
mod task_storage;

use std::sync::Arc;

use thiserror::Error;

use crate::appsettings::{StorageKind, StorageSettings};

pub use model::{NewTask, TaskChanges};
pub use sqlite::SqliteTaskStorage;
pub use task_storage::{InMemoryTaskStorage, TaskStorage};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("storage worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("storage connection lock was poisoned")]
    Poisoned,

    #[error("stored {column} value {value:?} is invalid")]
    Corrupt { column: &'static str, value: String },
}

pub fn open(settings: &StorageSettings) -> Result<Arc<dyn TaskStorage>, StorageError> {
    match settings.kind {
        StorageKind::Memory => {
            log::warn!("Using in-memory task storage, tasks will be lost on shutdown");
            Ok(Arc::new(InMemoryTaskStorage::new()))
        }
        StorageKind::Sqlite => {
            log::info!("Opening sqlite task storage at {}", settings.path.display());
            Ok(Arc::new(SqliteTaskStorage::open(&settings.path)?))
        }
    }
}
