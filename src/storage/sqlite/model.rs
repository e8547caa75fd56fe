use chrono::DateTime;

use crate::{
    storage::StorageError,
    task::{OwnerId, Task, TaskDate, TaskId, TaskTime},
};

pub(super) const TASK_COLUMNS: &str = "id, owner, text, completed, date, time, created_at, reminded";

#[derive(Debug, Clone, PartialEq)]
pub struct TaskStorageModel {
    pub id: String,
    pub owner: String,
    pub text: String,
    pub completed: bool,
    pub date: Option<String>,
    pub time: Option<String>,
    /// Microseconds since the unix epoch.
    pub created_at: i64,
    pub reminded: bool,
}

impl TaskStorageModel {
    /// Expects the columns in `TASK_COLUMNS` order.
    pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner: row.get(1)?,
            text: row.get(2)?,
            completed: row.get(3)?,
            date: row.get(4)?,
            time: row.get(5)?,
            created_at: row.get(6)?,
            reminded: row.get(7)?,
        })
    }
}

impl From<Task> for TaskStorageModel {
    fn from(value: Task) -> Self {
        Self {
            id: value.id.to_string(),
            owner: value.owner.as_str().to_owned(),
            text: value.text,
            completed: value.completed,
            date: value.date.map(|d| d.to_string()),
            time: value.time.map(|t| t.to_string()),
            created_at: value.created_at.timestamp_micros(),
            reminded: value.reminded,
        }
    }
}

impl TryFrom<TaskStorageModel> for Task {
    type Error = StorageError;

    fn try_from(value: TaskStorageModel) -> Result<Self, Self::Error> {
        let id = TaskId::parse_str(&value.id).map_err(|_| corrupt("id", &value.id))?;
        let date = value
            .date
            .map(|d| d.parse::<TaskDate>().map_err(|_| corrupt("date", &d)))
            .transpose()?;
        let time = value
            .time
            .map(|t| t.parse::<TaskTime>().map_err(|_| corrupt("time", &t)))
            .transpose()?;
        let created_at = DateTime::from_timestamp_micros(value.created_at)
            .ok_or_else(|| corrupt("created_at", &value.created_at.to_string()))?;

        Ok(Self {
            id,
            owner: OwnerId::new(value.owner),
            text: value.text,
            completed: value.completed,
            date,
            time,
            created_at,
            reminded: value.reminded,
        })
    }
}

fn corrupt(column: &'static str, value: &str) -> StorageError {
    StorageError::Corrupt {
        column,
        value: value.to_owned(),
    }
}
