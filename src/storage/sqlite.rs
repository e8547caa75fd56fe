mod model;

use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::SubsecRound;
use model::{TASK_COLUMNS, TaskStorageModel};
use rusqlite::{Connection, OptionalExtension, params};
use tokio::task;

use crate::task::{OwnerId, Task, TaskDate, TaskId, TaskTime};

use super::{NewTask, StorageError, TaskChanges, TaskStorage};

const SCHEMA_SQL: &str = r#"
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS tasks (
    id         TEXT PRIMARY KEY,
    owner      TEXT NOT NULL,
    text       TEXT NOT NULL,
    completed  INTEGER NOT NULL DEFAULT 0,
    date       TEXT,               -- YYYY-MM-DD
    time       TEXT,               -- HH:MM
    created_at INTEGER NOT NULL,   -- microseconds since epoch
    reminded   INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_tasks_owner_created ON tasks(owner, created_at);
CREATE INDEX IF NOT EXISTS idx_tasks_due ON tasks(date, time, reminded);
"#;

/// Durable task store backed by a single SQLite file.
///
/// rusqlite is blocking, so every call runs on the blocking pool while holding
/// the connection mutex. Writes are therefore serialized.
pub struct SqliteTaskStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTaskStorage {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        Self::with_schema(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::with_schema(Connection::open_in_memory()?)
    }

    fn with_schema(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_connection<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StorageError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|_| StorageError::Poisoned)?;
            f(&mut *conn)
        })
        .await?
    }
}

fn select_owned(
    conn: &Connection,
    owner: &str,
    id: &str,
) -> Result<Option<Task>, StorageError> {
    let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1 AND owner = ?2");
    conn.query_row(&sql, params![id, owner], TaskStorageModel::from_row)
        .optional()?
        .map(Task::try_from)
        .transpose()
}

fn collect_tasks(
    stmt: &mut rusqlite::Statement<'_>,
    params: impl rusqlite::Params,
) -> Result<Vec<Task>, StorageError> {
    let rows = stmt.query_map(params, TaskStorageModel::from_row)?;

    let mut tasks = Vec::new();
    for row in rows {
        tasks.push(Task::try_from(row?)?);
    }
    Ok(tasks)
}

#[async_trait]
impl TaskStorage for SqliteTaskStorage {
    async fn insert(&self, task: NewTask) -> Result<Task, StorageError> {
        let NewTask {
            owner,
            text,
            date,
            time,
            created_at,
        } = task;
        let created = Task {
            id: TaskId::new_v4(),
            owner,
            text,
            completed: false,
            date,
            time,
            // Rows keep microseconds.
            created_at: created_at.trunc_subsecs(6),
            reminded: false,
        };
        let row = TaskStorageModel::from(created.clone());

        self.with_connection(move |conn| {
            conn.execute(
                "INSERT INTO tasks (id, owner, text, completed, date, time, created_at, reminded)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    row.id,
                    row.owner,
                    row.text,
                    row.completed,
                    row.date,
                    row.time,
                    row.created_at,
                    row.reminded
                ],
            )?;
            Ok(())
        })
        .await?;

        log::debug!("Inserted task {} for owner {}", created.id, created.owner);
        Ok(created)
    }

    async fn get_all_owner_tasks(&self, owner: &OwnerId) -> Result<Vec<Task>, StorageError> {
        let owner = owner.as_str().to_owned();
        self.with_connection(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TASK_COLUMNS} FROM tasks WHERE owner = ?1 ORDER BY created_at DESC, rowid DESC"
            ))?;
            collect_tasks(&mut stmt, params![owner])
        })
        .await
    }

    async fn get(&self, owner: &OwnerId, id: TaskId) -> Result<Option<Task>, StorageError> {
        let owner = owner.as_str().to_owned();
        self.with_connection(move |conn| select_owned(conn, &owner, &id.to_string()))
            .await
    }

    async fn update(
        &self,
        owner: &OwnerId,
        id: TaskId,
        changes: TaskChanges,
    ) -> Result<Option<Task>, StorageError> {
        let owner = owner.as_str().to_owned();
        self.with_connection(move |conn| {
            let tx = conn.transaction()?;
            let Some(mut task) = select_owned(&tx, &owner, &id.to_string())? else {
                return Ok(None);
            };

            changes.apply_to(&mut task);
            let row = TaskStorageModel::from(task.clone());
            tx.execute(
                "
UPDATE tasks
SET text = ?1,
    completed = ?2,
    date = ?3,
    time = ?4,
    reminded = ?5
WHERE id = ?6 AND owner = ?7
",
                params![
                    row.text,
                    row.completed,
                    row.date,
                    row.time,
                    row.reminded,
                    row.id,
                    row.owner
                ],
            )?;
            tx.commit()?;

            Ok(Some(task))
        })
        .await
    }

    async fn delete(&self, owner: &OwnerId, id: TaskId) -> Result<bool, StorageError> {
        let owner = owner.as_str().to_owned();
        self.with_connection(move |conn| {
            let removed = conn.execute(
                "DELETE FROM tasks WHERE id = ?1 AND owner = ?2",
                params![id.to_string(), owner],
            )?;
            Ok(removed > 0)
        })
        .await
    }

    async fn get_due_tasks(
        &self,
        date: &TaskDate,
        time: &TaskTime,
    ) -> Result<Vec<Task>, StorageError> {
        let date = date.to_string();
        let time = time.to_string();
        self.with_connection(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TASK_COLUMNS} FROM tasks WHERE date = ?1 AND time = ?2 AND reminded = 0"
            ))?;
            collect_tasks(&mut stmt, params![date, time])
        })
        .await
    }

    async fn mark_reminded(&self, task: &Task) -> Result<bool, StorageError> {
        let row = TaskStorageModel::from(task.clone());
        self.with_connection(move |conn| {
            let updated = conn.execute(
                "
UPDATE tasks
SET reminded = 1
WHERE id = ?1 AND owner = ?2 AND date IS ?3 AND time IS ?4
",
                params![row.id, row.owner, row.date, row.time],
            )?;
            Ok(updated > 0)
        })
        .await
    }
}
