use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    repository::{CreateTask, TaskError},
    storage::TaskChanges,
    task::{Task, TaskFieldError},
};

#[derive(Debug, Deserialize)]
pub struct CreateTodoRequest {
    pub text: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTodoRequest {
    pub text: Option<String>,
    pub completed: Option<bool>,
    pub date: Option<String>,
    pub time: Option<String>,
}

/// Wire shape of a task as the browser client expects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub text: String,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    pub user: String,
    pub created_at: DateTime<Utc>,
    pub reminded: bool,
}

impl From<Task> for TodoResponse {
    fn from(value: Task) -> Self {
        Self {
            id: value.id.to_string(),
            text: value.text,
            completed: value.completed,
            date: value.date.map(|d| d.to_string()),
            time: value.time.map(|t| t.to_string()),
            user: value.owner.as_str().to_owned(),
            created_at: value.created_at,
            reminded: value.reminded,
        }
    }
}

impl TryFrom<CreateTodoRequest> for CreateTask {
    type Error = TaskError;

    fn try_from(value: CreateTodoRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            text: value.text.unwrap_or_default(),
            date: parse_field(value.date)?,
            time: parse_field(value.time)?,
        })
    }
}

impl TryFrom<UpdateTodoRequest> for TaskChanges {
    type Error = TaskError;

    fn try_from(value: UpdateTodoRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            text: value.text,
            completed: value.completed,
            date: parse_field(value.date)?,
            time: parse_field(value.time)?,
        })
    }
}

/// Browser forms post untouched inputs as `""`, which counts as absent.
fn parse_field<T>(value: Option<String>) -> Result<Option<T>, TaskFieldError>
where
    T: FromStr<Err = TaskFieldError>,
{
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse().map(Some),
    }
}
