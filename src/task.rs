use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use thiserror::Error;

pub type TaskId = uuid::Uuid;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

/// Opaque identity of the user owning a task. Every read and write of a task is
/// scoped by this value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(inner: impl Into<String>) -> Self {
        Self(inner.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskFieldError {
    #[error("date must be formatted as YYYY-MM-DD, got {0:?}")]
    InvalidDate(String),

    #[error("time must be formatted as HH:MM, got {0:?}")]
    InvalidTime(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskDate(NaiveDate);

impl TaskDate {
    pub fn new(inner: NaiveDate) -> Self {
        Self(inner)
    }
}

impl FromStr for TaskDate {
    type Err = TaskFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
            .map(Self)
            .map_err(|_| TaskFieldError::InvalidDate(s.to_owned()))
    }
}

impl fmt::Display for TaskDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

/// Time of day with minute resolution. Seconds are dropped on construction so
/// that two values naming the same minute always compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskTime(NaiveTime);

impl TaskTime {
    pub fn new(inner: NaiveTime) -> Self {
        let normalized_time = inner
            .with_nanosecond(0)
            .and_then(|t| t.with_second(0))
            .expect("Zero seconds and nanoseconds are always valid.");
        Self(normalized_time)
    }
}

impl FromStr for TaskTime {
    type Err = TaskFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveTime::parse_from_str(s.trim(), TIME_FORMAT)
            .map(Self::new)
            .map_err(|_| TaskFieldError::InvalidTime(s.to_owned()))
    }
}

impl fmt::Display for TaskTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(TIME_FORMAT))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub owner: OwnerId,
    pub text: String,
    pub completed: bool,
    pub date: Option<TaskDate>,
    pub time: Option<TaskTime>,
    pub created_at: DateTime<Utc>,
    /// Set once a reminder has fired for the current `date`/`time` pair.
    pub reminded: bool,
}

impl Task {
    pub fn is_due_at(&self, date: &TaskDate, time: &TaskTime) -> bool {
        !self.reminded && self.date.as_ref() == Some(date) && self.time.as_ref() == Some(time)
    }
}
