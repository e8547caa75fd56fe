use chrono::{DateTime, Utc};

use crate::task::{OwnerId, Task, TaskDate, TaskTime};

pub struct NewTask {
    pub owner: OwnerId,
    pub text: String,
    pub date: Option<TaskDate>,
    pub time: Option<TaskTime>,
    pub created_at: DateTime<Utc>,
}

/// Partial update of a task. `None` means the field was not part of the
/// request and is left untouched; `Some(false)` for `completed` is a real value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskChanges {
    pub text: Option<String>,
    pub completed: Option<bool>,
    pub date: Option<TaskDate>,
    pub time: Option<TaskTime>,
}

impl TaskChanges {
    pub fn touches_schedule(&self) -> bool {
        self.date.is_some() || self.time.is_some()
    }

    pub fn apply_to(self, task: &mut Task) {
        let reschedule = self.touches_schedule();

        if let Some(text) = self.text {
            task.text = text;
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        if let Some(date) = self.date {
            task.date = Some(date);
        }
        if let Some(time) = self.time {
            task.time = Some(time);
        }
        // Rescheduling re-arms the reminder even when the value did not change.
        if reschedule {
            task.reminded = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskId;
    use chrono::{NaiveDate, NaiveTime};
    use proptest::prelude::*;

    fn reminded_task() -> Task {
        Task {
            id: TaskId::new_v4(),
            owner: OwnerId::new("alice"),
            text: "Call mom".to_owned(),
            completed: true,
            date: Some("2024-01-01".parse().unwrap()),
            time: Some("09:00".parse().unwrap()),
            created_at: Utc::now(),
            reminded: true,
        }
    }

    #[test]
    fn when_no_fields_are_present_task_should_be_unchanged() {
        let mut task = reminded_task();
        let before = task.clone();

        TaskChanges::default().apply_to(&mut task);

        assert_eq!(task, before);
    }

    #[test]
    fn when_completed_is_explicitly_false_it_should_be_applied() {
        let mut task = reminded_task();

        TaskChanges {
            completed: Some(false),
            ..Default::default()
        }
        .apply_to(&mut task);

        assert!(!task.completed);
        assert!(task.reminded, "Completion does not touch the reminder flag");
    }

    #[test]
    fn when_only_text_changes_reminder_should_stay_set() {
        let mut task = reminded_task();

        TaskChanges {
            text: Some("Call dad".to_owned()),
            ..Default::default()
        }
        .apply_to(&mut task);

        assert_eq!(task.text, "Call dad");
        assert!(task.reminded);
    }

    fn schedule_changes() -> impl Strategy<Value = TaskChanges> {
        let date = (2000i32..2100, 1u32..13, 1u32..29)
            .prop_map(|(y, m, d)| TaskDate::new(NaiveDate::from_ymd_opt(y, m, d).unwrap()));
        let time = (0u32..24, 0u32..60)
            .prop_map(|(h, m)| TaskTime::new(NaiveTime::from_hms_opt(h, m, 0).unwrap()));

        (
            proptest::option::of(date),
            proptest::option::of(time),
            any::<Option<bool>>(),
        )
            .prop_filter("date or time must be present", |(d, t, _)| {
                d.is_some() || t.is_some()
            })
            .prop_map(|(date, time, completed)| TaskChanges {
                text: None,
                completed,
                date,
                time,
            })
    }

    proptest! {
        #[test]
        fn test_schedule_change_always_resets_reminder(changes in schedule_changes(), same_value in any::<bool>()) {
            let mut task = reminded_task();
            let changes = if same_value {
                TaskChanges {
                    date: changes.date.and(task.date),
                    time: changes.time.and(task.time),
                    ..changes
                }
            } else {
                changes
            };

            changes.apply_to(&mut task);

            prop_assert!(!task.reminded);
        }
    }
}
