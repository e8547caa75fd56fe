use std::{sync::Arc, time::Duration};

use chrono::{DateTime, TimeDelta, Timelike, Utc};
use tokio::{
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use super::scanner::DueReminderScanner;

/// Handle to the background scanner loop.
pub struct ScannerHandle {
    task_handle: JoinHandle<()>,
    cancellation_token: CancellationToken,
}

impl ScannerHandle {
    pub fn new(task_handle: JoinHandle<()>, cancellation_token: CancellationToken) -> Self {
        Self {
            task_handle,
            cancellation_token,
        }
    }

    /// Stops the loop, waiting up to `timeout` for an in-flight tick.
    pub async fn shutdown(self, timeout: Duration) {
        self.cancellation_token.cancel();
        if time::timeout(timeout, self.task_handle).await.is_err() {
            log::warn!("Reminder scanner did not stop within {:?}", timeout);
        }
    }
}

pub struct ReminderScheduler;

impl ReminderScheduler {
    /// Runs `scanner` every `period`, starting at the next half-minute mark so
    /// clock slew cannot push a tick across a minute boundary.
    /// Ticks run one after another; a tick that overruns makes the loop skip
    /// the missed ones instead of firing them in a burst.
    pub fn spawn(
        scanner: Arc<DueReminderScanner>,
        period: Duration,
        cancellation_token: CancellationToken,
    ) -> ScannerHandle {
        let task_cancellation_token = cancellation_token.child_token();
        let first_tick = Self::get_delay_to_mid_minute(scanner.clock().now());

        log::info!(
            "Starting reminder scanner. [period = {:?}, first tick in {:?}]",
            period,
            first_tick
        );

        let task_handle = tokio::spawn(async move {
            Self::run(scanner, first_tick, period, task_cancellation_token).await;
        });

        ScannerHandle::new(task_handle, cancellation_token)
    }

    async fn run(
        scanner: Arc<DueReminderScanner>,
        first_tick: Duration,
        period: Duration,
        cancellation_token: CancellationToken,
    ) {
        let mut interval = time::interval_at(Instant::now() + first_tick, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancellation_token.cancelled() => {
                    log::info!("Reminder scanner shutting down");
                    break;
                }
                _ = interval.tick() => {
                    match scanner.tick().await {
                        Ok(report) if report.due > 0 => log::info!(
                            "Reminder tick finished. [due = {}, reminded = {}, failed = {}]",
                            report.due,
                            report.reminded,
                            report.failed
                        ),
                        Ok(_) => log::trace!("Reminder tick found nothing due"),
                        Err(error) => log::error!("Reminder tick failed: {}", error),
                    }
                }
            }
        }
    }

    pub(super) fn get_delay_to_mid_minute(now: DateTime<Utc>) -> Duration {
        let into_minute = TimeDelta::seconds(now.second() as i64)
            + TimeDelta::nanoseconds(now.nanosecond() as i64);
        let mid_minute = TimeDelta::seconds(30);

        let delay = if into_minute <= mid_minute {
            mid_minute - into_minute
        } else {
            TimeDelta::minutes(1) + mid_minute - into_minute
        };
        delay.to_std().unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::Clock,
        scheduling::scanner::DueReminderScanner,
        storage::{InMemoryTaskStorage, NewTask, TaskStorage},
        task::OwnerId,
        test_utils::{PausedClock, RecordingDeliveryChannel, utc},
    };
    use chrono_tz::Tz;

    #[test]
    pub fn when_now_is_before_half_minute_delay_should_reach_it() {
        let now = utc(2025, 5, 31, 12, 0) + TimeDelta::seconds(15);

        let delay = ReminderScheduler::get_delay_to_mid_minute(now);

        assert_eq!(delay, Duration::from_secs(15));
    }

    #[test]
    pub fn when_now_is_past_half_minute_delay_should_reach_next_one() {
        let now = utc(2025, 5, 31, 12, 0) + TimeDelta::milliseconds(45_500);

        let delay = ReminderScheduler::get_delay_to_mid_minute(now);

        assert_eq!(delay, Duration::from_millis(44_500));
    }

    #[test]
    pub fn when_now_is_on_minute_boundary_delay_should_be_half_a_minute() {
        let on_boundary = ReminderScheduler::get_delay_to_mid_minute(utc(2025, 5, 31, 12, 0));
        let on_half_minute = ReminderScheduler::get_delay_to_mid_minute(
            utc(2025, 5, 31, 12, 0) + TimeDelta::seconds(30),
        );

        assert_eq!(on_boundary, Duration::from_secs(30));
        assert_eq!(on_half_minute, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    pub async fn when_running_scanner_should_fire_due_task_once_and_stop_on_shutdown() {
        let storage = Arc::new(InMemoryTaskStorage::new());
        let delivery = RecordingDeliveryChannel::new();
        let clock = Arc::new(PausedClock::starting_at(
            utc(2024, 1, 1, 8, 59) + TimeDelta::seconds(30),
        ));
        let task = storage
            .insert(NewTask {
                owner: OwnerId::new("alice"),
                text: "Standup".to_owned(),
                date: Some("2024-01-01".parse().unwrap()),
                time: Some("09:00".parse().unwrap()),
                created_at: clock.now(),
            })
            .await
            .unwrap();
        let scanner = Arc::new(DueReminderScanner::new(
            storage.clone(),
            Arc::new(delivery.clone()),
            clock.clone(),
            Tz::UTC,
        ));

        let handle =
            ReminderScheduler::spawn(scanner, Duration::from_secs(60), CancellationToken::new());

        time::sleep(Duration::from_secs(59)).await;
        assert!(delivery.sent().is_empty(), "09:00 is scanned at 09:00:30");

        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(delivery.sent().len(), 1);

        time::sleep(Duration::from_secs(180)).await;
        assert_eq!(delivery.sent().len(), 1, "Reminders do not repeat");

        handle.shutdown(Duration::from_secs(5)).await;
        let stored = storage.get(&task.owner, task.id).await.unwrap().unwrap();
        assert!(stored.reminded);
    }

    #[tokio::test(start_paused = true)]
    pub async fn when_parent_token_is_cancelled_loop_should_exit() {
        let delivery = RecordingDeliveryChannel::new();
        let scanner = Arc::new(DueReminderScanner::new(
            Arc::new(InMemoryTaskStorage::new()),
            Arc::new(delivery),
            Arc::new(PausedClock::starting_at(utc(2024, 1, 1, 9, 0))),
            Tz::UTC,
        ));
        let parent = CancellationToken::new();

        let handle = ReminderScheduler::spawn(scanner, Duration::from_secs(60), parent.child_token());
        parent.cancel();

        time::timeout(Duration::from_secs(1), handle.task_handle)
            .await
            .expect("Loop should stop once cancelled")
            .unwrap();
    }
}
