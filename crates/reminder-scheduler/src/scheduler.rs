use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use reminder_types::{
    NotificationChannel, Notifier, Reminder, ReminderStatus, ReminderStore, StorageError,
};
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::recurrence::next_due;

/// What a single tick did, counted per reminder.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// Reminders returned by the due query.
    pub due: usize,
    pub sent: usize,
    pub failed: usize,
    /// Owner missing or inactive. Left pending.
    pub skipped: usize,
    /// Store write failed or the notifier panicked. Left pending.
    pub errored: usize,
    /// New occurrences created for recurring reminders.
    pub rescheduled: usize,
}

/// Why [`ReminderScheduler::run`] stopped early.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("poll interval must be greater than zero")]
    ZeroInterval,

    #[error(transparent)]
    Store(#[from] StorageError),
}

/// Per-reminder failure. The reminder stays pending.
#[derive(Debug, Error)]
enum DispatchError {
    #[error("user lookup failed: {0}")]
    UserLookup(StorageError),

    #[error("{0} notifier panicked")]
    NotifierPanicked(NotificationChannel),

    #[error("failed to mark {status}: {source}")]
    StatusWrite {
        status: ReminderStatus,
        source: StorageError,
    },
}

enum Outcome {
    Sent { rescheduled: bool },
    Failed,
    Skipped,
}

/// Polls the store for due reminders and dispatches them through the notifier.
///
/// One instance per store. Ticks never overlap: [`run`](Self::run) awaits each
/// batch before waiting for the next interval.
pub struct ReminderScheduler {
    store: Arc<dyn ReminderStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    shutdown: CancellationToken,
}

impl ReminderScheduler {
    pub fn new(store: Arc<dyn ReminderStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self::with_clock(store, notifier, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn ReminderStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            notifier,
            clock,
            shutdown: CancellationToken::new(),
        }
    }

    /// Token that stops [`run`](Self::run) when cancelled. Hand clones to signal handlers.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Request a graceful stop. A batch in progress finishes first.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    /// One fetch-dispatch-update cycle.
    ///
    /// Only a failed due query is returned as an error. Everything that goes
    /// wrong with an individual reminder is logged, counted, and leaves that
    /// reminder pending.
    pub async fn tick(&self) -> Result<TickReport, StorageError> {
        let now = self.clock.now();
        let due = self.store.fetch_due(now)?;

        let mut report = TickReport {
            due: due.len(),
            ..TickReport::default()
        };
        if due.is_empty() {
            return Ok(report);
        }
        debug!(count = due.len(), %now, "processing due reminders");

        for reminder in &due {
            match self.process(reminder).await {
                Ok(Outcome::Sent { rescheduled }) => {
                    report.sent += 1;
                    if rescheduled {
                        report.rescheduled += 1;
                    }
                }
                Ok(Outcome::Failed) => report.failed += 1,
                Ok(Outcome::Skipped) => report.skipped += 1,
                Err(e) => {
                    report.errored += 1;
                    error!(reminder_id = %reminder.id, "reminder left pending: {}", e);
                }
            }
        }

        info!(
            due = report.due,
            sent = report.sent,
            failed = report.failed,
            skipped = report.skipped,
            errored = report.errored,
            rescheduled = report.rescheduled,
            "tick complete"
        );
        Ok(report)
    }

    async fn process(&self, reminder: &Reminder) -> Result<Outcome, DispatchError> {
        let user = match self.store.fetch_user(reminder.user_id) {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!(
                    reminder_id = %reminder.id,
                    user_id = %reminder.user_id,
                    "owner not found, will retry next tick"
                );
                return Ok(Outcome::Skipped);
            }
            Err(e) => return Err(DispatchError::UserLookup(e)),
        };
        if !user.active {
            debug!(reminder_id = %reminder.id, user_id = %user.id, "owner inactive, skipping");
            return Ok(Outcome::Skipped);
        }

        let delivered = AssertUnwindSafe(self.notifier.send(&user, reminder))
            .catch_unwind()
            .await
            .map_err(|_| DispatchError::NotifierPanicked(reminder.channel))?;

        if !delivered {
            self.store
                .update_status(reminder.id, ReminderStatus::Failed, None)
                .map_err(|source| DispatchError::StatusWrite {
                    status: ReminderStatus::Failed,
                    source,
                })?;
            warn!(reminder_id = %reminder.id, channel = %reminder.channel, "delivery failed");
            return Ok(Outcome::Failed);
        }

        let sent_at = self.clock.now();
        self.store
            .update_status(reminder.id, ReminderStatus::Sent, Some(sent_at))
            .map_err(|source| DispatchError::StatusWrite {
                status: ReminderStatus::Sent,
                source,
            })?;
        info!(reminder_id = %reminder.id, channel = %reminder.channel, "reminder sent");

        // The status write above is applied before the next occurrence exists
        let rescheduled = reminder.recurring && self.reschedule(reminder);
        Ok(Outcome::Sent { rescheduled })
    }

    fn reschedule(&self, reminder: &Reminder) -> bool {
        let Some(due_at) = next_due(reminder.due_at, reminder.interval) else {
            warn!(
                reminder_id = %reminder.id,
                interval = ?reminder.interval,
                "recurring reminder has no next occurrence, series stops here"
            );
            return false;
        };

        match self
            .store
            .create_reminder(&reminder.next_occurrence(due_at), self.clock.now())
        {
            Ok(next_id) => {
                info!(reminder_id = %reminder.id, %next_id, %due_at, "next occurrence scheduled");
                true
            }
            Err(e) => {
                error!(reminder_id = %reminder.id, "failed to schedule next occurrence: {}", e);
                false
            }
        }
    }

    /// Tick on a fixed cadence until stopped.
    ///
    /// The first tick runs immediately. If its due query fails the store is
    /// treated as unreachable and the error is returned. Later failures are
    /// logged and the loop keeps going. A zero interval is rejected.
    pub async fn run(&self, poll_interval: Duration) -> Result<(), SchedulerError> {
        if poll_interval.is_zero() {
            return Err(SchedulerError::ZeroInterval);
        }
        if self.shutdown.is_cancelled() {
            return Ok(());
        }
        info!(interval_secs = poll_interval.as_secs_f64(), "reminder scheduler started");

        if let Err(e) = self.tick().await {
            error!("store unreachable at scheduler start: {}", e);
            return Err(e.into());
        }

        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        interval.tick().await;

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                _ = interval.tick() => {}
            }

            if let Err(e) = self.tick().await {
                warn!("tick failed: {}", e);
            }
        }

        info!("reminder scheduler stopped");
        Ok(())
    }

    /// [`run`](Self::run) with the interval given in seconds.
    pub async fn start(&self, poll_interval_seconds: u64) -> Result<(), SchedulerError> {
        self.run(Duration::from_secs(poll_interval_seconds)).await
    }
}
