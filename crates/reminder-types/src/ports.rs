//! Interfaces the scheduler consumes.
//!
//! The store is the single source of truth for reminder status. Its calls are
//! blocking; callers on an async runtime treat them as short suspension points.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StorageError;
use crate::models::{NewReminder, NewUser, Reminder, ReminderId, ReminderStatus, User, UserId};

pub trait ReminderStore: Send + Sync {
    /// Insert a user. Duplicate email or chat id is a `StorageError::Conflict`.
    fn create_user(&self, user: &NewUser, created_at: DateTime<Utc>) -> Result<UserId, StorageError>;

    /// Insert a pending reminder. Fails with `UnknownUser` if the owner does not exist.
    fn create_reminder(
        &self,
        reminder: &NewReminder,
        created_at: DateTime<Utc>,
    ) -> Result<ReminderId, StorageError>;

    /// Every pending reminder with `due_at <= now`. Order is store-defined.
    fn fetch_due(&self, now: DateTime<Utc>) -> Result<Vec<Reminder>, StorageError>;

    /// Move a pending reminder to a terminal status.
    ///
    /// `Sent` requires `sent_at`; `Failed` must not carry one; rows that are not
    /// pending are rejected with `NotPending`.
    fn update_status(
        &self,
        id: ReminderId,
        status: ReminderStatus,
        sent_at: Option<DateTime<Utc>>,
    ) -> Result<(), StorageError>;

    fn fetch_user(&self, id: UserId) -> Result<Option<User>, StorageError>;

    fn fetch_reminder(&self, id: ReminderId) -> Result<Option<Reminder>, StorageError>;

    /// All reminders owned by a user, earliest due first.
    fn reminders_for_user(&self, id: UserId) -> Result<Vec<Reminder>, StorageError>;

    fn set_user_active(&self, id: UserId, active: bool) -> Result<(), StorageError>;
}

/// Checks shared by every store implementation before a status write.
pub fn check_status_write(
    id: ReminderId,
    status: ReminderStatus,
    sent_at: Option<DateTime<Utc>>,
) -> Result<(), StorageError> {
    match (status, sent_at) {
        (ReminderStatus::Pending, _) => Err(StorageError::IllegalTransition {
            id,
            reason: "cannot move a reminder back to pending",
        }),
        (ReminderStatus::Sent, None) => Err(StorageError::IllegalTransition {
            id,
            reason: "sent requires a sent time",
        }),
        (ReminderStatus::Failed, Some(_)) => Err(StorageError::IllegalTransition {
            id,
            reason: "failed must not carry a sent time",
        }),
        _ => Ok(()),
    }
}

/// Delivers one reminder to one user.
///
/// Never errors: transport problems (missing contact, missing credentials,
/// network failure) are logged by the implementation and reported as `false`.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, user: &User, reminder: &Reminder) -> bool;
}
