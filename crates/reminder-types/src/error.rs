use thiserror::Error;

use crate::models::{ReminderId, ReminderStatus, UserId};

/// Malformed input to `add_user` / `add_reminder`. Raised before any store write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("user name must not be empty")]
    EmptyName,

    #[error("reminder title must not be empty")]
    EmptyTitle,

    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("cannot parse due time: {0}")]
    InvalidDueTime(String),

    #[error("unknown notification channel: {0}")]
    UnknownChannel(String),

    #[error("unknown recurrence interval: {0}")]
    UnknownInterval(String),

    #[error("unknown reminder status: {0}")]
    UnknownStatus(String),

    #[error("recurring reminders need an interval")]
    MissingInterval,

    #[error("an interval was given for a non-recurring reminder")]
    UnexpectedInterval,
}

/// Failure of the underlying store: unreachable, constraint violated, or an
/// illegal status write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("user {0} not found")]
    UnknownUser(UserId),

    #[error("reminder {0} not found")]
    UnknownReminder(ReminderId),

    #[error("constraint violated: {0}")]
    Conflict(String),

    #[error("reminder {id} is already {status}")]
    NotPending { id: ReminderId, status: ReminderStatus },

    #[error("illegal status write for reminder {id}: {reason}")]
    IllegalTransition { id: ReminderId, reason: &'static str },

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Error surface of the user-facing add operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReminderError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
