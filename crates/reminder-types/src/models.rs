use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Numeric identity of a user row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

/// Numeric identity of a reminder row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReminderId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for ReminderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for UserId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(UserId)
            .map_err(|_| ValidationError::InvalidId(s.to_string()))
    }
}

// -- Enums --

/// Transport a reminder is delivered over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannel {
    Console,
    Email,
    Chat,
}

impl NotificationChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationChannel::Console => "console",
            NotificationChannel::Email => "email",
            NotificationChannel::Chat => "chat",
        }
    }
}

impl fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationChannel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "console" => Ok(NotificationChannel::Console),
            "email" => Ok(NotificationChannel::Email),
            // Older databases and CLIs call the chat transport "telegram"
            "chat" | "telegram" => Ok(NotificationChannel::Chat),
            _ => Err(ValidationError::UnknownChannel(s.to_string())),
        }
    }
}

/// Lifecycle status of a single reminder row.
///
/// `Pending` is the only non-terminal status. A row leaves it exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderStatus {
    Pending,
    Sent,
    Failed,
}

impl ReminderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReminderStatus::Pending => "pending",
            ReminderStatus::Sent => "sent",
            ReminderStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ReminderStatus::Sent | ReminderStatus::Failed)
    }
}

impl fmt::Display for ReminderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReminderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReminderStatus::Pending),
            "sent" => Ok(ReminderStatus::Sent),
            "failed" => Ok(ReminderStatus::Failed),
            _ => Err(ValidationError::UnknownStatus(s.to_string())),
        }
    }
}

/// Fixed offset used to enroll the next occurrence of a recurring reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceInterval {
    Daily,
    Weekly,
    Monthly,
}

impl RecurrenceInterval {
    pub fn as_str(self) -> &'static str {
        match self {
            RecurrenceInterval::Daily => "daily",
            RecurrenceInterval::Weekly => "weekly",
            RecurrenceInterval::Monthly => "monthly",
        }
    }
}

impl fmt::Display for RecurrenceInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecurrenceInterval {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(RecurrenceInterval::Daily),
            "weekly" => Ok(RecurrenceInterval::Weekly),
            "monthly" => Ok(RecurrenceInterval::Monthly),
            _ => Err(ValidationError::UnknownInterval(s.to_string())),
        }
    }
}

// -- Records --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Option<String>,
    pub chat_id: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: ReminderId,
    pub user_id: UserId,
    pub title: String,
    pub message: Option<String>,
    pub due_at: DateTime<Utc>,
    pub channel: NotificationChannel,
    pub status: ReminderStatus,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    /// Stays `true` with `interval: None` when a stored interval could not be
    /// decoded; the scheduler reports that row instead of recurring it.
    pub recurring: bool,
    pub interval: Option<RecurrenceInterval>,
}

impl Reminder {
    /// Pending and due at or before `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == ReminderStatus::Pending && self.due_at <= now
    }

    /// The insert needed to enroll the next occurrence of this reminder.
    pub fn next_occurrence(&self, due_at: DateTime<Utc>) -> NewReminder {
        NewReminder {
            user_id: self.user_id,
            title: self.title.clone(),
            message: self.message.clone(),
            due_at,
            channel: self.channel,
            recurring: self.recurring,
            interval: self.interval,
        }
    }
}

/// Whether a due time falls in years 0000..=9999. Outside that range the
/// stored text form is no longer fixed width and stops sorting chronologically.
pub fn is_storable_due_time(at: DateTime<Utc>) -> bool {
    (0..=9999).contains(&at.year())
}

/// Insert payload for the users table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: Option<String>,
    pub chat_id: Option<String>,
}

/// Insert payload for the reminders table. Always created `pending`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReminder {
    pub user_id: UserId,
    pub title: String,
    pub message: Option<String>,
    pub due_at: DateTime<Utc>,
    pub channel: NotificationChannel,
    pub recurring: bool,
    pub interval: Option<RecurrenceInterval>,
}
