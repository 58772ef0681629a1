//! Row types that map directly to SQLite rows.
//! Distinct from reminder-types records so decoding failures stay in this crate.
use chrono::{DateTime, SecondsFormat, Utc};
use reminder_types::{Reminder, ReminderId, StorageError, User, UserId};
use tracing::warn;

pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub chat_id: Option<String>,
    pub active: bool,
    pub created_at: String,
}

pub struct ReminderRow {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub message: Option<String>,
    pub due_at: String,
    pub channel: String,
    pub status: String,
    pub created_at: String,
    pub sent_at: Option<String>,
    pub recurring: bool,
    pub recurrence_interval: Option<String>,
}

/// Fixed-width UTC text, so `ORDER BY` and `<=` on the column are chronological.
pub fn encode_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_ts(raw: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StorageError::Corrupt(format!("timestamp {:?}: {}", raw, e)))
}

impl TryFrom<UserRow> for User {
    type Error = StorageError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: UserId(row.id),
            name: row.name,
            email: row.email,
            chat_id: row.chat_id,
            active: row.active,
            created_at: decode_ts(&row.created_at)?,
        })
    }
}

impl TryFrom<ReminderRow> for Reminder {
    type Error = StorageError;

    fn try_from(row: ReminderRow) -> Result<Self, Self::Error> {
        let channel = row
            .channel
            .parse()
            .map_err(|e| StorageError::Corrupt(format!("reminder {}: {}", row.id, e)))?;
        let status = row
            .status
            .parse()
            .map_err(|e| StorageError::Corrupt(format!("reminder {}: {}", row.id, e)))?;

        // An unreadable interval is kept as "recurring without interval" so the
        // scheduler can report it when the row comes due.
        let interval = match row.recurrence_interval.as_deref() {
            None => None,
            Some(raw) => match raw.parse() {
                Ok(interval) => Some(interval),
                Err(_) => {
                    warn!(reminder_id = row.id, interval = raw, "unrecognized recurrence interval in store");
                    None
                }
            },
        };

        Ok(Reminder {
            id: ReminderId(row.id),
            user_id: UserId(row.user_id),
            title: row.title,
            message: row.message,
            due_at: decode_ts(&row.due_at)?,
            channel,
            status,
            created_at: decode_ts(&row.created_at)?,
            sent_at: row.sent_at.as_deref().map(decode_ts).transpose()?,
            recurring: row.recurring,
            interval,
        })
    }
}
