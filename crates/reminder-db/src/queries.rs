use crate::Database;
use crate::models::{ReminderRow, UserRow, encode_ts};
use chrono::{DateTime, Utc};
use reminder_types::{
    NewReminder, NewUser, Reminder, ReminderId, ReminderStatus, ReminderStore, StorageError, User,
    UserId, check_status_write,
};
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::error;

const USER_COLUMNS: &str = "id, name, email, chat_id, active, created_at";

const REMINDER_COLUMNS: &str = "id, user_id, title, message, due_at, channel, status, \
     created_at, sent_at, recurring, recurrence_interval";

/// Result of a guarded `UPDATE ... WHERE status = 'pending'`.
enum StatusWrite {
    Applied,
    Missing,
    Blocked(String),
}

impl ReminderStore for Database {
    // -- Users --

    fn create_user(&self, user: &NewUser, created_at: DateTime<Utc>) -> Result<UserId, StorageError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (name, email, chat_id, active, created_at) VALUES (?1, ?2, ?3, 1, ?4)",
                rusqlite::params![user.name, user.email, user.chat_id, encode_ts(created_at)],
            )?;
            Ok(UserId(conn.last_insert_rowid()))
        })
    }

    fn fetch_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        self.with_conn(|conn| query_user(conn, id))?
            .map(User::try_from)
            .transpose()
    }

    fn set_user_active(&self, id: UserId, active: bool) -> Result<(), StorageError> {
        let changed = self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET active = ?2 WHERE id = ?1",
                rusqlite::params![id.0, active],
            )
        })?;
        if changed == 0 {
            return Err(StorageError::UnknownUser(id));
        }
        Ok(())
    }

    // -- Reminders --

    fn create_reminder(
        &self,
        reminder: &NewReminder,
        created_at: DateTime<Utc>,
    ) -> Result<ReminderId, StorageError> {
        let inserted = self.with_conn(|conn| {
            let owner_exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
                [reminder.user_id.0],
                |row| row.get(0),
            )?;
            if !owner_exists {
                return Ok(None);
            }

            conn.execute(
                "INSERT INTO reminders
                    (user_id, title, message, due_at, channel, status, created_at, recurring, recurrence_interval)
                 VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6, ?7, ?8)",
                rusqlite::params![
                    reminder.user_id.0,
                    reminder.title,
                    reminder.message,
                    encode_ts(reminder.due_at),
                    reminder.channel.as_str(),
                    encode_ts(created_at),
                    reminder.recurring,
                    reminder.interval.map(|i| i.as_str()),
                ],
            )?;
            Ok(Some(ReminderId(conn.last_insert_rowid())))
        })?;

        inserted.ok_or(StorageError::UnknownUser(reminder.user_id))
    }

    fn fetch_due(&self, now: DateTime<Utc>) -> Result<Vec<Reminder>, StorageError> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {REMINDER_COLUMNS} FROM reminders
                 WHERE status = 'pending' AND due_at <= ?1
                 ORDER BY due_at, id"
            ))?;
            let rows = stmt
                .query_map([encode_ts(now)], reminder_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })?;

        // A row that cannot be decoded stays pending and must not hide the others
        let due = rows
            .into_iter()
            .filter_map(|row| {
                let id = row.id;
                match Reminder::try_from(row) {
                    Ok(reminder) => Some(reminder),
                    Err(e) => {
                        error!(reminder_id = id, "skipping undecodable due reminder: {}", e);
                        None
                    }
                }
            })
            .collect();
        Ok(due)
    }

    fn update_status(
        &self,
        id: ReminderId,
        status: ReminderStatus,
        sent_at: Option<DateTime<Utc>>,
    ) -> Result<(), StorageError> {
        check_status_write(id, status, sent_at)?;

        let outcome = self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE reminders SET status = ?2, sent_at = ?3 WHERE id = ?1 AND status = 'pending'",
                rusqlite::params![id.0, status.as_str(), sent_at.map(encode_ts)],
            )?;
            if changed == 1 {
                return Ok(StatusWrite::Applied);
            }

            let current: Option<String> = conn
                .query_row("SELECT status FROM reminders WHERE id = ?1", [id.0], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(match current {
                Some(status) => StatusWrite::Blocked(status),
                None => StatusWrite::Missing,
            })
        })?;

        match outcome {
            StatusWrite::Applied => Ok(()),
            StatusWrite::Missing => Err(StorageError::UnknownReminder(id)),
            StatusWrite::Blocked(raw) => {
                let status = raw
                    .parse()
                    .map_err(|e| StorageError::Corrupt(format!("reminder {}: {}", id, e)))?;
                Err(StorageError::NotPending { id, status })
            }
        }
    }

    fn fetch_reminder(&self, id: ReminderId) -> Result<Option<Reminder>, StorageError> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {REMINDER_COLUMNS} FROM reminders WHERE id = ?1"),
                [id.0],
                reminder_row,
            )
            .optional()
        })?
        .map(Reminder::try_from)
        .transpose()
    }

    fn reminders_for_user(&self, id: UserId) -> Result<Vec<Reminder>, StorageError> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {REMINDER_COLUMNS} FROM reminders WHERE user_id = ?1 ORDER BY due_at, id"
            ))?;
            let rows = stmt
                .query_map([id.0], reminder_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })?;

        rows.into_iter().map(Reminder::try_from).collect()
    }
}

fn query_user(conn: &Connection, id: UserId) -> rusqlite::Result<Option<UserRow>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        [id.0],
        |row| {
            Ok(UserRow {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                chat_id: row.get(3)?,
                active: row.get(4)?,
                created_at: row.get(5)?,
            })
        },
    )
    .optional()
}

fn reminder_row(row: &Row<'_>) -> rusqlite::Result<ReminderRow> {
    Ok(ReminderRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        message: row.get(3)?,
        due_at: row.get(4)?,
        channel: row.get(5)?,
        status: row.get(6)?,
        created_at: row.get(7)?,
        sent_at: row.get(8)?,
        recurring: row.get(9)?,
        recurrence_interval: row.get(10)?,
    })
}
