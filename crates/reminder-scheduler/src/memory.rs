//! In-process reminder store.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use reminder_types::{
    NewReminder, NewUser, Reminder, ReminderId, ReminderStatus, ReminderStore, StorageError, User,
    UserId, check_status_write,
};

struct MemoryState {
    users: BTreeMap<UserId, User>,
    reminders: BTreeMap<ReminderId, Reminder>,
    next_user_id: i64,
    next_reminder_id: i64,
}

/// Map-backed store with the same contract as the SQLite one: unique contact
/// identifiers, owner checks on insert and pending-only status writes.
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                users: BTreeMap::new(),
                reminders: BTreeMap::new(),
                next_user_id: 1,
                next_reminder_id: 1,
            }),
        }
    }

    /// Administrative removal. Reminders owned by the user are left in place.
    pub fn delete_user(&self, id: UserId) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        state
            .users
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::UnknownUser(id))
    }

    /// Every stored reminder, in id order.
    pub fn all_reminders(&self) -> Result<Vec<Reminder>, StorageError> {
        Ok(self.lock()?.reminders.values().cloned().collect())
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Unavailable(format!("memory store lock poisoned: {}", e)))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReminderStore for MemoryStore {
    fn create_user(&self, user: &NewUser, created_at: DateTime<Utc>) -> Result<UserId, StorageError> {
        let mut state = self.lock()?;

        for existing in state.users.values() {
            if user.email.is_some() && existing.email == user.email {
                return Err(StorageError::Conflict(format!(
                    "email {} already registered",
                    user.email.as_deref().unwrap_or_default()
                )));
            }
            if user.chat_id.is_some() && existing.chat_id == user.chat_id {
                return Err(StorageError::Conflict(format!(
                    "chat id {} already registered",
                    user.chat_id.as_deref().unwrap_or_default()
                )));
            }
        }

        let id = UserId(state.next_user_id);
        state.next_user_id += 1;
        state.users.insert(
            id,
            User {
                id,
                name: user.name.clone(),
                email: user.email.clone(),
                chat_id: user.chat_id.clone(),
                active: true,
                created_at,
            },
        );
        Ok(id)
    }

    fn create_reminder(
        &self,
        reminder: &NewReminder,
        created_at: DateTime<Utc>,
    ) -> Result<ReminderId, StorageError> {
        let mut state = self.lock()?;
        if !state.users.contains_key(&reminder.user_id) {
            return Err(StorageError::UnknownUser(reminder.user_id));
        }

        let id = ReminderId(state.next_reminder_id);
        state.next_reminder_id += 1;
        state.reminders.insert(
            id,
            Reminder {
                id,
                user_id: reminder.user_id,
                title: reminder.title.clone(),
                message: reminder.message.clone(),
                due_at: reminder.due_at,
                channel: reminder.channel,
                status: ReminderStatus::Pending,
                created_at,
                sent_at: None,
                recurring: reminder.recurring,
                interval: reminder.interval,
            },
        );
        Ok(id)
    }

    fn fetch_due(&self, now: DateTime<Utc>) -> Result<Vec<Reminder>, StorageError> {
        let state = self.lock()?;
        let mut due: Vec<Reminder> = state
            .reminders
            .values()
            .filter(|r| r.is_due(now))
            .cloned()
            .collect();
        due.sort_by_key(|r| (r.due_at, r.id));
        Ok(due)
    }

    fn update_status(
        &self,
        id: ReminderId,
        status: ReminderStatus,
        sent_at: Option<DateTime<Utc>>,
    ) -> Result<(), StorageError> {
        check_status_write(id, status, sent_at)?;

        let mut state = self.lock()?;
        let reminder = state
            .reminders
            .get_mut(&id)
            .ok_or(StorageError::UnknownReminder(id))?;
        if reminder.status.is_terminal() {
            return Err(StorageError::NotPending {
                id,
                status: reminder.status,
            });
        }
        reminder.status = status;
        reminder.sent_at = sent_at;
        Ok(())
    }

    fn fetch_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    fn fetch_reminder(&self, id: ReminderId) -> Result<Option<Reminder>, StorageError> {
        Ok(self.lock()?.reminders.get(&id).cloned())
    }

    fn reminders_for_user(&self, id: UserId) -> Result<Vec<Reminder>, StorageError> {
        let state = self.lock()?;
        let mut owned: Vec<Reminder> = state
            .reminders
            .values()
            .filter(|r| r.user_id == id)
            .cloned()
            .collect();
        owned.sort_by_key(|r| (r.due_at, r.id));
        Ok(owned)
    }

    fn set_user_active(&self, id: UserId, active: bool) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let user = state
            .users
            .get_mut(&id)
            .ok_or(StorageError::UnknownUser(id))?;
        user.active = active;
        Ok(())
    }
}
