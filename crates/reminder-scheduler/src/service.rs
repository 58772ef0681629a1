//! User-facing add operations. Input is validated here, before the store sees it.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use reminder_types::{
    NewReminder, NewUser, NotificationChannel, RecurrenceInterval, Reminder, ReminderError,
    ReminderId, ReminderStore, UserId, ValidationError, is_storable_due_time,
};
use tracing::info;

use crate::clock::Clock;

/// Absolute formats accepted for a due time. Naive times are taken as UTC.
const DUE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%d/%m/%Y %H:%M",
];

/// A reminder as requested by a user, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderDraft {
    pub user_id: UserId,
    pub title: String,
    pub message: Option<String>,
    pub due_at: DateTime<Utc>,
    pub channel: NotificationChannel,
    pub recurring: bool,
    pub interval: Option<RecurrenceInterval>,
}

impl ReminderDraft {
    /// One-off console reminder.
    pub fn new(user_id: UserId, title: impl Into<String>, due_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            title: title.into(),
            message: None,
            due_at,
            channel: NotificationChannel::Console,
            recurring: false,
            interval: None,
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn channel(mut self, channel: NotificationChannel) -> Self {
        self.channel = channel;
        self
    }

    pub fn repeat(mut self, interval: RecurrenceInterval) -> Self {
        self.recurring = true;
        self.interval = Some(interval);
        self
    }

    fn validate(self) -> Result<NewReminder, ValidationError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if !is_storable_due_time(self.due_at) {
            return Err(ValidationError::InvalidDueTime(self.due_at.to_rfc3339()));
        }
        match (self.recurring, self.interval) {
            (true, None) => return Err(ValidationError::MissingInterval),
            (false, Some(_)) => return Err(ValidationError::UnexpectedInterval),
            _ => {}
        }

        Ok(NewReminder {
            user_id: self.user_id,
            title,
            message: non_blank(self.message),
            due_at: self.due_at,
            channel: self.channel,
            recurring: self.recurring,
            interval: self.interval,
        })
    }
}

pub struct ReminderService {
    store: Arc<dyn ReminderStore>,
    clock: Arc<dyn Clock>,
}

impl ReminderService {
    pub fn new(store: Arc<dyn ReminderStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn add_user(
        &self,
        name: &str,
        email: Option<&str>,
        chat_id: Option<&str>,
    ) -> Result<UserId, ReminderError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        let email = non_blank(email.map(String::from));
        if let Some(addr) = &email {
            validate_email(addr)?;
        }

        let new_user = NewUser {
            name: name.to_string(),
            email,
            chat_id: non_blank(chat_id.map(String::from)),
        };
        let id = self.store.create_user(&new_user, self.clock.now())?;
        info!(user_id = %id, name = %new_user.name, "user added");
        Ok(id)
    }

    pub fn add_reminder(&self, draft: ReminderDraft) -> Result<ReminderId, ReminderError> {
        let reminder = draft.validate()?;
        let id = self.store.create_reminder(&reminder, self.clock.now())?;
        info!(
            reminder_id = %id,
            user_id = %reminder.user_id,
            title = %reminder.title,
            due_at = %reminder.due_at,
            channel = %reminder.channel,
            "reminder added"
        );
        Ok(id)
    }

    pub fn set_user_active(&self, id: UserId, active: bool) -> Result<(), ReminderError> {
        self.store.set_user_active(id, active)?;
        info!(user_id = %id, active, "user activity changed");
        Ok(())
    }

    pub fn reminders_for_user(&self, id: UserId) -> Result<Vec<Reminder>, ReminderError> {
        if self.store.fetch_user(id)?.is_none() {
            return Err(reminder_types::StorageError::UnknownUser(id).into());
        }
        Ok(self.store.reminders_for_user(id)?)
    }

    /// Parse a due time relative to this service's clock.
    pub fn parse_due_time(&self, input: &str) -> Result<DateTime<Utc>, ValidationError> {
        parse_due_time(input, self.clock.now())
    }
}

/// Parse an absolute due time or an offset such as `30m`, `2h`, `1h30m`.
pub fn parse_due_time(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, ValidationError> {
    let text = input.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Ok(ts.with_timezone(&Utc));
    }
    for format in DUE_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(naive.and_utc());
        }
    }

    let relative = text.strip_prefix("in ").unwrap_or(text);
    let relative = relative.strip_prefix('+').unwrap_or(relative);
    parse_offset(relative)
        .and_then(|offset| now.checked_add_signed(offset))
        .filter(|due| is_storable_due_time(*due))
        .ok_or_else(|| ValidationError::InvalidDueTime(input.to_string()))
}

fn parse_offset(text: &str) -> Option<Duration> {
    let mut total_seconds: i64 = 0;
    let mut current_number = String::new();

    for c in text.to_lowercase().chars() {
        if c.is_ascii_digit() {
            current_number.push(c);
            continue;
        }
        if current_number.is_empty() {
            return None;
        }
        let value: i64 = current_number.parse().ok()?;
        current_number.clear();

        let unit = match c {
            's' => 1,
            'm' => 60,
            'h' => 60 * 60,
            'd' => 60 * 60 * 24,
            'w' => 60 * 60 * 24 * 7,
            _ => return None,
        };
        total_seconds = total_seconds.checked_add(value.checked_mul(unit)?)?;
    }

    // A trailing number without a unit is ambiguous
    if !current_number.is_empty() || total_seconds <= 0 {
        return None;
    }
    Duration::try_seconds(total_seconds)
}

fn validate_email(addr: &str) -> Result<(), ValidationError> {
    match addr.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(())
        }
        _ => Err(ValidationError::InvalidEmail(addr.to_string())),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::memory::MemoryStore;
    use chrono::TimeZone;
    use reminder_types::{ReminderStatus, StorageError};
    use rstest::rstest;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 2, 10, 0, 0).unwrap()
    }

    fn service() -> (ReminderService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let service = ReminderService::new(store.clone(), Arc::new(ManualClock::new(now())));
        (service, store)
    }

    #[rstest]
    #[case("2024-04-05 09:30", Utc.with_ymd_and_hms(2024, 4, 5, 9, 30, 0).unwrap())]
    #[case("05.04.2024 09:30", Utc.with_ymd_and_hms(2024, 4, 5, 9, 30, 0).unwrap())]
    #[case("05/04/2024 09:30", Utc.with_ymd_and_hms(2024, 4, 5, 9, 30, 0).unwrap())]
    #[case("2024-04-05T09:30:00+02:00", Utc.with_ymd_and_hms(2024, 4, 5, 7, 30, 0).unwrap())]
    #[case("30m", now() + Duration::minutes(30))]
    #[case("in 2h", now() + Duration::hours(2))]
    #[case("+1h30m", now() + Duration::minutes(90))]
    #[case("1w", now() + Duration::weeks(1))]
    fn due_time_formats(#[case] input: &str, #[case] expected: DateTime<Utc>) {
        assert_eq!(parse_due_time(input, now()).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("tomorrow")]
    #[case("2024-13-40 25:00")]
    #[case("15")]
    #[case("0m")]
    #[case("5x")]
    #[case("999999999w")]
    #[case("9999999999999999s")]
    fn bad_due_times_are_rejected(#[case] input: &str) {
        assert_eq!(
            parse_due_time(input, now()),
            Err(ValidationError::InvalidDueTime(input.to_string()))
        );
    }

    #[test]
    fn add_user_trims_and_drops_blank_contacts() {
        let (service, store) = service();
        let id = service.add_user("  Alice ", Some(" "), Some("@alice")).unwrap();

        let user = store.fetch_user(id).unwrap().unwrap();
        assert_eq!(user.name, "Alice");
        assert_eq!(user.email, None);
        assert_eq!(user.chat_id.as_deref(), Some("@alice"));
        assert!(user.active);
        assert_eq!(user.created_at, now());
    }

    #[rstest]
    #[case("", None, ValidationError::EmptyName)]
    #[case("Eve", Some("not-an-address"), ValidationError::InvalidEmail("not-an-address".into()))]
    #[case("Eve", Some("@example.com"), ValidationError::InvalidEmail("@example.com".into()))]
    fn add_user_validation(
        #[case] name: &str,
        #[case] email: Option<&str>,
        #[case] expected: ValidationError,
    ) {
        let (service, store) = service();
        let err = service.add_user(name, email, None).unwrap_err();
        assert_eq!(err, ReminderError::Validation(expected));
        assert!(store.fetch_user(UserId(1)).unwrap().is_none());
    }

    #[test]
    fn duplicate_email_surfaces_storage_error() {
        let (service, _) = service();
        service.add_user("Alice", Some("a@example.com"), None).unwrap();
        let err = service.add_user("Alicia", Some("a@example.com"), None).unwrap_err();
        assert!(matches!(err, ReminderError::Storage(StorageError::Conflict(_))));
    }

    #[test]
    fn add_reminder_stores_pending_row() {
        let (service, store) = service();
        let user = service.add_user("Alice", None, None).unwrap();
        let id = service
            .add_reminder(
                ReminderDraft::new(user, " Dentist ", now() + Duration::days(1))
                    .message("")
                    .channel(NotificationChannel::Email)
                    .repeat(RecurrenceInterval::Weekly),
            )
            .unwrap();

        let stored = store.fetch_reminder(id).unwrap().unwrap();
        assert_eq!(stored.title, "Dentist");
        assert_eq!(stored.message, None);
        assert_eq!(stored.status, ReminderStatus::Pending);
        assert_eq!(stored.created_at, now());
        assert!(stored.recurring);
        assert_eq!(stored.interval, Some(RecurrenceInterval::Weekly));
    }

    #[test]
    fn recurrence_flag_and_interval_must_agree() {
        let (service, store) = service();
        let user = service.add_user("Alice", None, None).unwrap();

        let mut missing = ReminderDraft::new(user, "Gym", now());
        missing.recurring = true;
        assert_eq!(
            service.add_reminder(missing).unwrap_err(),
            ReminderError::Validation(ValidationError::MissingInterval)
        );

        let mut unexpected = ReminderDraft::new(user, "Gym", now());
        unexpected.interval = Some(RecurrenceInterval::Daily);
        assert_eq!(
            service.add_reminder(unexpected).unwrap_err(),
            ReminderError::Validation(ValidationError::UnexpectedInterval)
        );

        assert!(store.all_reminders().unwrap().is_empty());
    }

    #[test]
    fn due_time_past_year_9999_is_rejected() {
        let (service, store) = service();
        let user = service.add_user("Alice", None, None).unwrap();
        let far = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();

        let err = service
            .add_reminder(ReminderDraft::new(user, "Far future", far))
            .unwrap_err();
        assert!(matches!(
            err,
            ReminderError::Validation(ValidationError::InvalidDueTime(_))
        ));
        assert!(store.all_reminders().unwrap().is_empty());
    }

    #[test]
    fn blank_title_is_rejected() {
        let (service, _) = service();
        let user = service.add_user("Alice", None, None).unwrap();
        assert_eq!(
            service.add_reminder(ReminderDraft::new(user, "   ", now())).unwrap_err(),
            ReminderError::Validation(ValidationError::EmptyTitle)
        );
    }

    #[test]
    fn reminder_for_unknown_user_is_a_storage_error() {
        let (service, _) = service();
        let err = service
            .add_reminder(ReminderDraft::new(UserId(5), "Orphan", now()))
            .unwrap_err();
        assert_eq!(err, ReminderError::Storage(StorageError::UnknownUser(UserId(5))));
    }

    #[test]
    fn listing_requires_a_known_user() {
        let (service, _) = service();
        assert_eq!(
            service.reminders_for_user(UserId(3)).unwrap_err(),
            ReminderError::Storage(StorageError::UnknownUser(UserId(3)))
        );
    }
}
