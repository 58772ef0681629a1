pub mod error;
pub mod models;
pub mod ports;

pub use error::{ReminderError, StorageError, ValidationError};
pub use models::{
    NewReminder, NewUser, NotificationChannel, RecurrenceInterval, Reminder, ReminderId,
    ReminderStatus, User, UserId, is_storable_due_time,
};
pub use ports::{Notifier, ReminderStore, check_status_write};
