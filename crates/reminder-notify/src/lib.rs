//! Notification transports behind the [`Notifier`](reminder_types::Notifier) port.

pub mod chat;
pub mod console;
pub mod email;
pub mod format;
pub mod router;

pub use chat::{DEFAULT_API_URL, TelegramNotifier};
pub use console::ConsoleNotifier;
pub use email::{EmailNotifier, SmtpSettings};
pub use router::ChannelNotifier;
