use async_trait::async_trait;
use reminder_types::{NotificationChannel, Notifier, Reminder, User};

use crate::chat::TelegramNotifier;
use crate::console::ConsoleNotifier;
use crate::email::EmailNotifier;

/// Dispatches each reminder to the transport its channel names.
pub struct ChannelNotifier {
    console: ConsoleNotifier,
    email: EmailNotifier,
    chat: TelegramNotifier,
}

impl ChannelNotifier {
    pub fn new(console: ConsoleNotifier, email: EmailNotifier, chat: TelegramNotifier) -> Self {
        Self {
            console,
            email,
            chat,
        }
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn send(&self, user: &User, reminder: &Reminder) -> bool {
        match reminder.channel {
            NotificationChannel::Console => self.console.send(user, reminder).await,
            NotificationChannel::Email => self.email.send(user, reminder).await,
            NotificationChannel::Chat => self.chat.send(user, reminder).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::fixtures::{reminder, user};

    fn router() -> ChannelNotifier {
        ChannelNotifier::new(
            ConsoleNotifier::with_writer(Box::new(std::io::sink())),
            EmailNotifier::new(None),
            TelegramNotifier::new(None, "http://127.0.0.1:9"),
        )
    }

    #[tokio::test]
    async fn routes_by_channel() {
        let router = router();
        let alice = user(Some("a@example.com"), Some("4242"));

        assert!(router.send(&alice, &reminder(NotificationChannel::Console, None)).await);
        // Unconfigured transports report failure rather than falling back to console
        assert!(!router.send(&alice, &reminder(NotificationChannel::Email, None)).await);
        assert!(!router.send(&alice, &reminder(NotificationChannel::Chat, None)).await);
    }
}
