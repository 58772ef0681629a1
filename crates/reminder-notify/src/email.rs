use async_trait::async_trait;
use lettre::address::AddressError;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use reminder_types::{Notifier, Reminder, User};
use thiserror::Error;
use tracing::{info, warn};

use crate::format::{email_body, email_subject};

#[derive(Debug, Error)]
enum EmailError {
    #[error("bad sender address {address}: {source}")]
    Sender {
        address: String,
        source: AddressError,
    },

    #[error("bad recipient address {address}: {source}")]
    Recipient {
        address: String,
        source: AddressError,
    },

    #[error("failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("smtp relay {server}: {source}")]
    Relay {
        server: String,
        source: lettre::transport::smtp::Error,
    },

    #[error("smtp send failed: {0}")]
    Send(lettre::transport::smtp::Error),
}

/// SMTP relay and login. The username doubles as the sender address.
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

pub struct EmailNotifier {
    smtp: Option<SmtpSettings>,
}

impl EmailNotifier {
    /// `None` disables the transport; every send then fails.
    pub fn new(smtp: Option<SmtpSettings>) -> Self {
        Self { smtp }
    }

    fn build_message(
        smtp: &SmtpSettings,
        to: &str,
        user: &User,
        reminder: &Reminder,
    ) -> Result<Message, EmailError> {
        let from = smtp
            .username
            .parse::<Mailbox>()
            .map_err(|source| EmailError::Sender {
                address: smtp.username.clone(),
                source,
            })?;
        let to = to
            .parse::<Mailbox>()
            .map_err(|source| EmailError::Recipient {
                address: to.to_string(),
                source,
            })?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(email_subject(reminder))
            .header(ContentType::TEXT_PLAIN)
            .body(email_body(user, reminder))?;
        Ok(message)
    }

    async fn deliver(smtp: &SmtpSettings, message: Message) -> Result<(), EmailError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.server)
            .map_err(|source| EmailError::Relay {
                server: smtp.server.clone(),
                source,
            })?
            .port(smtp.port)
            .credentials(Credentials::new(
                smtp.username.clone(),
                smtp.password.clone(),
            ))
            .build();

        transport
            .send(message)
            .await
            .map(|_| ())
            .map_err(EmailError::Send)
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, user: &User, reminder: &Reminder) -> bool {
        let Some(smtp) = &self.smtp else {
            warn!(reminder_id = %reminder.id, "email not configured");
            return false;
        };
        let Some(to) = user.email.as_deref() else {
            warn!(reminder_id = %reminder.id, user_id = %user.id, "user has no email address");
            return false;
        };

        let result = match Self::build_message(smtp, to, user, reminder) {
            Ok(message) => Self::deliver(smtp, message).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                info!(reminder_id = %reminder.id, to, "email sent");
                true
            }
            Err(e) => {
                warn!(reminder_id = %reminder.id, "{}", e);
                false
            }
        }
    }
}
