use std::io::Write;
use std::sync::Mutex;

use async_trait::async_trait;
use reminder_types::{Notifier, Reminder, User};
use tracing::{info, warn};

use crate::format::console_block;

/// Prints reminders as a framed block. Writes to stdout unless given a writer.
pub struct ConsoleNotifier {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleNotifier {
    pub fn stdout() -> Self {
        Self::with_writer(Box::new(std::io::stdout()))
    }

    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn send(&self, user: &User, reminder: &Reminder) -> bool {
        let block = console_block(user, reminder);
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = out.write_all(block.as_bytes()).and_then(|_| out.flush()) {
            warn!(reminder_id = %reminder.id, "console write failed: {}", e);
            return false;
        }
        info!(reminder_id = %reminder.id, user = %user.name, "console notification shown");
        true
    }
}
