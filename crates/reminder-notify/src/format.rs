//! Message bodies for each transport.

use chrono::{DateTime, Utc};
use reminder_types::{Reminder, User};

const RULE: &str = "==================================================";

/// `DD.MM.YYYY HH:MM`, the format users see everywhere.
pub fn display_time(at: DateTime<Utc>) -> String {
    at.format("%d.%m.%Y %H:%M").to_string()
}

pub fn console_block(user: &User, reminder: &Reminder) -> String {
    format!(
        "{RULE}\nREMINDER\n{RULE}\nUser: {}\nTitle: {}\nMessage: {}\nDue: {}\n{RULE}\n",
        user.name,
        reminder.title,
        reminder.message.as_deref().unwrap_or("no message"),
        display_time(reminder.due_at),
    )
}

pub fn email_subject(reminder: &Reminder) -> String {
    format!("Reminder: {}", reminder.title)
}

pub fn email_body(user: &User, reminder: &Reminder) -> String {
    let mut body = format!("Hello, {}!\n\nReminder: {}\n\n", user.name, reminder.title);
    if let Some(message) = &reminder.message {
        body.push_str(message);
        body.push_str("\n\n");
    }
    body.push_str(&format!(
        "Due: {}\n\nReminder bot\n",
        display_time(reminder.due_at)
    ));
    body
}

pub fn chat_text(reminder: &Reminder) -> String {
    let mut text = format!("🔔 Reminder\n\n{}\n\n", reminder.title);
    if let Some(message) = &reminder.message {
        text.push_str(message);
        text.push_str("\n\n");
    }
    text.push_str(&format!("⏰ {}", display_time(reminder.due_at)));
    text
}
