mod cli;
mod config;
mod logging;

use std::sync::Arc;

use anyhow::Context;
use chrono::{Duration, Utc};
use tracing::{info, warn};

use reminder_db::Database;
use reminder_notify::format::display_time;
use reminder_notify::{ChannelNotifier, ConsoleNotifier, EmailNotifier, TelegramNotifier};
use reminder_scheduler::{
    MemoryStore, ReminderDraft, ReminderScheduler, ReminderService, SystemClock, TickReport,
};
use reminder_types::{Reminder, ReminderStatus, ReminderStore};

use crate::cli::{Command, USAGE};
use crate::config::{Config, Logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let _log_guard = logging::init(&Logging::from_env());

    let args: Vec<String> = std::env::args().skip(1).collect();
    execute(cli::parse(&args)?).await
}

/// Configuration plus the opened database, for commands that touch storage.
struct App {
    config: Config,
    db: Arc<Database>,
    service: ReminderService,
}

impl App {
    fn open() -> anyhow::Result<Self> {
        let config = Config::from_env()?;
        let db = Arc::new(
            Database::open(&config.db_path)
                .with_context(|| format!("failed to open database {}", config.db_path.display()))?,
        );
        let service = ReminderService::new(db.clone(), Arc::new(SystemClock));
        Ok(Self {
            config,
            db,
            service,
        })
    }

    fn scheduler(&self) -> ReminderScheduler {
        scheduler(self.db.clone(), &self.config)
    }
}

async fn execute(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Help => println!("{USAGE}"),
        Command::Demo => demo().await?,
        Command::AddUser {
            name,
            email,
            chat_id,
        } => {
            let service = App::open()?.service;
            let id = service.add_user(&name, email.as_deref(), chat_id.as_deref())?;
            println!("user {id} created");
        }
        Command::AddReminder {
            user_id,
            title,
            when,
            message,
            channel,
            recurring,
        } => {
            let service = App::open()?.service;
            let due_at = service.parse_due_time(&when)?;
            let mut draft = ReminderDraft::new(user_id, title, due_at).channel(channel);
            if let Some(message) = message {
                draft = draft.message(message);
            }
            if let Some(interval) = recurring {
                draft = draft.repeat(interval);
            }
            let id = service.add_reminder(draft)?;
            println!("reminder {id} scheduled for {}", display_time(due_at));
        }
        Command::List(user_id) => {
            let reminders = App::open()?.service.reminders_for_user(user_id)?;
            if reminders.is_empty() {
                println!("no reminders for user {user_id}");
            }
            for reminder in &reminders {
                println!("{}", list_line(reminder));
            }
        }
        Command::Activate(user_id) => {
            App::open()?.service.set_user_active(user_id, true)?;
            println!("user {user_id} activated");
        }
        Command::Deactivate(user_id) => {
            App::open()?.service.set_user_active(user_id, false)?;
            println!("user {user_id} deactivated");
        }
        Command::Tick => {
            let report = App::open()?.scheduler().tick().await?;
            print_report(&report);
        }
        Command::Run => {
            let app = App::open()?;
            let scheduler = app.scheduler();
            let shutdown = scheduler.shutdown_token();
            tokio::spawn(async move {
                shutdown_signal().await;
                shutdown.cancel();
            });

            info!(db = %app.config.db_path.display(), "reminder bot running");
            scheduler.start(app.config.poll_interval_secs).await?;
        }
    }
    Ok(())
}

fn scheduler(store: Arc<dyn ReminderStore>, config: &Config) -> ReminderScheduler {
    if config.smtp().is_none() {
        info!("EMAIL_USER/EMAIL_PASSWORD not set, email reminders will fail");
    }
    if config.telegram_bot_token.is_none() {
        info!("TELEGRAM_BOT_TOKEN not set, chat reminders will fail");
    }

    let notifier = ChannelNotifier::new(
        ConsoleNotifier::stdout(),
        EmailNotifier::new(config.smtp()),
        TelegramNotifier::new(
            config.telegram_bot_token.clone(),
            config.telegram_api_url.clone(),
        ),
    );
    ReminderScheduler::new(store, Arc::new(notifier))
}

fn list_line(reminder: &Reminder) -> String {
    let repeat = match (reminder.recurring, reminder.interval) {
        (true, Some(interval)) => interval.as_str(),
        (true, None) => "recurring?",
        (false, _) => "once",
    };
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}",
        reminder.id,
        reminder.status,
        display_time(reminder.due_at),
        reminder.channel,
        repeat,
        reminder.title
    )
}

fn print_report(report: &TickReport) {
    println!(
        "due {} | sent {} | failed {} | skipped {} | errored {} | rescheduled {}",
        report.due,
        report.sent,
        report.failed,
        report.skipped,
        report.errored,
        report.rescheduled
    );
}

/// Walk through the lifecycle against an in-memory store.
async fn demo() -> anyhow::Result<()> {
    let store = Arc::new(MemoryStore::new());
    let service = ReminderService::new(store.clone(), Arc::new(SystemClock));
    let now = Utc::now();

    let alice = service.add_user("Alice", Some("alice@example.com"), None)?;
    let bob = service.add_user("Bob", None, Some("123456789"))?;
    service.add_reminder(
        ReminderDraft::new(alice, "Stand up and stretch", now - Duration::minutes(1))
            .message("You have been sitting for an hour"),
    )?;
    service.add_reminder(ReminderDraft::new(bob, "Team call", now + Duration::hours(1)))?;

    let scheduler = ReminderScheduler::new(store.clone(), Arc::new(ConsoleNotifier::stdout()));
    let report = scheduler.tick().await?;
    print_report(&report);

    let pending = store
        .all_reminders()?
        .iter()
        .filter(|r| r.status == ReminderStatus::Pending)
        .count();
    println!("{pending} reminder(s) still pending");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
