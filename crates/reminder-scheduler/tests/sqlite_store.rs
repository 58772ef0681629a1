use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reminder_db::Database;
use reminder_scheduler::{ManualClock, ReminderDraft, ReminderScheduler, ReminderService};
use reminder_types::{Notifier, Reminder, ReminderId, ReminderStatus, ReminderStore, User};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 2, 7, 0, 0).unwrap()
}

#[derive(Default)]
struct Recorder {
    sent: Mutex<Vec<ReminderId>>,
}

#[async_trait]
impl Notifier for Recorder {
    async fn send(&self, _user: &User, reminder: &Reminder) -> bool {
        self.sent.lock().unwrap().push(reminder.id);
        true
    }
}

struct Setup {
    db: Arc<Database>,
    notifier: Arc<Recorder>,
    scheduler: ReminderScheduler,
    good: ReminderId,
    bad: ReminderId,
}

/// Two due reminders, the second with a channel no build understands.
fn setup() -> Setup {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let clock = Arc::new(ManualClock::new(now()));
    let service = ReminderService::new(db.clone(), clock.clone());

    let user = service.add_user("Ivy", None, None).unwrap();
    let good = service
        .add_reminder(ReminderDraft::new(user, "Stretch", now()))
        .unwrap();
    let bad = service
        .add_reminder(ReminderDraft::new(user, "Feed the cat", now()))
        .unwrap();
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE reminders SET channel = 'pigeon' WHERE id = ?1",
            [bad.0],
        )
    })
    .unwrap();

    let notifier = Arc::new(Recorder::default());
    let scheduler = ReminderScheduler::with_clock(db.clone(), notifier.clone(), clock);
    Setup {
        db,
        notifier,
        scheduler,
        good,
        bad,
    }
}

fn raw_status(db: &Database, id: ReminderId) -> String {
    db.with_conn(|conn| {
        conn.query_row("SELECT status FROM reminders WHERE id = ?1", [id.0], |row| {
            row.get(0)
        })
    })
    .unwrap()
}

#[tokio::test]
async fn corrupt_row_does_not_block_the_tick() {
    let s = setup();

    let report = s.scheduler.tick().await.unwrap();
    assert_eq!((report.due, report.sent), (1, 1));
    assert_eq!(*s.notifier.sent.lock().unwrap(), vec![s.good]);

    assert_eq!(
        s.db.fetch_reminder(s.good).unwrap().unwrap().status,
        ReminderStatus::Sent
    );
    assert_eq!(raw_status(&s.db, s.bad), "pending");
}

#[tokio::test]
async fn corrupt_row_does_not_stop_the_run_loop() {
    let s = setup();
    let scheduler = Arc::new(s.scheduler);

    let handle = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.run(StdDuration::from_millis(5)).await })
    };
    while s.notifier.sent.lock().unwrap().is_empty() {
        tokio::time::sleep(StdDuration::from_millis(5)).await;
    }
    scheduler.stop();

    let result = tokio::time::timeout(StdDuration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result, Ok(()));
    assert_eq!(raw_status(&s.db, s.bad), "pending");
}
