use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Reminder DB: running migration v1 (initial schema)");
        // No foreign key on reminders.user_id: users may be removed by an
        // administrator while their reminders stay behind as pending rows.
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT NOT NULL,
                email       TEXT UNIQUE,
                chat_id     TEXT UNIQUE,
                active      INTEGER NOT NULL DEFAULT 1,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE reminders (
                id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id             INTEGER NOT NULL,
                title               TEXT NOT NULL,
                message             TEXT,
                due_at              TEXT NOT NULL,
                channel             TEXT NOT NULL DEFAULT 'console',
                status              TEXT NOT NULL DEFAULT 'pending'
                                    CHECK (status IN ('pending', 'sent', 'failed')),
                created_at          TEXT NOT NULL,
                sent_at             TEXT,
                recurring           INTEGER NOT NULL DEFAULT 0,
                recurrence_interval TEXT
            );

            CREATE INDEX idx_reminders_due ON reminders(status, due_at);
            CREATE INDEX idx_reminders_user ON reminders(user_id, due_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    Ok(())
}
