use std::path::PathBuf;

use anyhow::{Context, bail};
use reminder_notify::{DEFAULT_API_URL, SmtpSettings};

const LOGGED_CRATES: [&str; 4] = [
    "reminder_bot",
    "reminder_scheduler",
    "reminder_notify",
    "reminder_db",
];

pub const DEFAULT_LOG_FILE: &str = "reminder_bot.log";

/// Trimmed value for `key`. Blank values count as unset.
fn non_blank(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `level` applied to every crate of this workspace.
pub fn crate_filter(level: &str) -> String {
    LOGGED_CRATES
        .iter()
        .map(|krate| format!("{krate}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Where and how much to log. Read before `Config` so that config errors are logged too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Logging {
    pub filter: String,
    /// `None` logs to stdout only.
    pub file: Option<PathBuf>,
}

impl Logging {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `RUST_LOG` wins over `LOG_LEVEL`. `REMINDER_LOG_FILE=off` disables the file.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let filter = non_blank(&lookup, "RUST_LOG")
            .or_else(|| {
                non_blank(&lookup, "LOG_LEVEL").map(|level| crate_filter(&level_name(&level)))
            })
            .unwrap_or_else(|| crate_filter("info"));

        let file = match non_blank(&lookup, "REMINDER_LOG_FILE") {
            Some(v) if v.eq_ignore_ascii_case("off") => None,
            Some(v) => Some(PathBuf::from(v)),
            None => Some(PathBuf::from(DEFAULT_LOG_FILE)),
        };

        Self { filter, file }
    }
}

/// Map conventional level names onto tracing's.
fn level_name(raw: &str) -> String {
    match raw.to_ascii_lowercase().as_str() {
        "warning" => "warn".into(),
        "critical" | "fatal" => "error".into(),
        other => other.into(),
    }
}

/// Process configuration, read from the environment after `.env` is loaded.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub poll_interval_secs: u64,
    pub smtp_server: String,
    pub smtp_port: u16,
    pub email_user: Option<String>,
    pub email_password: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub telegram_api_url: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| non_blank(&lookup, key);

        let interval = ["REMINDER_POLL_INTERVAL_SECS", "CHECK_INTERVAL"]
            .into_iter()
            .find_map(|key| get(key).map(|raw| (key, raw)));
        let poll_interval_secs: u64 = match interval {
            Some((key, raw)) => raw
                .parse()
                .with_context(|| format!("{key} is not a number: {raw}"))?,
            None => 60,
        };
        if poll_interval_secs == 0 {
            bail!("poll interval must be greater than zero");
        }

        let smtp_port: u16 = match get("SMTP_PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("SMTP_PORT is not a valid port: {raw}"))?,
            None => 587,
        };

        Ok(Self {
            db_path: PathBuf::from(get("REMINDER_DB_PATH").unwrap_or_else(|| "reminders.db".into())),
            poll_interval_secs,
            smtp_server: get("SMTP_SERVER").unwrap_or_else(|| "smtp.gmail.com".into()),
            smtp_port,
            email_user: get("EMAIL_USER"),
            email_password: get("EMAIL_PASSWORD"),
            telegram_bot_token: get("TELEGRAM_BOT_TOKEN"),
            telegram_api_url: get("TELEGRAM_API_URL").unwrap_or_else(|| DEFAULT_API_URL.into()),
        })
    }

    /// SMTP settings, present only when both credentials are set.
    pub fn smtp(&self) -> Option<SmtpSettings> {
        match (&self.email_user, &self.email_password) {
            (Some(username), Some(password)) => Some(SmtpSettings {
                server: self.smtp_server.clone(),
                port: self.smtp_port,
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.db_path, PathBuf::from("reminders.db"));
        assert_eq!(cfg.poll_interval_secs, 60);
        assert_eq!(cfg.smtp_server, "smtp.gmail.com");
        assert_eq!(cfg.smtp_port, 587);
        assert_eq!(cfg.telegram_api_url, "https://api.telegram.org");
        assert!(cfg.telegram_bot_token.is_none());
        assert!(cfg.smtp().is_none());
    }

    #[test]
    fn smtp_needs_both_credentials() {
        let half = config(&[("EMAIL_USER", "bot@example.com")]).unwrap();
        assert!(half.smtp().is_none());

        let full = config(&[
            ("EMAIL_USER", "bot@example.com"),
            ("EMAIL_PASSWORD", "pw"),
            ("SMTP_SERVER", "mail.example.com"),
            ("SMTP_PORT", "2525"),
        ])
        .unwrap();
        let smtp = full.smtp().unwrap();
        assert_eq!(smtp.server, "mail.example.com");
        assert_eq!(smtp.port, 2525);
    }

    #[test]
    fn blank_values_are_unset() {
        let cfg = config(&[("TELEGRAM_BOT_TOKEN", "  "), ("REMINDER_DB_PATH", "")]).unwrap();
        assert!(cfg.telegram_bot_token.is_none());
        assert_eq!(cfg.db_path, PathBuf::from("reminders.db"));
    }

    #[test]
    fn bad_numbers_are_errors() {
        assert!(config(&[("REMINDER_POLL_INTERVAL_SECS", "soon")]).is_err());
        assert!(config(&[("REMINDER_POLL_INTERVAL_SECS", "0")]).is_err());
        assert!(config(&[("SMTP_PORT", "70000")]).is_err());
        assert!(config(&[("CHECK_INTERVAL", "0")]).is_err());
    }

    #[test]
    fn check_interval_is_a_fallback() {
        assert_eq!(config(&[("CHECK_INTERVAL", "15")]).unwrap().poll_interval_secs, 15);

        let both = config(&[("CHECK_INTERVAL", "15"), ("REMINDER_POLL_INTERVAL_SECS", "30")]);
        assert_eq!(both.unwrap().poll_interval_secs, 30);

        let err = config(&[("CHECK_INTERVAL", "often")]).unwrap_err();
        assert!(err.to_string().contains("CHECK_INTERVAL"));
    }

    fn logging(pairs: &[(&str, &str)]) -> Logging {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Logging::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn logging_defaults() {
        let log = logging(&[]);
        assert_eq!(
            log.filter,
            "reminder_bot=info,reminder_scheduler=info,reminder_notify=info,reminder_db=info"
        );
        assert_eq!(log.file, Some(PathBuf::from("reminder_bot.log")));
    }

    #[rstest]
    #[case("DEBUG", "debug")]
    #[case("WARNING", "warn")]
    #[case("CRITICAL", "error")]
    #[case("trace", "trace")]
    fn log_level_applies_to_every_crate(#[case] raw: &str, #[case] level: &str) {
        let log = logging(&[("LOG_LEVEL", raw)]);
        assert_eq!(log.filter, crate_filter(level));
        assert!(log.filter.contains(&format!("reminder_scheduler={level}")));
    }

    #[test]
    fn rust_log_wins_over_log_level() {
        let log = logging(&[("LOG_LEVEL", "DEBUG"), ("RUST_LOG", "warn")]);
        assert_eq!(log.filter, "warn");
    }

    #[test]
    fn log_file_can_be_moved_or_disabled() {
        let moved = logging(&[("REMINDER_LOG_FILE", "/var/log/bot.log")]);
        assert_eq!(moved.file, Some(PathBuf::from("/var/log/bot.log")));
        assert_eq!(logging(&[("REMINDER_LOG_FILE", "OFF")]).file, None);
    }
}
