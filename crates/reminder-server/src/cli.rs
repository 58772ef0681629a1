use anyhow::{anyhow, bail};
use reminder_types::{NotificationChannel, RecurrenceInterval, UserId};

pub const USAGE: &str = "\
usage: reminder-bot <command>

commands:
  add-user <name> [--email <addr>] [--chat-id <id>]
  add-reminder <user_id> <title> <when> [--message <text>]
               [--channel console|email|chat] [--recurring daily|weekly|monthly]
  list <user_id>
  activate <user_id>
  deactivate <user_id>
  tick                run one scheduler pass
  run                 poll until Ctrl+C
  demo                in-memory walk-through
  help

<when> is `YYYY-MM-DD HH:MM`, `DD.MM.YYYY HH:MM`, RFC 3339, or an offset like 30m, 2h, 1h30m.
Times without an offset are UTC.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AddUser {
        name: String,
        email: Option<String>,
        chat_id: Option<String>,
    },
    AddReminder {
        user_id: UserId,
        title: String,
        when: String,
        message: Option<String>,
        channel: NotificationChannel,
        recurring: Option<RecurrenceInterval>,
    },
    List(UserId),
    Activate(UserId),
    Deactivate(UserId),
    Tick,
    Run,
    Demo,
    Help,
}

/// Parse arguments after the program name.
pub fn parse(args: &[String]) -> anyhow::Result<Command> {
    let Some((command, rest)) = args.split_first() else {
        return Ok(Command::Help);
    };
    let (positional, flags) = split_flags(rest)?;

    let command = match command.as_str() {
        "add-user" => {
            let [name] = expect_args::<1>(command, &positional)?;
            let flags = Flags::new(flags, &["email", "chat-id"])?;
            Command::AddUser {
                name,
                email: flags.get("email"),
                chat_id: flags.get("chat-id"),
            }
        }
        "add-reminder" => {
            let [user_id, title, when] = expect_args::<3>(command, &positional)?;
            let flags = Flags::new(flags, &["message", "channel", "recurring"])?;
            Command::AddReminder {
                user_id: user_id.parse()?,
                title,
                when,
                message: flags.get("message"),
                channel: flags
                    .get("channel")
                    .map(|c| c.parse::<NotificationChannel>())
                    .transpose()?
                    .unwrap_or(NotificationChannel::Console),
                recurring: flags
                    .get("recurring")
                    .map(|i| i.parse::<RecurrenceInterval>())
                    .transpose()?,
            }
        }
        "list" | "activate" | "deactivate" => {
            let [user_id] = expect_args::<1>(command, &positional)?;
            Flags::new(flags, &[])?;
            let user_id: UserId = user_id.parse()?;
            match command.as_str() {
                "list" => Command::List(user_id),
                "activate" => Command::Activate(user_id),
                _ => Command::Deactivate(user_id),
            }
        }
        "tick" | "run" | "demo" => {
            expect_args::<0>(command, &positional)?;
            Flags::new(flags, &[])?;
            match command.as_str() {
                "tick" => Command::Tick,
                "run" => Command::Run,
                _ => Command::Demo,
            }
        }
        "help" | "--help" | "-h" => Command::Help,
        other => bail!("unknown command `{other}` (see `reminder-bot help`)"),
    };
    Ok(command)
}

fn split_flags(args: &[String]) -> anyhow::Result<(Vec<String>, Vec<(String, String)>)> {
    let mut positional = Vec::new();
    let mut flags = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.strip_prefix("--") {
            Some(name) => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--{name} needs a value"))?;
                flags.push((name.to_string(), value.clone()));
            }
            None => positional.push(arg.clone()),
        }
    }
    Ok((positional, flags))
}

fn expect_args<const N: usize>(command: &str, positional: &[String]) -> anyhow::Result<[String; N]> {
    <[String; N]>::try_from(positional.to_vec()).map_err(|got| {
        anyhow!(
            "`{command}` takes {N} positional argument(s), got {}",
            got.len()
        )
    })
}

struct Flags(Vec<(String, String)>);

impl Flags {
    fn new(flags: Vec<(String, String)>, allowed: &[&str]) -> anyhow::Result<Self> {
        for (name, _) in &flags {
            if !allowed.contains(&name.as_str()) {
                bail!("unknown option --{name}");
            }
        }
        Ok(Self(flags))
    }

    /// Last occurrence wins.
    fn get(&self, name: &str) -> Option<String> {
        self.0
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn args(line: &[&str]) -> Vec<String> {
        line.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_arguments_is_help() {
        assert_eq!(parse(&[]).unwrap(), Command::Help);
    }

    #[test]
    fn add_user_with_contacts() {
        let cmd = parse(&args(&["add-user", "Alice", "--email", "a@example.com", "--chat-id", "42"]))
            .unwrap();
        assert_eq!(
            cmd,
            Command::AddUser {
                name: "Alice".into(),
                email: Some("a@example.com".into()),
                chat_id: Some("42".into()),
            }
        );
    }

    #[test]
    fn add_reminder_defaults_to_console() {
        let cmd = parse(&args(&["add-reminder", "3", "Stretch", "30m"])).unwrap();
        assert_eq!(
            cmd,
            Command::AddReminder {
                user_id: UserId(3),
                title: "Stretch".into(),
                when: "30m".into(),
                message: None,
                channel: NotificationChannel::Console,
                recurring: None,
            }
        );
    }

    #[test]
    fn add_reminder_with_all_options() {
        let cmd = parse(&args(&[
            "add-reminder",
            "1",
            "Standup",
            "2024-05-06 09:00",
            "--channel",
            "telegram",
            "--recurring",
            "weekly",
            "--message",
            "Room 4",
        ]))
        .unwrap();
        let Command::AddReminder {
            channel,
            recurring,
            message,
            when,
            ..
        } = cmd
        else {
            panic!("expected add-reminder");
        };
        assert_eq!(channel, NotificationChannel::Chat);
        assert_eq!(recurring, Some(RecurrenceInterval::Weekly));
        assert_eq!(message.as_deref(), Some("Room 4"));
        assert_eq!(when, "2024-05-06 09:00");
    }

    #[rstest]
    #[case(&["list", "7"], Command::List(UserId(7)))]
    #[case(&["activate", "7"], Command::Activate(UserId(7)))]
    #[case(&["deactivate", "7"], Command::Deactivate(UserId(7)))]
    #[case(&["tick"], Command::Tick)]
    #[case(&["run"], Command::Run)]
    #[case(&["demo"], Command::Demo)]
    #[case(&["--help"], Command::Help)]
    fn simple_commands(#[case] line: &[&str], #[case] expected: Command) {
        assert_eq!(parse(&args(line)).unwrap(), expected);
    }

    #[rstest]
    #[case(&["frobnicate"])]
    #[case(&["add-user"])]
    #[case(&["add-user", "Alice", "--email"])]
    #[case(&["add-user", "Alice", "--phone", "1"])]
    #[case(&["add-reminder", "x", "Title", "1h"])]
    #[case(&["add-reminder", "1", "Title", "1h", "--channel", "pager"])]
    #[case(&["add-reminder", "1", "Title", "1h", "--recurring", "hourly"])]
    #[case(&["list"])]
    #[case(&["tick", "now"])]
    fn rejected(#[case] line: &[&str]) {
        assert!(parse(&args(line)).is_err());
    }
}
