use std::path::Path;

use anyhow::{bail, Context};

/// One line of a `MailSessionLog`: the recipient the message was addressed
/// to, and the Message-ID the mail transport assigned it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedEmail {
    pub recipient: String,
    pub msg_id: String,
}

/// A parsed `MailSessionLog`: a header line `<timestamp> <user>` followed by
/// one `<recipient> <msg_id>` line per email accepted in that SMTP session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailSessionLog {
    pub timestamp: i64,
    pub user: String,
    pub emails: Vec<LoggedEmail>,
}

pub async fn read_session_log(log_dir: &Path, log_file: &str) -> anyhow::Result<MailSessionLog> {
    let path = log_dir.join(log_file);
    let contents = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("reading session log {}", path.display()))?;
    parse_session_log(&contents)
}

fn parse_session_log(contents: &str) -> anyhow::Result<MailSessionLog> {
    let mut lines = contents.lines();
    let header = lines.next().context("empty session log, missing header")?;
    let mut header_fields = header.split_whitespace();
    let timestamp: i64 = header_fields
        .next()
        .context("session log header missing timestamp")?
        .parse()
        .context("session log header timestamp is not an integer")?;
    let user = header_fields.next().context("session log header missing user")?.to_string();

    let mut emails = Vec::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split_whitespace();
        let recipient = fields.next().context("email line missing recipient")?.to_string();
        let msg_id = fields.next().context("email line missing msg_id")?.to_string();
        if fields.next().is_some() {
            bail!("email line has more than two fields: {line:?}");
        }
        emails.push(LoggedEmail { recipient, msg_id });
    }

    Ok(MailSessionLog { timestamp, user, emails })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_and_email_lines() {
        let log = parse_session_log("1700000000 alice\nprogramming1 abcdef0100000001.part1@host\nprogramming1 abcdef0100000002.part2@host\n").unwrap();
        assert_eq!(log.timestamp, 1_700_000_000);
        assert_eq!(log.user, "alice");
        assert_eq!(log.emails.len(), 2);
        assert_eq!(log.emails[0].recipient, "programming1");
    }

    #[test]
    fn idle_session_has_no_emails() {
        let log = parse_session_log("1700000000 alice\n").unwrap();
        assert!(log.emails.is_empty());
    }

    #[test]
    fn rejects_missing_header() {
        assert!(parse_session_log("").is_err());
    }
}
