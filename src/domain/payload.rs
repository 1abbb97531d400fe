//! Notification payload construction.
//!
//! The payload is transport-agnostic: the delivery adapter decides how it is
//! serialised on the wire.

use std::path::Path;

use super::status::ExitStatus;

/// Display name used for the sender
pub const SENDER_NAME: &str = "cronalert";

/// An email address with a display name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub email: String,
    pub name: String,
}

impl Contact {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
        }
    }
}

/// A single notification, built once per qualifying run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub to: Contact,
    pub from: Contact,
    pub subject: String,
    pub body: String,
}

impl Payload {
    /// Build the notification for one run.
    ///
    /// The body embeds the command line, the exit code and the full log
    /// content, each on its own labelled line. Nothing is truncated.
    pub fn build(
        command: &str,
        exit_code: i32,
        log_content: &str,
        to_email: &str,
        from_email: &str,
        subject: String,
        realm: &str,
    ) -> Self {
        Self {
            to: Contact::new(to_email, recipient_name(realm)),
            from: Contact::new(from_email, SENDER_NAME),
            subject,
            body: body_text(command, exit_code, log_content),
        }
    }
}

impl Payload {
    /// Point the reader at the raw log file.
    ///
    /// When the output was not valid UTF-8 the body says so, since the
    /// embedded copy shows those bytes as U+FFFD.
    pub fn with_log_file(mut self, log_path: &Path, valid_utf8: bool) -> Self {
        self.body
            .push_str(&format!("\nraw log: {}\n", log_path.display()));
        if !valid_utf8 {
            self.body.push_str(
                "note: output contained bytes that are not valid UTF-8; they appear as \u{fffd} above and are kept verbatim in the raw log\n",
            );
        }
        self
    }
}

/// Recipient display name, tagged with the realm so inboxes can tell
/// environments apart
pub fn recipient_name(realm: &str) -> String {
    format!("cron alerts ({})", realm)
}

/// Subject line for a run outcome, realm-prefixed and lower-cased
pub fn subject_for(status: ExitStatus, realm: &str) -> String {
    let subject = match status {
        ExitStatus::Success => format!("[{}] cron job success report", realm),
        ExitStatus::Failure(_) => format!("[{}] cron job failure", realm),
    };
    subject.to_lowercase()
}

/// Join an argument vector into the command line shown in reports
pub fn command_text(argv: &[String]) -> String {
    argv.join(" ")
}

fn body_text(command: &str, exit_code: i32, log_content: &str) -> String {
    format!(
        "command: {}\nexit code: {}\n\nlog output:\n{}",
        command, exit_code, log_content
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_subject_is_lowercase_and_prefixed() {
        let subject = subject_for(ExitStatus::Failure(1), "Prod-EU");
        assert_eq!(subject, "[prod-eu] cron job failure");
    }

    #[test]
    fn test_success_subject() {
        let subject = subject_for(ExitStatus::Success, "staging");
        assert_eq!(subject, "[staging] cron job success report");
    }

    #[test]
    fn test_body_contains_all_pieces() {
        let log = "line one\nline \"two\"\nünïcödé ✓\n";
        let payload = Payload::build(
            "backup --full /srv",
            3,
            log,
            "ops@example.com",
            "cron@example.com",
            subject_for(ExitStatus::Failure(3), "prod"),
            "prod",
        );

        assert!(payload.body.contains("command: backup --full /srv\n"));
        assert!(payload.body.contains("exit code: 3\n"));
        assert!(payload.body.ends_with(log));
        assert_eq!(payload.to.email, "ops@example.com");
        assert_eq!(payload.to.name, "cron alerts (prod)");
        assert_eq!(payload.from.email, "cron@example.com");
        assert_eq!(payload.from.name, SENDER_NAME);
    }

    #[test]
    fn test_log_file_note() {
        let build = || {
            Payload::build(
                "false",
                1,
                "out\n",
                "ops@example.com",
                "cron@example.com",
                subject_for(ExitStatus::Failure(1), "prod"),
                "prod",
            )
        };

        let clean = build().with_log_file(Path::new("logs/run.log"), true);
        assert!(clean.body.contains("log output:\nout\n"));
        assert!(clean.body.ends_with("\nraw log: logs/run.log\n"));

        let lossy = build().with_log_file(Path::new("logs/run.log"), false);
        assert!(lossy.body.contains("raw log: logs/run.log\n"));
        assert!(lossy.body.contains("not valid UTF-8"));
    }

    #[test]
    fn test_command_text() {
        let argv = vec!["sh".to_string(), "-c".to_string(), "exit 3".to_string()];
        assert_eq!(command_text(&argv), "sh -c exit 3");
    }
}
