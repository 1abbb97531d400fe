//! Run orchestration.
//!
//! NOT_STARTED -> RUNNING -> {SUCCEEDED, FAILED} -> NOTIFYING? -> DONE
//!
//! The wrapper's exit code always mirrors the wrapped command, whatever
//! happens to the notification.

use std::path::PathBuf;

use anyhow::Result;
use tracing::{debug, error, info, instrument, warn};

use crate::adapters::{DeliveryClient, DeliveryOutcome, Notifier};
use crate::config::{Config, ConfigError};
use crate::domain::{command_text, subject_for, ExecutionResult, ExitStatus, Payload};

use super::logfile::LogFile;
use super::runner::Runner;

/// What happened during one wrapped run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// How the wrapped command exited
    pub status: ExitStatus,

    /// Durable log file for the run
    pub log_path: PathBuf,

    /// Delivery outcome, if a notification was sent
    pub delivery: Option<DeliveryOutcome>,
}

impl RunReport {
    /// Process exit code: the wrapped command's, never the notification's
    pub fn exit_code(&self) -> u8 {
        self.status.process_exit_code()
    }
}

/// Main run orchestrator
pub struct Orchestrator {
    config: Config,
    sender: String,
    recipient: String,
    runner: Runner,
    notifier: Box<dyn Notifier>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("realm", &self.config.realm)
            .field("sender", &self.sender)
            .field("recipient", &self.recipient)
            .field("notifier", &self.notifier.name())
            .finish()
    }
}

impl Orchestrator {
    /// Create an orchestrator delivering through the email API.
    ///
    /// Fails with `MissingSender` before anything runs.
    pub fn new(config: Config) -> Result<Self> {
        // Validate first so a missing sender surfaces as ConfigError
        config.sender()?;

        if config.api_token.is_none() {
            warn!("No API token configured (CRONALERT_API_TOKEN); notifications will be rejected");
        }

        let client = DeliveryClient::new(
            config.endpoint.clone(),
            config.api_token.clone().unwrap_or_default(),
            config.delivery.clone(),
        )?
        .with_debug(config.debug);

        let orchestrator = Self::with_notifier(config, Box::new(client))?;
        Ok(orchestrator)
    }

    /// Create an orchestrator with a custom notifier
    pub fn with_notifier(config: Config, notifier: Box<dyn Notifier>) -> Result<Self, ConfigError> {
        let sender = config.sender()?.to_string();
        let recipient = config.recipient()?.to_string();

        Ok(Self {
            config,
            sender,
            recipient,
            runner: Runner::new(),
            notifier,
        })
    }

    /// Replace the runner (e.g. to silence console mirroring)
    pub fn with_runner(mut self, runner: Runner) -> Self {
        self.runner = runner;
        self
    }

    /// Run the command, notify if warranted, and report
    #[instrument(skip(self, argv), fields(realm = %self.config.realm))]
    pub async fn run(&self, argv: &[String]) -> Result<RunReport> {
        let log = LogFile::create(&self.config.log_dir).await?;
        let result = self.runner.run(argv, log).await?;

        let should_notify = match result.status {
            ExitStatus::Failure(code) => {
                info!(code, "Command failed");
                true
            }
            ExitStatus::Success => {
                info!("Command succeeded");
                self.config.always_notify
            }
        };

        let delivery = if should_notify {
            Some(self.notify(argv, &result).await)
        } else {
            debug!("No notification needed");
            None
        };

        Ok(RunReport {
            status: result.status,
            log_path: result.log_path,
            delivery,
        })
    }

    /// Build and deliver the notification for a finished run
    async fn notify(&self, argv: &[String], result: &ExecutionResult) -> DeliveryOutcome {
        let payload = Payload::build(
            &command_text(argv),
            result.status.code(),
            &result.log_text(),
            &self.recipient,
            &self.sender,
            subject_for(result.status, &self.config.realm),
            &self.config.realm,
        )
        .with_log_file(&result.log_path, result.is_valid_utf8());

        info!(
            notifier = self.notifier.name(),
            to = %payload.to.email,
            subject = %payload.subject,
            "Sending notification"
        );

        let outcome = self.notifier.send(&payload).await;

        if outcome.is_success() {
            info!(
                status = ?outcome.http_status,
                attempts = outcome.attempts,
                "Notification sent"
            );
        } else {
            report_delivery_failure(&outcome, &result.log_path);
        }

        outcome
    }
}

/// A lost alert is an emergency: say so on stderr, loudly
fn report_delivery_failure(outcome: &DeliveryOutcome, log_path: &std::path::Path) {
    let status = outcome
        .http_status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "no response".to_string());

    error!(
        %status,
        attempts = outcome.attempts,
        response = %outcome.response_text(),
        log = %log_path.display(),
        "Notification delivery FAILED"
    );
    eprintln!(
        "cronalert: !!! FAILED TO SEND NOTIFICATION EMAIL (status: {}) !!!\ncronalert: response: {}\ncronalert: run log kept at {}",
        status,
        outcome.response_text(),
        log_path.display()
    );
}
