//! Command-line interface for cronalert.
//!
//! `cronalert [-e to-email] [-f from-email] [-a] [-h] <command...>`
//!
//! Exit codes: the wrapped command's own code, 1 for argument or internal
//! errors, 2 for missing sender configuration.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::builder::FalseyValueParser;
use clap::Parser;
use tracing::error;

use crate::config::{find_config_file, Config, ConfigError, Overrides};
use crate::core::Orchestrator;

/// Exit code for argument and internal errors
pub const EXIT_USAGE: u8 = 1;

/// Exit code for missing or invalid configuration
pub const EXIT_CONFIG: u8 = 2;

/// cronalert - run a command and email its log when it fails
#[derive(Parser, Debug)]
#[command(name = "cronalert")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Recipient email address
    #[arg(short = 'e', long = "to", env = "CRONALERT_TO", value_name = "TO_EMAIL")]
    pub to: Option<String>,

    /// Sender email address
    #[arg(short = 'f', long = "from", env = "CRONALERT_FROM", value_name = "FROM_EMAIL")]
    pub from: Option<String>,

    /// Send a report even when the command succeeds
    #[arg(short = 'a', long = "always")]
    pub always: bool,

    /// Deployment name used in subjects and recipient names
    #[arg(long, env = "CRONALERT_REALM")]
    pub realm: Option<String>,

    /// Notification API endpoint
    #[arg(long, env = "CRONALERT_ENDPOINT", hide = true)]
    pub endpoint: Option<String>,

    /// Directory for run logs
    #[arg(long, env = "CRONALERT_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Config file (default: ~/.cronalert/config.yaml)
    #[arg(long, env = "CRONALERT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Echo raw notification API responses
    #[arg(long, env = "CRONALERT_DEBUG", value_parser = FalseyValueParser::new())]
    pub debug: bool,

    /// Command to run, with its arguments
    #[arg(
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "COMMAND"
    )]
    pub command: Vec<String>,
}

impl Cli {
    /// Parse arguments, printing usage and mapping clap errors to our codes.
    ///
    /// Returns the exit code to use when parsing did not produce a command.
    pub fn parse_or_exit_code() -> Result<Self, ExitCode> {
        Self::try_parse().map_err(|e| {
            let code = match e.kind() {
                clap::error::ErrorKind::DisplayHelp
                | clap::error::ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(EXIT_USAGE),
            };
            // Nothing useful to do if the terminal is gone
            let _ = e.print();
            code
        })
    }

    /// Flag and environment values, before the config file is applied
    pub fn overrides(&self) -> Overrides {
        Overrides {
            from: self.from.clone(),
            to: self.to.clone(),
            realm: self.realm.clone(),
            endpoint: self.endpoint.clone(),
            log_dir: self.log_dir.clone(),
            // Token only from the environment, never argv
            api_token: std::env::var("CRONALERT_API_TOKEN").ok(),
            always_notify: self.always,
            debug: self.debug,
        }
    }

    /// Resolve configuration from flags, environment and config file
    pub fn resolve_config(&self) -> Result<Config, ConfigError> {
        let file = find_config_file(self.config.as_deref())?;
        Ok(Config::resolve(self.overrides(), file))
    }

    /// Execute the wrapped command
    pub async fn execute(self) -> ExitCode {
        let config = match self.resolve_config() {
            Ok(config) => config,
            Err(e) => {
                error!(error = %e, "Configuration error");
                return ExitCode::from(EXIT_CONFIG);
            }
        };

        let orchestrator = match Orchestrator::new(config) {
            Ok(orchestrator) => orchestrator,
            Err(e) => {
                error!(error = %format!("{:#}", e), "Configuration error");
                return if e.downcast_ref::<ConfigError>().is_some() {
                    ExitCode::from(EXIT_CONFIG)
                } else {
                    ExitCode::from(EXIT_USAGE)
                };
            }
        };

        match orchestrator.run(&self.command).await {
            Ok(report) => ExitCode::from(report.exit_code()),
            Err(e) => {
                error!(error = %format!("{:#}", e), "Wrapper failed");
                ExitCode::from(EXIT_USAGE)
            }
        }
    }
}
