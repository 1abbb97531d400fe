//! cronalert - cron job wrapper with failure email notifications
//!
//! Runs a command, captures its combined stdout/stderr into a durable log
//! file while echoing it live, and emails the log when the command fails
//! (or always, with `-a`).
//!
//! # Modules
//!
//! - `adapters`: Notification backends (transactional email API)
//! - `core`: Execution logic (LogFile, Runner, Orchestrator)
//! - `domain`: Data structures (ExitStatus, Payload)
//! - `config`: Layered configuration
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Email ops@example.com if the backup fails
//! cronalert -f cron@example.com -e ops@example.com /usr/local/bin/backup --full
//!
//! # Always send a report
//! cronalert -a -f cron@example.com ./nightly.sh
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use adapters::{DeliveryClient, DeliveryOutcome, Notifier};
pub use config::{Config, ConfigError};
pub use core::{Orchestrator, RunReport, Runner};
pub use domain::{ExecutionResult, ExitStatus, Payload};
