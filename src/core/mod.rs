//! Core execution logic.
//!
//! This module contains:
//! - LogFile: Per-run durable log files
//! - Runner: Command execution with combined output capture
//! - Orchestrator: Run, decide, notify

pub mod logfile;
pub mod orchestrator;
pub mod runner;

// Re-export commonly used types
pub use logfile::LogFile;
pub use orchestrator::{Orchestrator, RunReport};
pub use runner::Runner;
