//! Domain types for the cron wrapper.
//!
//! - Status: exit status sum type and execution result
//! - Payload: notification contents

pub mod payload;
pub mod status;

pub use payload::{command_text, subject_for, Contact, Payload};
pub use status::{ExecutionResult, ExitStatus, SPAWN_FAILURE_CODE};
