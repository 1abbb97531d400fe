//! Exit status of a wrapped command and the result of one execution.

use std::path::PathBuf;

/// Exit code used when the command could not be spawned at all
pub const SPAWN_FAILURE_CODE: i32 = 127;

/// Outcome of the wrapped command
///
/// Zero is `Success`; anything else is `Failure` carrying the non-zero code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Command exited with code 0
    Success,

    /// Command exited with a non-zero code
    Failure(i32),
}

impl ExitStatus {
    /// Classify a raw exit code
    pub fn from_code(code: i32) -> Self {
        if code == 0 {
            Self::Success
        } else {
            Self::Failure(code)
        }
    }

    /// Classify a process exit status
    ///
    /// A child terminated by a signal is reported as `128 + signal`.
    pub fn from_process(status: std::process::ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Self::from_code(code);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Self::Failure(128 + signal);
            }
        }

        Self::Failure(1)
    }

    /// The numeric exit code as reported by the command
    pub fn code(&self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Failure(code) => *code,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Exit code for this process, truncated to 0..=255.
    ///
    /// A failure never truncates to 0.
    pub fn process_exit_code(&self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failure(code) => match (*code & 0xff) as u8 {
                0 => 1,
                truncated => truncated,
            },
        }
    }
}

impl std::fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure(code) => write!(f, "failure (exit code {})", code),
        }
    }
}

/// Result of running one command under the wrapper
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// How the command exited
    pub status: ExitStatus,

    /// Durable log file holding the banner and combined output
    pub log_path: PathBuf,

    /// Everything written to the log file, in order
    pub captured: Vec<u8>,
}

impl ExecutionResult {
    /// Captured log content as text; invalid UTF-8 is replaced
    pub fn log_text(&self) -> String {
        String::from_utf8_lossy(&self.captured).into_owned()
    }

    /// Whether `log_text` reproduces the captured bytes exactly
    pub fn is_valid_utf8(&self) -> bool {
        std::str::from_utf8(&self.captured).is_ok()
    }
}
