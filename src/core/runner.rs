//! Output capture runner.
//!
//! Spawns the wrapped command with stdout and stderr on a single pipe and
//! writes every chunk to the run's log file and to our own stderr in
//! lockstep. The full log is also kept in memory for the notification body,
//! so very large outputs cost their size in RAM.

use std::io::{self, PipeReader, Read};
use std::process::Stdio;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, Stderr};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::logfile::LogFile;
use crate::config::WRAPPED_ENV_VAR;
use crate::domain::{command_text, ExecutionResult, ExitStatus, SPAWN_FAILURE_CODE};

/// Read size for the child's output pipe
const CHUNK_SIZE: usize = 8 * 1024;

/// Runs one command and captures its combined output
pub struct Runner {
    /// Mirror child output to our stderr
    mirror: bool,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    /// Create a runner that mirrors output to the console
    pub fn new() -> Self {
        Self { mirror: true }
    }

    /// Enable or disable console mirroring
    pub fn with_mirror(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }

    /// Run `argv` to completion, capturing into `log`.
    ///
    /// A non-zero exit is a normal result, not an error. Errors are reserved
    /// for failures of the log file itself.
    #[instrument(skip_all, fields(log = %log.path.display()))]
    pub async fn run(&self, argv: &[String], log: LogFile) -> Result<ExecutionResult> {
        let (program, args) = argv.split_first().context("No command given")?;
        let command = command_text(argv);
        let run_id = Uuid::new_v4();

        let mut sink = Tee::new(log.file, self.mirror);
        sink.record(
            format!(
                "=== cronalert run {} started {} ===\nrunning command: {}\n",
                run_id,
                Utc::now().to_rfc3339(),
                command
            )
            .as_bytes(),
        )
        .await?;

        info!(%run_id, %command, "Running command");

        // stdout and stderr share one pipe so the kernel keeps write order
        let (reader, writer) = std::io::pipe().context("Failed to create output pipe")?;
        let mut child_command = Command::new(program);
        child_command
            .args(args)
            .env(WRAPPED_ENV_VAR, "1")
            .stdin(Stdio::inherit())
            .stdout(writer.try_clone().context("Failed to clone output pipe")?)
            .stderr(writer)
            .kill_on_drop(true);

        let spawned = child_command.spawn();
        // Release our copies of the write end, or the reader never sees EOF
        drop(child_command);

        let status = match spawned {
            Ok(child) => drain(child, reader, &mut sink).await?,
            Err(e) => {
                warn!(%program, error = %e, "Failed to spawn command");
                let message = format!("cronalert: failed to spawn '{}': {}\n", program, e);
                sink.mirror(message.as_bytes()).await?;
                ExitStatus::Failure(SPAWN_FAILURE_CODE)
            }
        };

        sink.record(format!("=== exit code: {} ===\n", status.code()).as_bytes())
            .await?;
        let captured = sink.finish().await?;

        debug!(%status, bytes = captured.len(), "Command finished");

        Ok(ExecutionResult {
            status,
            log_path: log.path,
            captured,
        })
    }
}

/// Pump the combined output pipe into the sink until it closes, then reap.
///
/// An early return drops `child`, which kills it (`kill_on_drop`).
async fn drain(mut child: Child, reader: PipeReader, sink: &mut Tee) -> Result<ExitStatus> {
    let (tx, mut rx) = mpsc::channel(16);
    tokio::task::spawn_blocking(move || pump(reader, tx));

    while let Some(chunk) = rx.recv().await {
        let chunk = chunk.context("Failed to read command output")?;
        sink.mirror(&chunk).await?;
    }

    let status = child
        .wait()
        .await
        .context("Failed to wait for command")?;

    Ok(ExitStatus::from_process(status))
}

/// Blocking read loop; stops at EOF or when the receiver goes away
fn pump(mut reader: PipeReader, tx: mpsc::Sender<io::Result<Vec<u8>>>) {
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if tx.blocking_send(Ok(buf[..n].to_vec())).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                let _ = tx.blocking_send(Err(e));
                break;
            }
        }
    }
}

/// Writes to the log file, the console and the in-memory copy together
struct Tee {
    file: File,
    console: Option<Stderr>,
    captured: Vec<u8>,
}

impl Tee {
    fn new(file: File, mirror: bool) -> Self {
        Self {
            file,
            console: mirror.then(tokio::io::stderr),
            captured: Vec::new(),
        }
    }

    /// Append to the log only (banner lines)
    async fn record(&mut self, bytes: &[u8]) -> Result<()> {
        self.file
            .write_all(bytes)
            .await
            .context("Failed to write log file")?;
        self.file.flush().await.context("Failed to write log file")?;
        self.captured.extend_from_slice(bytes);
        Ok(())
    }

    /// Append to the log and echo to the console
    async fn mirror(&mut self, bytes: &[u8]) -> Result<()> {
        self.record(bytes).await?;

        // The log file is authoritative; a closed console only stops echoing
        let echoed = match self.console.as_mut() {
            Some(console) => console.write_all(bytes).await.and(console.flush().await),
            None => Ok(()),
        };
        if let Err(e) = echoed {
            debug!(error = %e, "Console mirror closed");
            self.console = None;
        }
        Ok(())
    }

    async fn finish(mut self) -> Result<Vec<u8>> {
        self.file.flush().await.context("Failed to flush log file")?;
        self.file
            .sync_all()
            .await
            .context("Failed to sync log file")?;
        Ok(self.captured)
    }
}
