//! Runner Integration Tests
//!
//! Tests for combined output capture, log file durability and the
//! wrapped-environment marker.

use cronalert::core::{LogFile, Runner};
use cronalert::domain::{ExitStatus, SPAWN_FAILURE_CODE};
use tempfile::TempDir;

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

async fn run(temp: &TempDir, parts: &[&str]) -> cronalert::ExecutionResult {
    let log = LogFile::create(&temp.path().join("logs")).await.unwrap();
    Runner::new()
        .with_mirror(false)
        .run(&argv(parts), log)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_success_exit_code() {
    let temp = TempDir::new().unwrap();
    let result = run(&temp, &["true"]).await;
    assert_eq!(result.status, ExitStatus::Success);
}

#[tokio::test]
async fn test_nonzero_exit_is_not_an_error() {
    let temp = TempDir::new().unwrap();
    let result = run(&temp, &["sh", "-c", "echo partial; exit 42"]).await;

    assert_eq!(result.status, ExitStatus::Failure(42));
    assert!(result.log_text().contains("partial\n"));
    assert!(result.log_text().contains("=== exit code: 42 ==="));
}

#[tokio::test]
async fn test_banner_always_present() {
    let temp = TempDir::new().unwrap();
    let result = run(&temp, &["false"]).await;

    let on_disk = std::fs::read_to_string(&result.log_path).unwrap();
    assert!(on_disk.contains("running command: false\n"));
    assert!(on_disk.starts_with("=== cronalert run "));
}

#[tokio::test]
async fn test_stdout_and_stderr_merged_in_write_order() {
    let temp = TempDir::new().unwrap();

    for _ in 0..50 {
        let result = run(
            &temp,
            &["sh", "-c", "echo A; echo B >&2; echo C; echo D >&2"],
        )
        .await;

        let text = result.log_text();
        let lines: Vec<&str> = text
            .lines()
            .filter(|line| matches!(*line, "A" | "B" | "C" | "D"))
            .collect();
        assert_eq!(lines, ["A", "B", "C", "D"], "log was: {}", text);
    }
}

#[tokio::test]
async fn test_interleaved_streams_keep_order_without_pauses() {
    let temp = TempDir::new().unwrap();
    let result = run(
        &temp,
        &[
            "sh",
            "-c",
            "i=0; while [ $i -lt 200 ]; do echo out$i; echo err$i >&2; i=$((i+1)); done",
        ],
    )
    .await;

    let text = result.log_text();
    let expected: Vec<String> = (0..200)
        .flat_map(|i| [format!("out{}", i), format!("err{}", i)])
        .collect();
    let lines: Vec<&str> = text
        .lines()
        .filter(|line| line.starts_with("out") || line.starts_with("err"))
        .collect();
    assert_eq!(lines, expected);
}

#[tokio::test]
async fn test_child_sees_wrapper_marker() {
    let temp = TempDir::new().unwrap();
    let result = run(&temp, &["sh", "-c", "echo marker=$CRONALERT_WRAPPED"]).await;
    assert!(result.log_text().contains("marker=1\n"));
}

#[tokio::test]
async fn test_non_utf8_bytes_kept_verbatim_in_log() {
    let temp = TempDir::new().unwrap();
    let result = run(&temp, &["sh", "-c", "printf 'a\\377\\376b'"]).await;

    let on_disk = std::fs::read(&result.log_path).unwrap();
    assert!(on_disk.windows(4).any(|w| w == [b'a', 0xff, 0xfe, b'b']));
    assert_eq!(on_disk, result.captured);
}

#[tokio::test]
async fn test_large_output_fully_captured() {
    let temp = TempDir::new().unwrap();
    let result = run(&temp, &["sh", "-c", "head -c 1000000 /dev/zero"]).await;

    let zeros = result.captured.iter().filter(|b| **b == 0).count();
    assert_eq!(zeros, 1_000_000);
}

#[tokio::test]
async fn test_spawn_failure_reported_as_127() {
    let temp = TempDir::new().unwrap();
    let result = run(&temp, &["/definitely/not/a/real/command"]).await;

    assert_eq!(result.status, ExitStatus::Failure(SPAWN_FAILURE_CODE));
    assert!(result
        .log_text()
        .contains("failed to spawn '/definitely/not/a/real/command'"));
    assert!(result.log_path.exists());
}

#[tokio::test]
async fn test_log_file_persists_after_run() {
    let temp = TempDir::new().unwrap();
    let result = run(&temp, &["echo", "hello"]).await;

    assert!(result.log_path.exists());
    assert!(result.log_path.starts_with(temp.path().join("logs")));
    assert!(std::fs::read_to_string(&result.log_path)
        .unwrap()
        .contains("hello\n"));
}
