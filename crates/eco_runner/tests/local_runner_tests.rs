//! Integration tests for the local process runner.
//!
//! These use `sh` as a stand-in tool, so they run on any Unix host.

use std::time::Duration;

use eco_runner::{CommandSpec, LocalRunner, LogStream, ProcessRunner, RunConfig, RunnerError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn sh(script: &str) -> CommandSpec {
    CommandSpec::new("sh").arg("-c").arg(script)
}

#[tokio::test]
async fn test_run_captures_exit_code_and_output() {
    let runner = LocalRunner::new();
    let result = runner
        .run(&sh("echo hello; echo oops >&2; exit 3"), &RunConfig::default(), None)
        .await
        .unwrap();

    assert_eq!(result.exit_code, 3);
    assert!(!result.success());
    assert!(result.stdout.contains("hello"));
    assert!(result.stderr.contains("oops"));
    assert_eq!(result.tail(1), "oops");
}

#[tokio::test]
async fn test_run_streams_each_line() {
    let runner = LocalRunner::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    runner
        .run(&sh("echo one; echo two"), &RunConfig::default(), Some(tx))
        .await
        .unwrap();

    let mut lines = Vec::new();
    while let Some(line) = rx.recv().await {
        assert_eq!(line.stream, LogStream::Stdout);
        lines.push(line.message);
    }
    assert_eq!(lines, vec!["one", "two"]);
}

#[tokio::test]
async fn test_run_redacts_secrets_in_stream() {
    let runner = LocalRunner::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let result = runner
        .run(&sh("echo token=abc123"), &RunConfig::default(), Some(tx))
        .await
        .unwrap();

    let line = rx.recv().await.unwrap();
    assert!(!line.message.contains("abc123"));
    assert!(!result.stdout.contains("abc123"));
}

#[tokio::test]
async fn test_invalid_utf8_line_does_not_stop_reading() {
    let runner = LocalRunner::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let result = runner
        .run(
            &sh("printf 'before\\n\\377\\n'; echo after-line"),
            &RunConfig::default(),
            Some(tx),
        )
        .await
        .unwrap();

    assert!(result.success());
    assert!(result.stdout.contains("before"));
    assert!(result.stdout.contains('\u{FFFD}'));
    assert!(result.stdout.contains("after-line"));

    let mut lines = Vec::new();
    while let Some(line) = rx.recv().await {
        lines.push(line.message);
    }
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[2], "after-line");
}

#[tokio::test]
async fn test_heavy_output_after_invalid_utf8_completes() {
    let runner = LocalRunner::new();
    let script = "printf '\\377\\n'; i=0; while [ $i -lt 30000 ]; do echo line-$i; i=$((i+1)); done";

    let result = runner
        .run(&sh(script), &RunConfig::default(), None)
        .await
        .unwrap();

    assert_eq!(result.exit_code, 0);
    assert_eq!(result.tail(1), "line-29999");
}

#[tokio::test]
async fn test_zero_timeout_still_kills() {
    let runner = LocalRunner::new();
    let config = RunConfig::default().timeout(0);

    let outcome = tokio::time::timeout(
        Duration::from_secs(10),
        runner.run(&sh("sleep 30"), &config, None),
    )
    .await
    .expect("run must stay bounded");

    assert!(matches!(outcome, Err(RunnerError::Timeout { seconds: 1, .. })));
}

#[tokio::test]
async fn test_timeout_kills_process_and_keeps_tail() {
    let runner = LocalRunner::new();
    let config = RunConfig::default().timeout(1);

    let started = std::time::Instant::now();
    let err = runner
        .run(&sh("echo before-hang; sleep 30"), &config, None)
        .await
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(10));
    match err {
        RunnerError::Timeout { seconds, tail } => {
            assert_eq!(seconds, 1);
            assert!(tail.contains("before-hang"));
        }
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[tokio::test]
async fn test_cancellation_kills_process() {
    let runner = LocalRunner::new();
    let token = CancellationToken::new();
    let config = RunConfig::default().cancel_with(token.clone());

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        token.cancel();
    });

    let err = runner.run(&sh("sleep 30"), &config, None).await.unwrap_err();
    canceller.await.unwrap();

    assert!(matches!(err, RunnerError::Cancelled));
}

#[tokio::test]
async fn test_missing_program_is_unavailable() {
    let runner = LocalRunner::new();
    let err = runner
        .run(
            &CommandSpec::new("definitely-not-a-real-tool-12345"),
            &RunConfig::default(),
            None,
        )
        .await
        .unwrap_err();

    assert!(err.is_unavailable());
    assert!(!runner.is_available("definitely-not-a-real-tool-12345").await);
}

#[tokio::test]
async fn test_environment_is_allow_listed() {
    std::env::set_var("ECOARCH_TEST_LEAK", "should-not-leak");
    let runner = LocalRunner::new();

    let result = runner
        .run(
            &sh("echo \"leak=[$ECOARCH_TEST_LEAK] auto=[$TF_IN_AUTOMATION]\"")
                .env("TF_IN_AUTOMATION", "1"),
            &RunConfig::default().redact(false),
            None,
        )
        .await
        .unwrap();

    assert!(result.stdout.contains("leak=[]"));
    assert!(result.stdout.contains("auto=[1]"));
}

#[tokio::test]
async fn test_workdir_is_respected() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("marker.txt"), "here").unwrap();

    let runner = LocalRunner::new();
    let result = runner
        .run(&sh("cat marker.txt").workdir(dir.path()), &RunConfig::default(), None)
        .await
        .unwrap();

    assert_eq!(result.stdout.trim(), "here");
}
