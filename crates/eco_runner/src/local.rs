//! Local subprocess runner.
//!
//! Spawns tools directly (no shell), clears the inherited environment and
//! streams output line by line while racing the process against its
//! deadline and cancellation token.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{CommandSpec, RunConfig};
use crate::error::{RunnerError, RunnerResult};
use crate::log::{sanitize_line, tail_lines, LogLine, LogSender, LogStream};
use crate::runner::{ExecutionResult, ProcessRunner};

/// How long pipes are drained after a kill; grandchildren may keep them open.
const DRAIN_AFTER_KILL: Duration = Duration::from_secs(2);

/// Output captured by a pipe reader, readable while the reader still runs.
struct PipeCapture {
    buffer: Arc<Mutex<String>>,
    task: JoinHandle<()>,
}

impl PipeCapture {
    async fn finish(self, bounded: bool) -> String {
        if bounded {
            let mut task = self.task;
            if tokio::time::timeout(DRAIN_AFTER_KILL, &mut task).await.is_err() {
                task.abort();
            }
        } else if let Err(e) = self.task.await {
            warn!("Pipe reader failed: {}", e);
        }
        let output = self.buffer.lock().clone();
        output
    }
}

/// Runner executing tools on the local machine.
#[derive(Debug, Clone)]
pub struct LocalRunner {
    availability_timeout: Duration,
}

impl Default for LocalRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalRunner {
    pub fn new() -> Self {
        Self {
            availability_timeout: Duration::from_secs(10),
        }
    }

    /// Read a pipe line by line, forwarding each line as it arrives.
    fn spawn_reader<R>(
        pipe: R,
        stream: LogStream,
        events: Option<LogSender>,
        redact: bool,
    ) -> PipeCapture
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = Arc::new(Mutex::new(String::new()));
        let output = Arc::clone(&buffer);
        let task = tokio::spawn(async move {
            let mut reader = BufReader::new(pipe);
            let mut raw = Vec::new();
            loop {
                raw.clear();
                match reader.read_until(b'\n', &mut raw).await {
                    Ok(0) => break,
                    Ok(_) => {
                        let line = decode_line(&raw);
                        let line = if redact { sanitize_line(&line) } else { line };
                        {
                            let mut output = output.lock();
                            output.push_str(&line);
                            output.push('\n');
                        }
                        if let Some(tx) = &events {
                            // Receiver gone means nobody is watching; keep draining the pipe.
                            let _ = tx.send(LogLine::new(stream, line));
                        }
                    }
                    Err(e) => {
                        warn!("Failed reading {} pipe: {}", stream, e);
                        break;
                    }
                }
            }
        });
        PipeCapture { buffer, task }
    }
}

/// Strip the line ending; invalid UTF-8 is replaced rather than rejected.
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

#[async_trait]
impl ProcessRunner for LocalRunner {
    async fn is_available(&self, program: &str) -> bool {
        let status = Command::new(program)
            .arg("version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();

        match tokio::time::timeout(self.availability_timeout, status).await {
            Ok(Ok(status)) => status.success(),
            Ok(Err(e)) => {
                debug!("{} not available: {}", program, e);
                false
            }
            Err(_) => {
                warn!("{} version check timed out", program);
                false
            }
        }
    }

    async fn run(
        &self,
        spec: &CommandSpec,
        config: &RunConfig,
        events: Option<LogSender>,
    ) -> RunnerResult<ExecutionResult> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .env_clear()
            .envs(spec.env_policy.resolve(&spec.env))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &spec.workdir {
            cmd.current_dir(dir);
        }

        info!("Running: {}", spec.display());

        let started_at = Utc::now();
        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RunnerError::ToolUnavailable(format!("{} not found in PATH", spec.program))
            } else {
                RunnerError::SpawnFailed {
                    program: spec.program.clone(),
                    source: e,
                }
            }
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RunnerError::ExecutionFailed("stdout was not captured".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| RunnerError::ExecutionFailed("stderr was not captured".into()))?;

        let stdout_task =
            Self::spawn_reader(stdout, LogStream::Stdout, events.clone(), config.redact_secrets);
        let stderr_task =
            Self::spawn_reader(stderr, LogStream::Stderr, events, config.redact_secrets);

        let deadline = tokio::time::sleep(Duration::from_secs(config.timeout_seconds));

        enum Outcome {
            Exited(std::process::ExitStatus),
            TimedOut,
            Cancelled,
        }

        let outcome = tokio::select! {
            _ = config.cancel.cancelled() => Outcome::Cancelled,
            _ = deadline => Outcome::TimedOut,
            status = child.wait() => Outcome::Exited(status?),
        };

        let killed = !matches!(outcome, Outcome::Exited(_));
        if killed {
            if let Err(e) = child.kill().await {
                warn!("Failed to kill {}: {}", spec.program, e);
            }
        }

        let stdout = stdout_task.finish(killed).await;
        let stderr = stderr_task.finish(killed).await;
        let finished_at = Utc::now();
        let duration_ms = (finished_at - started_at).num_milliseconds().max(0) as u64;

        match outcome {
            Outcome::Cancelled => {
                warn!("{} cancelled after {}ms", spec.program, duration_ms);
                Err(RunnerError::Cancelled)
            }
            Outcome::TimedOut => {
                error!(
                    "{} timed out after {}s, process killed",
                    spec.program, config.timeout_seconds
                );
                let combined = format!("{}\n{}", stdout, stderr);
                Err(RunnerError::Timeout {
                    seconds: config.timeout_seconds,
                    tail: tail_lines(&combined, config.tail_lines),
                })
            }
            Outcome::Exited(status) => {
                let exit_code = status.code().map(i64::from).unwrap_or(-1);
                if exit_code == 0 {
                    info!("{} completed successfully in {}ms", spec.program, duration_ms);
                } else {
                    error!(
                        "{} failed with exit code {} after {}ms",
                        spec.program, exit_code, duration_ms
                    );
                }
                Ok(ExecutionResult {
                    exit_code,
                    stdout,
                    stderr,
                    started_at,
                    finished_at,
                    duration_ms,
                })
            }
        }
    }
}
