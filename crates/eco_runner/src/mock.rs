//! Mock process runner for testing.
//!
//! Provides a configurable implementation of the ProcessRunner trait for
//! unit tests that must not depend on Terraform or Infracost being installed.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::config::{CommandSpec, RunConfig};
use crate::error::{RunnerError, RunnerResult};
use crate::log::{LogLine, LogSender, LogStream};
use crate::runner::{ExecutionResult, ProcessRunner};

/// Predefined mock response for one `run` call.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub exit_code: i64,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    /// Respond with a timeout error instead of a result
    pub timeout: bool,
}

impl MockResponse {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
            duration_ms: 100,
            timeout: false,
        }
    }

    pub fn failure(exit_code: i64, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
            duration_ms: 100,
            timeout: false,
        }
    }

    pub fn timed_out(partial_output: impl Into<String>) -> Self {
        Self {
            exit_code: -1,
            stdout: partial_output.into(),
            stderr: String::new(),
            duration_ms: 0,
            timeout: true,
        }
    }

    pub fn with_duration(mut self, ms: u64) -> Self {
        self.duration_ms = ms;
        self
    }
}

/// Captured call information for verification.
#[derive(Debug, Clone)]
pub struct CapturedCall {
    pub program: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub workdir: Option<PathBuf>,
    /// Files present in the working directory at call time, with contents
    pub workdir_files: BTreeMap<String, String>,
}

/// Mock process runner for testing.
///
/// Captures every call and replays predefined responses in order, cycling
/// once the list is exhausted.
#[derive(Clone)]
pub struct MockRunner {
    /// Programs reported as available.
    available: Arc<RwLock<Vec<String>>>,
    /// Predefined responses for run calls.
    responses: Arc<RwLock<Vec<MockResponse>>>,
    /// Index of next response to return.
    response_index: Arc<AtomicUsize>,
    /// Captured calls for verification.
    captured_calls: Arc<RwLock<Vec<CapturedCall>>>,
    /// Simulated spawn failure.
    unavailable: Arc<RwLock<bool>>,
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRunner {
    pub fn new() -> Self {
        Self {
            available: Arc::new(RwLock::new(Vec::new())),
            responses: Arc::new(RwLock::new(Vec::new())),
            response_index: Arc::new(AtomicUsize::new(0)),
            captured_calls: Arc::new(RwLock::new(Vec::new())),
            unavailable: Arc::new(RwLock::new(false)),
        }
    }

    /// Report `program` as installed.
    pub fn with_program(self, program: impl Into<String>) -> Self {
        self.available.write().push(program.into());
        self
    }

    /// Add a mock response for the next run call.
    pub fn add_response(self, response: MockResponse) -> Self {
        self.responses.write().push(response);
        self
    }

    /// Set multiple responses.
    pub fn with_responses(self, responses: Vec<MockResponse>) -> Self {
        *self.responses.write() = responses;
        self
    }

    /// Make every run fail as if the binary were missing.
    pub fn simulate_missing_tool(self) -> Self {
        *self.unavailable.write() = true;
        self
    }

    /// Get all captured calls.
    pub fn get_calls(&self) -> Vec<CapturedCall> {
        self.captured_calls.read().clone()
    }

    /// Get the number of calls made.
    pub fn call_count(&self) -> usize {
        self.captured_calls.read().len()
    }

    /// Calls whose first argument is `subcommand`.
    pub fn calls_for(&self, subcommand: &str) -> Vec<CapturedCall> {
        self.captured_calls
            .read()
            .iter()
            .filter(|c| c.args.first().map(String::as_str) == Some(subcommand))
            .cloned()
            .collect()
    }

    fn record_call(&self, spec: &CommandSpec) {
        let mut workdir_files = BTreeMap::new();
        if let Some(dir) = &spec.workdir {
            if let Ok(entries) = std::fs::read_dir(dir) {
                for entry in entries.flatten() {
                    let name = entry.file_name().to_string_lossy().to_string();
                    if let Ok(content) = std::fs::read_to_string(entry.path()) {
                        workdir_files.insert(name, content);
                    }
                }
            }
        }

        self.captured_calls.write().push(CapturedCall {
            program: spec.program.clone(),
            args: spec.args.clone(),
            env: spec.env.clone(),
            workdir: spec.workdir.clone(),
            workdir_files,
        });
    }

    fn next_response(&self) -> MockResponse {
        let responses = self.responses.read();
        if responses.is_empty() {
            return MockResponse::success("");
        }
        let index = self.response_index.fetch_add(1, Ordering::SeqCst);
        responses
            .get(index % responses.len())
            .cloned()
            .unwrap_or_else(|| MockResponse::success(""))
    }
}

#[async_trait]
impl ProcessRunner for MockRunner {
    async fn is_available(&self, program: &str) -> bool {
        self.available.read().iter().any(|p| p == program)
    }

    async fn run(
        &self,
        spec: &CommandSpec,
        config: &RunConfig,
        events: Option<LogSender>,
    ) -> RunnerResult<ExecutionResult> {
        self.record_call(spec);

        if *self.unavailable.read() {
            return Err(RunnerError::ToolUnavailable(format!(
                "{} not found in PATH",
                spec.program
            )));
        }

        let response = self.next_response();

        if let Some(tx) = &events {
            for line in response.stdout.lines() {
                let _ = tx.send(LogLine::new(LogStream::Stdout, line));
            }
            for line in response.stderr.lines() {
                let _ = tx.send(LogLine::new(LogStream::Stderr, line));
            }
        }

        if response.timeout {
            return Err(RunnerError::Timeout {
                seconds: config.timeout_seconds,
                tail: crate::log::tail_lines(&response.stdout, config.tail_lines),
            });
        }

        let started_at = Utc::now();
        let finished_at = started_at + chrono::Duration::milliseconds(response.duration_ms as i64);

        Ok(ExecutionResult {
            exit_code: response.exit_code,
            stdout: response.stdout,
            stderr: response.stderr,
            started_at,
            finished_at,
            duration_ms: response.duration_ms,
        })
    }
}
