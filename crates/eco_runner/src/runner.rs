//! Process runner trait and types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{CommandSpec, RunConfig};
use crate::error::RunnerResult;
use crate::log::{tail_lines, LogSender};

/// Result of a process execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Exit code (-1 when terminated by a signal)
    pub exit_code: i64,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
    /// Execution start time
    pub started_at: DateTime<Utc>,
    /// Execution end time
    pub finished_at: DateTime<Utc>,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl ExecutionResult {
    /// Check if execution was successful (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Get combined output (stdout + stderr).
    pub fn combined_output(&self) -> String {
        if self.stdout.is_empty() {
            self.stderr.clone()
        } else if self.stderr.is_empty() {
            self.stdout.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }

    /// Last `n` lines of combined output.
    pub fn tail(&self, n: usize) -> String {
        tail_lines(&self.combined_output(), n)
    }
}

/// Runs external tools.
///
/// A nonzero exit is reported through [`ExecutionResult::exit_code`], not as
/// an error; errors are reserved for spawn failures, timeouts and
/// cancellation.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Check whether `program` can be executed (`<program> version` succeeds).
    async fn is_available(&self, program: &str) -> bool;

    /// Run a command to completion, forwarding each output line to `events`.
    async fn run(
        &self,
        spec: &CommandSpec,
        config: &RunConfig,
        events: Option<LogSender>,
    ) -> RunnerResult<ExecutionResult>;
}
