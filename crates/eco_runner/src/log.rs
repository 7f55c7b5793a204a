//! Streamed log events and output helpers.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Log stream type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStream {
    Stdout,
    Stderr,
    /// Lines emitted by EcoArch itself (phase banners, demo steps)
    System,
}

impl std::fmt::Display for LogStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdout => write!(f, "stdout"),
            Self::Stderr => write!(f, "stderr"),
            Self::System => write!(f, "system"),
        }
    }
}

/// One line of output, delivered as soon as it is read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogLine {
    pub timestamp: DateTime<Utc>,
    pub stream: LogStream,
    pub message: String,
}

impl LogLine {
    pub fn new(stream: LogStream, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            stream,
            message: message.into(),
        }
    }

    pub fn system(message: impl Into<String>) -> Self {
        Self::new(LogStream::System, message)
    }
}

/// Sending half of a log event channel.
pub type LogSender = mpsc::UnboundedSender<LogLine>;

/// Receiving half of a log event channel.
pub type LogReceiver = mpsc::UnboundedReceiver<LogLine>;

const REDACTED: &str = "[REDACTED]";

fn sensitive_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?i)(password|secret|key|token|credential)\s*[:=]\s*\S+",
            r"-----BEGIN (RSA |EC )?PRIVATE KEY-----",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    })
}

/// Redact credentials and private key material from a log line.
pub fn sanitize_line(line: &str) -> String {
    let mut out = line.to_string();
    for pattern in sensitive_patterns() {
        out = pattern.replace_all(&out, REDACTED).into_owned();
    }
    out
}

/// Last `n` non-empty lines of `output`, joined with newlines.
pub fn tail_lines(output: &str, n: usize) -> String {
    let lines: Vec<&str> = output.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}
