//! Command and run configuration types.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Environment variables a child process may inherit.
///
/// Covers the execution path, locale, cloud credentials, the Terraform
/// automation flag and the Infracost API key. Nothing else is forwarded.
pub const DEFAULT_ENV_ALLOW_LIST: &[&str] = &[
    "PATH",
    "HOME",
    "LANG",
    "LC_ALL",
    "GOOGLE_APPLICATION_CREDENTIALS",
    "GOOGLE_CREDENTIALS",
    "CLOUDSDK_CORE_PROJECT",
    "TF_IN_AUTOMATION",
    "TF_PLUGIN_CACHE_DIR",
    "INFRACOST_API_KEY",
];

/// Allow-list policy applied to a child process environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvPolicy {
    allowed: Vec<String>,
}

impl Default for EnvPolicy {
    fn default() -> Self {
        Self {
            allowed: DEFAULT_ENV_ALLOW_LIST.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl EnvPolicy {
    /// Policy with an explicit set of allowed variable names.
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn allows(&self, name: &str) -> bool {
        self.allowed.iter().any(|a| a == name)
    }

    /// Build the child environment from the current process environment
    /// plus explicit overrides. Overrides outside the allow-list are dropped.
    pub fn resolve(&self, overrides: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        self.resolve_with(overrides, |name| std::env::var(name).ok())
    }

    /// Same as [`EnvPolicy::resolve`] with an injectable variable lookup.
    pub fn resolve_with<F>(
        &self,
        overrides: &BTreeMap<String, String>,
        lookup: F,
    ) -> BTreeMap<String, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut env = BTreeMap::new();
        for name in &self.allowed {
            if let Some(value) = lookup(name) {
                env.insert(name.clone(), value);
            }
        }
        for (key, value) in overrides {
            if self.allows(key) {
                env.insert(key.clone(), value.clone());
            } else {
                warn!("Dropping environment override outside allow-list: {}", key);
            }
        }
        env
    }
}

/// A single external command invocation.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// Program to execute (name resolved through PATH, or absolute path)
    pub program: String,
    /// Arguments, passed verbatim without a shell
    pub args: Vec<String>,
    /// Working directory
    pub workdir: Option<PathBuf>,
    /// Explicit environment overrides
    pub env: BTreeMap<String, String>,
    /// Allow-list applied to the environment
    pub env_policy: EnvPolicy,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            workdir: None,
            env: BTreeMap::new(),
            env_policy: EnvPolicy::default(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn env_policy(mut self, policy: EnvPolicy) -> Self {
        self.env_policy = policy;
        self
    }

    /// Human-readable command line for logs.
    pub fn display(&self) -> String {
        let mut cmd = self.program.clone();
        for arg in &self.args {
            if arg.contains(' ') || arg.contains('=') {
                cmd.push_str(&format!(" '{}'", arg));
            } else {
                cmd.push_str(&format!(" {}", arg));
            }
        }
        cmd
    }
}

/// Run configuration with timeout and streaming options.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Hard timeout in seconds; every run is bounded
    pub timeout_seconds: u64,
    /// Number of trailing output lines kept in timeout/failure reports
    pub tail_lines: usize,
    /// Whether streamed lines are passed through the secret redactor
    pub redact_secrets: bool,
    /// Cancelling this token kills the process
    pub cancel: CancellationToken,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 300,
            tail_lines: 20,
            redact_secrets: true,
            cancel: CancellationToken::new(),
        }
    }
}

impl RunConfig {
    /// Set the hard timeout, at least one second.
    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds.max(1);
        self
    }

    pub fn tail(mut self, lines: usize) -> Self {
        self.tail_lines = lines;
        self
    }

    pub fn redact(mut self, enabled: bool) -> Self {
        self.redact_secrets = enabled;
        self
    }

    pub fn cancel_with(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }
}
