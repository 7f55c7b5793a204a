//! # eco_runner
//!
//! Subprocess execution layer for EcoArch.
//!
//! Every external tool the engine drives (Infracost, Terraform) goes through
//! this crate, which guarantees:
//!
//! - **Explicit environment**: the child environment is cleared and rebuilt
//!   from an allow-list, so application secrets never reach the tool
//! - **Line streaming**: stdout/stderr are forwarded line by line over an
//!   event channel as they are produced
//! - **Hard timeouts**: a process that exceeds its deadline is killed and the
//!   tail of its output is kept for diagnosis
//! - **Cancellation**: cancelling a run stops reading and kills the process
//! - **Mock Runner**: scripted responses for tests without real binaries
//!
//! # Example
//!
//! ```rust,no_run
//! use eco_runner::{CommandSpec, LocalRunner, ProcessRunner, RunConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runner = LocalRunner::new();
//!     let spec = CommandSpec::new("terraform").arg("version");
//!
//!     let result = runner.run(&spec, &RunConfig::default().timeout(10), None).await?;
//!     println!("Exit code: {}", result.exit_code);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod local;
pub mod log;
pub mod mock;
pub mod runner;

pub use config::{CommandSpec, EnvPolicy, RunConfig};
pub use error::{RunnerError, RunnerResult};
pub use local::LocalRunner;
pub use log::{sanitize_line, tail_lines, LogLine, LogReceiver, LogSender, LogStream};
pub use mock::{CapturedCall, MockResponse, MockRunner};
pub use runner::{ExecutionResult, ProcessRunner};
