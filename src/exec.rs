//! Whitelisted external command execution.
//!
//! Every telemetry getter and control action funnels through
//! [`CommandExecutor::execute`]. Programs are started directly from an argument
//! vector, never through a shell, so nothing a caller supplies can be expanded
//! as shell syntax. Standard error is discarded.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// The marker callers see in place of output when a command fails.
pub const FAILURE_SENTINEL: &str = "error";

/// Why a command did not produce usable output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The program ran and exited unsuccessfully (`None` when killed by a signal).
    NonZeroExit(Option<i32>),
    /// The program did not finish before the deadline and was killed.
    Timeout,
    /// The executable could not be found.
    NotFound,
    /// The program could not be started or waited on.
    Spawn(String),
}

/// Outcome of a single command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Captured standard output with trailing whitespace removed.
    Success(String),
    Failure(FailureReason),
}

impl CommandResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Output text, or [`FAILURE_SENTINEL`] for any failure.
    pub fn output(&self) -> &str {
        match self {
            Self::Success(output) => output,
            Self::Failure(_) => FAILURE_SENTINEL,
        }
    }

    /// Output text only when the command succeeded.
    pub fn success_output(&self) -> Option<&str> {
        match self {
            Self::Success(output) => Some(output),
            Self::Failure(_) => None,
        }
    }
}

/// Runs a program from an argument vector with a deadline.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run `argv[0]` with the remaining elements as arguments.
    ///
    /// Never fails past this boundary: every error category is folded into
    /// [`CommandResult::Failure`]. Each call is a single attempt.
    async fn execute(&self, argv: &[&str], timeout: Duration) -> CommandResult;
}

/// [`CommandExecutor`] backed by real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

#[async_trait]
impl CommandExecutor for SystemExecutor {
    async fn execute(&self, argv: &[&str], timeout: Duration) -> CommandResult {
        let Some((program, args)) = argv.split_first() else {
            return CommandResult::Failure(FailureReason::Spawn(
                "empty argument vector".to_string(),
            ));
        };

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(program = %program, "executable not found");
                return CommandResult::Failure(FailureReason::NotFound);
            }
            Err(e) => {
                warn!(program = %program, "failed to spawn command: {}", e);
                return CommandResult::Failure(FailureReason::Spawn(e.to_string()));
            }
        };

        // Dropping the wait future on timeout drops the child, which kills it.
        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Err(_) => {
                warn!(program = %program, ?timeout, "command timed out");
                CommandResult::Failure(FailureReason::Timeout)
            }
            Ok(Err(e)) => {
                warn!(program = %program, "failed to wait for command: {}", e);
                CommandResult::Failure(FailureReason::Spawn(e.to_string()))
            }
            Ok(Ok(output)) if output.status.success() => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                CommandResult::Success(stdout.trim_end().to_string())
            }
            Ok(Ok(output)) => {
                debug!(program = %program, status = ?output.status, "command exited unsuccessfully");
                CommandResult::Failure(FailureReason::NonZeroExit(output.status.code()))
            }
        }
    }
}
