//! Subprocess execution with captured output

use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

/// Why a child process did not finish cleanly
#[derive(Error, Debug)]
pub enum CommandError {
    /// The process could not be started
    #[error("Failed to spawn process: {0}")]
    Spawn(#[source] io::Error),

    /// The process started but collecting its output failed
    #[error("Failed to wait for process: {0}")]
    Wait(#[source] io::Error),

    /// The process exited unsuccessfully; `None` when killed by a signal
    #[error("Process exited with status {}", .code.map_or_else(|| "signal".to_string(), |c| c.to_string()))]
    NonZeroExit {
        /// Exit code, if any
        code: Option<i32>,
    },

    /// The process outlived its time limit and was killed
    #[error("Process timed out after {0:?}")]
    TimedOut(Duration),
}

/// Captured result of a finished child process
///
/// The three fields are independent: a process can exit non-zero and still
/// have written to both streams.
#[derive(Debug, Default)]
pub struct CommandOutput {
    /// Launch or exit failure, `None` if the process exited with status 0
    pub error: Option<CommandError>,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl CommandOutput {
    /// Output of a process that produced nothing but an error
    #[must_use]
    pub fn failed(error: CommandError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }
}

/// Runs an external program to completion
///
/// Implementations never fail through propagation: every failure of the child
/// is reported in [`CommandOutput::error`].
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `program` with `args` and waits for it to finish
    async fn run(&self, program: &Path, args: &[String]) -> CommandOutput;
}

/// Runs programs as tokio child processes
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
}

impl ProcessRunner {
    /// Creates a runner that kills children running longer than `timeout`
    #[must_use]
    pub const fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &Path, args: &[String]) -> CommandOutput {
        debug!("Running {} {}", program.display(), args.join(" "));

        let child = match Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => return CommandOutput::failed(CommandError::Spawn(e)),
        };

        // Dropping the wait future drops the child, which kills it
        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("{} timed out after {:?}, killed", program.display(), limit);
                    return CommandOutput::failed(CommandError::TimedOut(limit));
                }
            },
            None => child.wait_with_output().await,
        };

        let output = match result {
            Ok(output) => output,
            Err(e) => return CommandOutput::failed(CommandError::Wait(e)),
        };

        CommandOutput {
            error: (!output.status.success()).then(|| CommandError::NonZeroExit {
                code: output.status.code(),
            }),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}
