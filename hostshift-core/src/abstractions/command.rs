//! Unified command execution interface
//!
//! The control-plane backend and the hook runner both shell out to external
//! programs. They do so through [`CommandExecutor`] so that timeouts,
//! output capture and "program not installed" detection behave the same
//! everywhere, and so tests can substitute scripted responses.

use crate::error::{HostshiftError, HostshiftResult};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

/// Options for command execution
#[derive(Debug, Clone, Default)]
pub struct CommandOptions {
    /// Timeout for command execution
    pub timeout: Option<Duration>,
    /// Whether to capture stdout and stderr
    pub capture_output: bool,
}

impl CommandOptions {
    /// Create new CommandOptions with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Enable output capture
    pub fn with_output_capture(mut self) -> Self {
        self.capture_output = true;
        self
    }
}

/// Output from command execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    /// Exit status code
    pub status: i32,
    /// Standard output
    pub stdout: Vec<u8>,
    /// Standard error
    pub stderr: Vec<u8>,
    /// Whether the command succeeded (exit code 0)
    pub success: bool,
    /// Execution duration
    pub duration: Duration,
}

impl CommandOutput {
    /// Successful output with the given stdout
    pub fn ok(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 0,
            stdout: stdout.into(),
            stderr: Vec::new(),
            success: true,
            duration: Duration::ZERO,
        }
    }

    /// Failed output with the given exit status and stderr
    pub fn failed(status: i32, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            stdout: Vec::new(),
            stderr: stderr.into(),
            success: false,
            duration: Duration::ZERO,
        }
    }

    /// Stderr as text, replacing invalid UTF-8
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }

    /// Check if command succeeded
    pub fn is_success(&self) -> bool {
        self.success
    }
}

/// Unified command execution interface
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Execute a command and wait for completion
    ///
    /// A non-zero exit status is not an error here; callers inspect
    /// [`CommandOutput::success`]. Errors are reserved for commands that
    /// could not be run at all or exceeded their timeout.
    async fn execute(
        &self,
        program: &str,
        args: &[&str],
        options: CommandOptions,
    ) -> HostshiftResult<CommandOutput>;
}

/// Standard implementation of CommandExecutor using tokio::process
#[derive(Debug, Clone)]
pub struct TokioCommandExecutor {
    /// Default timeout for commands
    pub default_timeout: Option<Duration>,
}

impl TokioCommandExecutor {
    /// Create a new TokioCommandExecutor
    pub fn new() -> Self {
        Self {
            default_timeout: Some(Duration::from_secs(120)),
        }
    }

    /// Create a new TokioCommandExecutor with custom default timeout
    pub fn with_default_timeout(timeout: Duration) -> Self {
        Self {
            default_timeout: Some(timeout),
        }
    }
}

impl Default for TokioCommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandExecutor for TokioCommandExecutor {
    #[instrument(skip(self, options), fields(args_count = args.len()))]
    async fn execute(
        &self,
        program: &str,
        args: &[&str],
        options: CommandOptions,
    ) -> HostshiftResult<CommandOutput> {
        debug!("Executing command: {} {}", program, args.join(" "));

        let start_time = std::time::Instant::now();
        let mut cmd = Command::new(program);
        cmd.args(args).stdin(Stdio::null()).kill_on_drop(true);

        if options.capture_output {
            cmd.stdout(Stdio::piped());
            cmd.stderr(Stdio::piped());
        }

        let timeout = options.timeout.or(self.default_timeout);

        let result = match timeout {
            Some(duration) => tokio::time::timeout(duration, run_to_completion(program, cmd))
                .await
                .map_err(|_| HostshiftError::CommandTimeout {
                    program: program.to_string(),
                    duration,
                })?,
            None => run_to_completion(program, cmd).await,
        };

        let elapsed = start_time.elapsed();
        match result {
            Ok(mut output) => {
                output.duration = elapsed;
                if !output.success {
                    debug!(
                        "Command exited with status {} after {:?}: {}",
                        output.status, elapsed, program
                    );
                }
                Ok(output)
            }
            Err(e) => {
                warn!("Command could not be run after {:?}: {} - {}", elapsed, program, e);
                Err(e)
            }
        }
    }
}

async fn run_to_completion(program: &str, mut cmd: Command) -> HostshiftResult<CommandOutput> {
    let output = cmd.output().await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            HostshiftError::dependency_missing(program, "executable not found on PATH")
        } else {
            HostshiftError::command_failed(program, format!("failed to spawn: {}", e))
        }
    })?;

    Ok(CommandOutput {
        status: output.status.code().unwrap_or(-1),
        stdout: output.stdout,
        stderr: output.stderr,
        success: output.status.success(),
        duration: Duration::ZERO,
    })
}

/// A scripted response for [`MockCommandExecutor`]
#[derive(Debug)]
pub struct MockExpectation {
    pub program: String,
    pub args: Vec<String>,
    pub response: HostshiftResult<CommandOutput>,
}

/// Mock implementation for testing
///
/// Expectations are matched on program and exact arguments and consumed
/// once. Every executed command line is recorded.
#[derive(Debug, Clone, Default)]
pub struct MockCommandExecutor {
    expectations: Arc<Mutex<Vec<MockExpectation>>>,
    calls: Arc<Mutex<Vec<Vec<String>>>>,
}

impl MockCommandExecutor {
    /// Create a new mock executor
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an expectation
    pub fn expect(&self, program: &str, args: &[&str], response: HostshiftResult<CommandOutput>) {
        lock(&self.expectations).push(MockExpectation {
            program: program.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            response,
        });
    }

    /// Command lines executed so far (program followed by arguments)
    pub fn calls(&self) -> Vec<Vec<String>> {
        lock(&self.calls).clone()
    }

    /// Verify all expectations were met
    pub fn verify(&self) -> HostshiftResult<()> {
        let remaining = lock(&self.expectations).len();
        if remaining == 0 {
            Ok(())
        } else {
            Err(HostshiftError::internal(format!(
                "{} expected commands were not executed",
                remaining
            )))
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl CommandExecutor for MockCommandExecutor {
    async fn execute(
        &self,
        program: &str,
        args: &[&str],
        _options: CommandOptions,
    ) -> HostshiftResult<CommandOutput> {
        let mut line = vec![program.to_string()];
        line.extend(args.iter().map(|s| s.to_string()));
        lock(&self.calls).push(line);

        let mut expectations = lock(&self.expectations);
        if let Some(pos) = expectations
            .iter()
            .position(|exp| exp.program == program && exp.args == args)
        {
            expectations.remove(pos).response
        } else {
            Err(HostshiftError::internal(format!(
                "Unexpected command: {} {}",
                program,
                args.join(" ")
            )))
        }
    }
}
