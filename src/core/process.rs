//! Process execution with timeout support
//!
//! External tools (the downloader and the sync tool) are described by a
//! [`ProcessSpec`] value and executed through the [`ProcessRunner`] trait, so the
//! pipeline can be driven by a fake runner in tests.

use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

/// Program plus ordered argument list, built by pure functions in the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory; `None` inherits the bot's cwd
    pub current_dir: Option<PathBuf>,
}

impl ProcessSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Human-readable command line for logs
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a process that exited with code 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Error, Debug)]
pub enum ProcessError {
    /// Could not start the program
    #[error("failed to spawn: {0}")]
    Spawn(#[source] std::io::Error),

    /// Non-zero exit or killed by a signal
    #[error("{}: {stderr}", describe_exit(.exit_code))]
    Failed { exit_code: Option<i32>, stderr: String },

    /// Still running when the budget ran out; the child is killed
    #[error("timed out after {}s", .0.as_secs())]
    TimedOut(Duration),
}

/// Renders an exit code, `None` meaning the process was terminated by a signal.
pub fn describe_exit(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run to completion, capturing both streams. Exactly one attempt.
    async fn run(&self, spec: &ProcessSpec, timeout: Duration) -> Result<ProcessOutput, ProcessError>;
}

/// [`ProcessRunner`] backed by `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, spec: &ProcessSpec, timeout: Duration) -> Result<ProcessOutput, ProcessError> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &spec.current_dir {
            cmd.current_dir(dir);
        }

        log::debug!("Spawning: {}", spec.display());
        let output = run_with_timeout(&mut cmd, timeout).await?;
        into_process_output(output)
    }
}

/// Run an async Command with a timeout.
///
/// The child is killed when the timeout fires (requires `kill_on_drop`).
pub async fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> Result<Output, ProcessError> {
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(ProcessError::Spawn(e)),
        Err(_) => Err(ProcessError::TimedOut(timeout)),
    }
}

fn into_process_output(output: Output) -> Result<ProcessOutput, ProcessError> {
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    match output.status.code() {
        Some(0) => Ok(ProcessOutput {
            exit_code: 0,
            stdout,
            stderr,
        }),
        exit_code => Err(ProcessError::Failed {
            exit_code,
            stderr: stderr.trim().to_string(),
        }),
    }
}
