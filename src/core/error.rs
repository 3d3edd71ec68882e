use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::core::process::describe_exit;
use crate::pipeline::Stage;

/// Centralized error types for the application
///
/// Per-request failures (everything except the startup variants) are caught at
/// the orchestrator boundary and turned into a chat notification through
/// [`AppError::user_message`]. Startup variants abort the process before the
/// bot connects.
#[derive(Error, Debug)]
pub enum AppError {
    /// The downloader configuration file could not be written
    #[error("Failed to write downloader config {path}: {source}")]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An external tool exited unsuccessfully
    #[error("{stage} failed ({}): {stderr}", describe_exit(.exit_code))]
    Process {
        stage: Stage,
        exit_code: Option<i32>,
        stderr: String,
    },

    /// An external tool ran longer than its budget and was killed
    #[error("{stage} timed out after {}s", .timeout.as_secs())]
    ProcessTimeout { stage: Stage, timeout: Duration },

    /// An external tool could not be started at all (missing binary, permissions)
    #[error("Failed to start {program} for {stage}: {source}")]
    Spawn {
        stage: Stage,
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The downloader succeeded but left no directory to sync
    #[error("No downloaded directory found under {}", .root.display())]
    DirectoryNotFound { root: PathBuf },

    /// The requester did not answer the destination prompt in time
    #[error("No destination received within {}s", .timeout.as_secs())]
    InteractionTimeout { timeout: Duration },

    /// A required environment value is missing or empty
    #[error("Required setting {0} is not set")]
    StartupConfigMissing(&'static str),

    /// An environment value is present but unusable
    #[error("Invalid value for {var}: {reason}")]
    InvalidConfig { var: &'static str, reason: String },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Stage of the download/sync sequence this error belongs to, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            AppError::ConfigWrite { .. } => Some(Stage::ConfigWrite),
            AppError::Process { stage, .. }
            | AppError::ProcessTimeout { stage, .. }
            | AppError::Spawn { stage, .. } => Some(*stage),
            AppError::DirectoryNotFound { .. } => Some(Stage::Resolve),
            _ => None,
        }
    }

    /// Short machine-friendly category, used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::ConfigWrite { .. } => "config_write",
            AppError::Process { .. } => "process_failure",
            AppError::ProcessTimeout { .. } => "process_timeout",
            AppError::Spawn { .. } => "spawn",
            AppError::DirectoryNotFound { .. } => "directory_not_found",
            AppError::InteractionTimeout { .. } => "interaction_timeout",
            AppError::StartupConfigMissing(_) => "startup_config_missing",
            AppError::InvalidConfig { .. } => "invalid_config",
            AppError::Io(_) => "io",
        }
    }

    /// Plain-text notification sent to the requester.
    ///
    /// Always names the failing stage and carries the raw diagnostic text.
    pub fn user_message(&self) -> String {
        match self.stage() {
            Some(stage) => format!("❌ An error occurred during the {} stage: {}", stage, self),
            None => format!("❌ An error occurred: {}", self),
        }
    }
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;
