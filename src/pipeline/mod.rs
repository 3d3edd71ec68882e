//! Download-and-sync pipeline
//!
//! - `settings`: downloader settings file (ConfigWriter)
//! - `workspace`: per-request paths and downloaded-directory resolution
//! - `orchestrator`: the config → download → resolve → sync sequence
//! - `interaction`: single-reply destination prompt
//! - `service`: request handling shared by the bot and the CLI

pub mod interaction;
pub mod notify;
pub mod orchestrator;
pub mod service;
pub mod settings;
pub mod workspace;

use std::path::PathBuf;

use strum::Display;
use uuid::Uuid;

pub use interaction::{PendingReplies, ReplyError, Requester};
pub use notify::Notifier;
pub use orchestrator::Orchestrator;
pub use service::{DestinationSource, DownloadService, RequestOutcome};

/// Step of the sequence, named in error notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Stage {
    #[strum(serialize = "config-write")]
    ConfigWrite,
    #[strum(serialize = "download")]
    Download,
    #[strum(serialize = "resolve")]
    Resolve,
    #[strum(serialize = "sync")]
    Sync,
}

/// One `/download` request, alive only while it is being handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub job_id: Uuid,
    pub source_url: String,
    pub destination: String,
}

impl DownloadRequest {
    pub fn new(source_url: impl Into<String>, destination: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), source_url, destination)
    }

    pub fn with_id(job_id: Uuid, source_url: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            job_id,
            source_url: source_url.into(),
            destination: destination.into(),
        }
    }
}

/// Orchestrator state. `Errored` is absorbing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Idle,
    ConfigWritten,
    Downloaded,
    Synced,
    Done,
    Errored { stage: Stage },
}

/// What happened to a request that reached the orchestrator.
#[derive(Debug)]
pub struct JobReport {
    pub job_id: Uuid,
    pub state: JobState,
    /// Directory handed to the sync tool, once resolved
    pub local_path: Option<PathBuf>,
    /// Set when `state` is `Errored`
    pub error: Option<crate::core::error::AppError>,
}

impl JobReport {
    pub fn succeeded(&self) -> bool {
        self.state == JobState::Done
    }
}
