//! Common test utilities
//!
//! This module is shared across all integration tests

#![allow(dead_code)]

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use secrecy::SecretString;
use teloxide::types::{ChatId, UserId};

use tidalbot::core::config::{Credentials, PipelineConfig};
use tidalbot::pipeline::{Notifier, Requester};

pub const ALBUM_URL: &str = "https://tidal.com/browse/album/123";

pub fn credentials(username: &str) -> Credentials {
    Credentials {
        username: username.to_string(),
        password: SecretString::from(format!("{}-password", username)),
    }
}

/// Pipeline config rooted in a scratch directory, default tool names
pub fn pipeline_config(jobs_root: &Path, username: &str) -> PipelineConfig {
    PipelineConfig::new(jobs_root, credentials(username))
}

pub fn requester(id: i64) -> Requester {
    Requester::new(ChatId(id), UserId(id as u64))
}

/// Keeps every notification in order
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.messages.lock().unwrap().last().cloned()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.messages.lock().unwrap().iter().any(|m| m.contains(needle))
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, text: &str) {
        self.messages.lock().unwrap().push(text.to_string());
    }
}
