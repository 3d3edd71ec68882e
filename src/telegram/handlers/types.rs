//! Handler types, dependencies and access checks

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::Message;

use crate::core::config::AppConfig;
use crate::pipeline::{DownloadService, Requester};

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Who may start downloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPolicy {
    Anyone,
    /// Interactive mode asks for upload targets, so only the admin may use it
    AdminOnly(UserId),
}

impl AccessPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        config.admin().map_or(AccessPolicy::Anyone, AccessPolicy::AdminOnly)
    }

    pub fn allows(&self, user: UserId) -> bool {
        match self {
            AccessPolicy::Anyone => true,
            AccessPolicy::AdminOnly(admin) => *admin == user,
        }
    }
}

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub service: Arc<DownloadService>,
    pub access: AccessPolicy,
}

impl HandlerDeps {
    pub fn new(service: Arc<DownloadService>, access: AccessPolicy) -> Self {
        Self { service, access }
    }
}

/// Chat and sender of a message; `None` for channel posts without a sender
pub fn requester_of(msg: &Message) -> Option<Requester> {
    msg.from.as_ref().map(|user| Requester::new(msg.chat.id, user.id))
}
