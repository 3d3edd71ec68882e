//! Request handling shared by the Telegram handlers and the CLI

use std::sync::Arc;
use std::time::Duration;

use indoc::formatdoc;

use crate::core::config::{AppConfig, BotMode};
use crate::core::error::AppError;
use crate::core::process::ProcessRunner;
use crate::pipeline::interaction::{PendingReplies, ReplyError, Requester};
use crate::pipeline::notify::Notifier;
use crate::pipeline::orchestrator::Orchestrator;
use crate::pipeline::{DownloadRequest, JobReport};

pub const USAGE: &str = "Please provide a Tidal URL after the command, e.g. /download <URL>";

/// Where the remote destination of a request comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationSource {
    Fixed(String),
    /// Ask the requester, waiting at most `timeout` for the answer
    Prompt { timeout: Duration },
}

impl From<&BotMode> for DestinationSource {
    fn from(mode: &BotMode) -> Self {
        match mode {
            BotMode::Fixed { destination } => DestinationSource::Fixed(destination.clone()),
            BotMode::Interactive { prompt_timeout, .. } => DestinationSource::Prompt {
                timeout: *prompt_timeout,
            },
        }
    }
}

#[derive(Debug)]
pub enum RequestOutcome {
    /// No URL given; usage was sent, nothing ran
    MissingUrl,
    /// The requester already has an unanswered prompt
    PromptAlreadyPending,
    PromptTimedOut,
    PromptCancelled,
    EmptyDestination,
    /// The orchestrator ran; the report says how far it got
    Finished(JobReport),
}

/// First whitespace-separated argument of `/download`, if any.
pub fn parse_download_args(args: &str) -> Option<&str> {
    args.split_whitespace().next()
}

pub struct DownloadService {
    orchestrator: Orchestrator,
    destination: DestinationSource,
    replies: PendingReplies,
}

impl DownloadService {
    pub fn new(orchestrator: Orchestrator, destination: DestinationSource, replies: PendingReplies) -> Self {
        Self {
            orchestrator,
            destination,
            replies,
        }
    }

    /// Service for `config`, running external tools through `runner`.
    pub fn from_config(config: &AppConfig, runner: Arc<dyn ProcessRunner>) -> Self {
        Self::new(
            Orchestrator::new(config.pipeline.clone(), runner),
            DestinationSource::from(&config.mode),
            PendingReplies::new(),
        )
    }

    pub fn replies(&self) -> &PendingReplies {
        &self.replies
    }

    /// Handles `/download <args>` from `requester` end to end.
    pub async fn handle_download(&self, requester: Requester, args: &str, notifier: &dyn Notifier) -> RequestOutcome {
        let Some(url) = parse_download_args(args) else {
            notifier.notify(USAGE).await;
            return RequestOutcome::MissingUrl;
        };

        let destination = match &self.destination {
            DestinationSource::Fixed(destination) => destination.clone(),
            DestinationSource::Prompt { timeout } => match self.ask_destination(requester, *timeout, notifier).await {
                Ok(destination) => destination,
                Err(outcome) => return outcome,
            },
        };

        let request = DownloadRequest::new(url, destination);
        RequestOutcome::Finished(self.orchestrator.run(&request, notifier).await)
    }

    async fn ask_destination(
        &self,
        requester: Requester,
        timeout: Duration,
        notifier: &dyn Notifier,
    ) -> Result<String, RequestOutcome> {
        // Registered before the prompt goes out so an instant reply is not lost
        let waiter = match self.replies.register(requester) {
            Ok(waiter) => waiter,
            Err(_) => {
                log::info!("Rejected /download from {:?}: prompt already pending", requester);
                notifier
                    .notify("⚠️ I am still waiting for the destination of your previous /download. Reply with it or send /cancel.")
                    .await;
                return Err(RequestOutcome::PromptAlreadyPending);
            }
        };

        notifier
            .notify(&formatdoc! {"
                📂 Where should it be uploaded?
                Reply with the rclone destination (e.g. onedrive:Music) within {} seconds.",
                timeout.as_secs()
            })
            .await;

        match waiter.wait(timeout).await {
            Ok(destination) if destination.is_empty() => {
                notifier.notify("⚠️ Empty destination, download cancelled.").await;
                Err(RequestOutcome::EmptyDestination)
            }
            Ok(destination) => {
                log::info!("Destination for {:?}: {}", requester, destination);
                Ok(destination)
            }
            Err(ReplyError::TimedOut(timeout)) => {
                let err = AppError::InteractionTimeout { timeout };
                log::warn!("Prompt for {:?} expired: {}", requester, err);
                notifier
                    .notify(&format!("⌛ {}. The download was not started.", err))
                    .await;
                Err(RequestOutcome::PromptTimedOut)
            }
            Err(ReplyError::Cancelled | ReplyError::AlreadyPending) => {
                notifier.notify("🚫 Download cancelled.").await;
                Err(RequestOutcome::PromptCancelled)
            }
        }
    }

    /// Runs one request with an explicit destination, bypassing prompts.
    pub async fn run_once(&self, url: &str, destination: &str, notifier: &dyn Notifier) -> JobReport {
        let request = DownloadRequest::new(url, destination);
        self.orchestrator.run(&request, notifier).await
    }
}
