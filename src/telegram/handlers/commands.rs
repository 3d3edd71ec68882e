//! Command handler implementations (/start, /help, /download, /cancel)

use std::sync::Arc;

use indoc::formatdoc;
use teloxide::prelude::*;
use teloxide::types::Message;
use teloxide::utils::command::BotCommands;

use super::types::{requester_of, HandlerDeps, HandlerError};
use crate::pipeline::RequestOutcome;
use crate::telegram::bot::Command;
use crate::telegram::notifier::ChatNotifier;

const NOT_ALLOWED: &str = "⛔ You are not allowed to use this command.";

/// Handle /start command
pub(super) async fn handle_start_command(bot: &Bot, msg: &Message) -> Result<(), HandlerError> {
    let name = msg.from.as_ref().map(|u| u.first_name.as_str()).unwrap_or("there");
    bot.send_message(
        msg.chat.id,
        formatdoc! {"
            Hello, {}! I download music from Tidal and upload it to your cloud storage.
            Send /download <URL> to start, or /help for details.",
            name
        },
    )
    .await?;
    Ok(())
}

/// Handle /help command
pub(super) async fn handle_help_command(bot: &Bot, msg: &Message) -> Result<(), HandlerError> {
    bot.send_message(
        msg.chat.id,
        formatdoc! {"
            Send /download followed by a Tidal track, album or playlist URL.
            I will download it and sync it to the configured destination, reporting each step here.

            {}",
            Command::descriptions()
        },
    )
    .await?;
    Ok(())
}

/// Handle /download command
///
/// The work runs in its own task: the dispatcher serialises updates per chat,
/// and an interactive request waits for a later message from this same chat.
pub(super) async fn handle_download_command(
    bot: &Bot,
    msg: &Message,
    args: String,
    deps: &HandlerDeps,
) -> Result<(), HandlerError> {
    let Some(requester) = requester_of(msg) else {
        log::warn!("Ignoring /download without a sender in chat {}", msg.chat.id);
        return Ok(());
    };
    if !deps.access.allows(requester.user_id) {
        log::warn!("Refused /download from user {}", requester.user_id);
        bot.send_message(msg.chat.id, NOT_ALLOWED).await?;
        return Ok(());
    }

    let service = Arc::clone(&deps.service);
    let notifier = ChatNotifier::new(bot.clone(), msg.chat.id);
    tokio::spawn(async move {
        match service.handle_download(requester, &args, &notifier).await {
            RequestOutcome::Finished(report) if report.succeeded() => {
                log::info!("Request from {:?} finished (job {})", requester, report.job_id);
            }
            RequestOutcome::Finished(report) => {
                log::warn!(
                    "Request from {:?} ended in {:?} (job {})",
                    requester,
                    report.state,
                    report.job_id
                );
            }
            outcome => log::info!("Request from {:?} not started: {:?}", requester, outcome),
        }
    });
    Ok(())
}

/// Handle /cancel command
pub(super) async fn handle_cancel_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let Some(requester) = requester_of(msg) else {
        return Ok(());
    };
    if !deps.access.allows(requester.user_id) {
        bot.send_message(msg.chat.id, NOT_ALLOWED).await?;
        return Ok(());
    }

    // The waiting request reports the cancellation itself
    if !deps.service.replies().cancel(&requester) {
        bot.send_message(msg.chat.id, "Nothing to cancel.").await?;
    }
    Ok(())
}

/// Hands a plain message to the prompt waiting for its sender
pub(super) async fn handle_prompt_reply(msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let Some(requester) = requester_of(msg) else {
        return Ok(());
    };
    let reply = msg.text().or_else(|| msg.caption()).unwrap_or_default();
    if !deps.service.replies().resolve(&requester, reply) {
        log::debug!("Reply from {:?} arrived after its prompt closed", requester);
    }
    Ok(())
}
