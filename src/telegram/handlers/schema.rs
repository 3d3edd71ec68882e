//! Dispatcher schema and handler chain builders

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use super::commands::{
    handle_cancel_command, handle_download_command, handle_help_command, handle_prompt_reply, handle_start_command,
};
use super::types::{requester_of, HandlerDeps, HandlerError};
use crate::telegram::bot::Command;

/// Creates the dispatcher schema for the bot.
///
/// Commands go first; any other message is only taken when its sender has a
/// destination prompt open. Everything else falls through to the dispatcher's
/// default handler.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_commands = deps.clone();
    let deps_replies = deps;

    dptree::entry()
        .branch(command_handler(deps_commands))
        .branch(prompt_reply_handler(deps_replies))
}

fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                log::info!("🎯 Received command: {:?} from chat {}", cmd, msg.chat.id);

                match cmd {
                    Command::Start => handle_start_command(&bot, &msg).await?,
                    Command::Help => handle_help_command(&bot, &msg).await?,
                    Command::Download(args) => handle_download_command(&bot, &msg, args, &deps).await?,
                    Command::Cancel => handle_cancel_command(&bot, &msg, &deps).await?,
                }
                Ok(())
            }
        },
    ))
}

/// Plain messages answering an open destination prompt
fn prompt_reply_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_filter = deps.clone();

    Update::filter_message()
        .filter(move |msg: Message| {
            requester_of(&msg).is_some_and(|requester| deps_filter.service.replies().is_pending(&requester))
        })
        .endpoint(move |msg: Message| {
            let deps = deps.clone();
            async move { handle_prompt_reply(&msg, &deps).await }
        })
}
