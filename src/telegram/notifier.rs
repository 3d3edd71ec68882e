//! Status messages sent back to the chat that issued a request

use async_trait::async_trait;
use teloxide::prelude::*;

use crate::pipeline::Notifier;

/// Telegram rejects messages above 4096 characters
const MAX_MESSAGE_LENGTH: usize = 4000;

/// Shortens `text` to fit into one message, keeping the head and the tail.
///
/// Tool errors tend to put the useful line last, so most of the budget goes to the end.
pub fn truncate_message(text: &str) -> String {
    let count = text.chars().count();
    if count <= MAX_MESSAGE_LENGTH {
        return text.to_string();
    }

    let head_len = MAX_MESSAGE_LENGTH / 4;
    let tail_len = MAX_MESSAGE_LENGTH - head_len - 3;
    let head: String = text.chars().take(head_len).collect();
    let tail: String = text.chars().skip(count - tail_len).collect();
    format!("{}\n…\n{}", head, tail)
}

/// Sends every notification as a plain message to one chat
#[derive(Clone)]
pub struct ChatNotifier {
    bot: Bot,
    chat_id: ChatId,
}

impl ChatNotifier {
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        Self { bot, chat_id }
    }
}

#[async_trait]
impl Notifier for ChatNotifier {
    async fn notify(&self, text: &str) {
        if let Err(e) = self.bot.send_message(self.chat_id, truncate_message(text)).await {
            log::warn!("Failed to notify chat {}: {}", self.chat_id, e);
        }
    }
}
