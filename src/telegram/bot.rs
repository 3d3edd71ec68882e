//! Bot initialization and command definitions

use reqwest::ClientBuilder;
use secrecy::ExposeSecret;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::core::config::{self, AppConfig};

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "greets you")]
    Start,
    #[command(description = "shows this help")]
    Help,
    #[command(description = "downloads a Tidal track or album and uploads it, e.g. /download <URL>")]
    Download(String),
    #[command(description = "cancels a pending destination prompt")]
    Cancel,
}

/// Creates a Bot instance with custom or default API URL
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(anyhow::Error)` - Failed to build the HTTP client
pub fn create_bot(config: &AppConfig) -> anyhow::Result<Bot> {
    let client = ClientBuilder::new().timeout(config::request_timeout()).build()?;
    let bot = Bot::with_client(config.bot_token.expose_secret(), client);

    Ok(match &config.bot_api_url {
        Some(url) => {
            log::info!("Using custom Bot API URL: {}", url);
            bot.set_api_url(url.clone())
        }
        None => bot,
    })
}

/// Sets up bot commands in Telegram UI
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(Command::bot_commands()).await?;
    Ok(())
}
