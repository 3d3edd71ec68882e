//! Telegram bot integration and handlers

pub mod bot;
pub mod handlers;
pub mod notifier;

pub use bot::{create_bot, setup_bot_commands, Command};
pub use handlers::{schema, AccessPolicy, HandlerDeps, HandlerError};
pub use notifier::ChatNotifier;
