//! Telegram bot handler tree configuration
//!
//! The same schema is used by the production dispatcher and by tests.

mod commands;
mod schema;
mod types;

pub use schema::schema;
pub use types::{requester_of, AccessPolicy, HandlerDeps, HandlerError};
