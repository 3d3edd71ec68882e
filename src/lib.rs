//! tidalbot - Telegram bot that downloads music from Tidal and syncs it to cloud storage
//!
//! A `/download <url>` command writes a per-request downloader settings file,
//! runs the downloader, finds the directory it produced and syncs that
//! directory to an rclone destination, reporting each step back to the chat.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging and the external process runner
//! - `pipeline`: the download-and-sync sequence and the destination prompt
//! - `telegram`: bot setup and the dispatcher handler tree
//! - `cli`: command-line interface

pub mod cli;
pub mod core;
pub mod pipeline;
pub mod telegram;

// Re-export commonly used types for convenience
pub use crate::core::{config, AppError, AppResult};
pub use pipeline::{DownloadRequest, DownloadService, JobReport, JobState, Stage};
