//! Logging initialization and startup diagnostics
//!
//! This module provides:
//! - Logger initialization (console + file)
//! - A configuration summary with secrets left out

use anyhow::Result;
use simplelog::*;

use crate::core::config::{AppConfig, BotMode};

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - Failed to create the file or a logger is already set
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file =
        fs_err::File::create(log_file_path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;

    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Info,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::Info, Config::default(), log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Lines of the startup summary. Credentials only show whether they are set.
pub fn configuration_summary(config: &AppConfig) -> Vec<String> {
    let pipeline = &config.pipeline;
    let mut lines = Vec::new();

    match &config.mode {
        BotMode::Fixed { destination } => {
            lines.push("Mode: fixed".to_string());
            lines.push(format!("Destination: {}", destination));
        }
        BotMode::Interactive { admin, prompt_timeout } => {
            lines.push("Mode: interactive".to_string());
            lines.push(format!("Admin user: {}", admin));
            lines.push(format!("Prompt timeout: {}s", prompt_timeout.as_secs()));
        }
    }

    lines.push(format!("Tidal user: {}", pipeline.credentials.username));
    lines.push("Tidal password: ***".to_string());
    lines.push(format!(
        "Downloader: {} (config via {}, timeout {}s)",
        pipeline.downloader_bin,
        pipeline.config_delivery,
        pipeline.downloader_timeout.as_secs()
    ));
    lines.push(format!(
        "Sync: {} (timeout {}s{})",
        pipeline.sync_bin,
        pipeline.sync_timeout.as_secs(),
        if pipeline.sync_into_subdir { ", into subdirectory" } else { "" }
    ));
    lines.push(format!("Quality: {}", pipeline.quality));
    lines.push(format!("Jobs root: {}", pipeline.jobs_root.display()));
    lines.push(format!("Cleanup after sync: {}", pipeline.cleanup_after_sync));
    if let Some(url) = &config.bot_api_url {
        lines.push(format!("Bot API URL: {}", url));
    }
    lines.push(format!("Log file: {}", config.log_file_path));
    lines
}

/// Startup warnings about settings that let disk use or remote data drift.
pub fn configuration_warnings(config: &AppConfig) -> Vec<String> {
    let pipeline = &config.pipeline;
    let mut warnings = Vec::new();
    if !pipeline.cleanup_after_sync {
        warnings.push(format!(
            "CLEANUP_AFTER_SYNC is off: synced downloads stay under {}",
            pipeline.jobs_root.display()
        ));
    }
    if !pipeline.sync_into_subdir {
        warnings.push("SYNC_INTO_SUBDIR is off: each sync replaces the destination's contents".to_string());
    }
    warnings
}

/// Logs the effective configuration at application startup
pub fn log_startup_configuration(config: &AppConfig) {
    log::info!("{}", RULE);
    log::info!("⚙️ Configuration");
    log::info!("{}", RULE);
    for line in configuration_summary(config) {
        log::info!("{}", line);
    }
    for warning in configuration_warnings(config) {
        log::warn!("⚠️ {}", warning);
    }
    log::info!("{}", RULE);
}
