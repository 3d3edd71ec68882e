use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use dotenvy::dotenv;
use teloxide::prelude::*;
use tokio::time::sleep;

use tidalbot::cli::{Cli, Commands};
use tidalbot::core::config::{self, AppConfig, BotMode};
use tidalbot::core::logging::{configuration_summary, configuration_warnings, init_logger, log_startup_configuration};
use tidalbot::core::process::TokioProcessRunner;
use tidalbot::pipeline::notify::ConsoleNotifier;
use tidalbot::pipeline::DownloadService;
use tidalbot::telegram::{create_bot, schema, setup_bot_commands, AccessPolicy, HandlerDeps};

/// Restarts of a panicked dispatcher before giving up
const MAX_DISPATCHER_RETRIES: u32 = 5;

/// Main entry point for the Telegram bot
///
/// Parses CLI arguments and dispatches to appropriate subcommand.
///
/// # Errors
/// Returns an error if initialization fails (logging, configuration, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Log panics in handler tasks instead of losing them on stderr
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
        if let Some(msg) = panic_info.payload().downcast_ref::<&str>() {
            log::error!("Panic message: {}", msg);
        }
    }));

    // .env first so it can set LOG_FILE_PATH
    let _ = dotenv();

    init_logger(&config::log_file_path_from_env())?;

    match cli.command {
        Some(Commands::Run) => run_bot().await,
        Some(Commands::Download { url, destination }) => run_cli_download(url, destination).await,
        Some(Commands::CheckConfig) => check_config(),
        None => {
            log::info!("No command specified, running bot in default mode");
            run_bot().await
        }
    }
}

/// Reads and validates the environment; every failure here is fatal.
fn load_config() -> Result<AppConfig> {
    AppConfig::from_env().map_err(|e| {
        log::error!("❌ Invalid configuration: {}", e);
        anyhow::Error::new(e)
    })
}

async fn run_bot() -> Result<()> {
    log::info!("Starting bot...");
    let config = load_config()?;
    log_startup_configuration(&config);

    fs_err::tokio::create_dir_all(&config.pipeline.jobs_root).await?;

    let bot = create_bot(&config)?;
    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to set bot commands: {}", e);
    }

    let service = Arc::new(DownloadService::from_config(&config, Arc::new(TokioProcessRunner)));
    let handler = schema(HandlerDeps::new(service, AccessPolicy::from_config(&config)));

    log::info!("📡 Ready to receive updates!");

    let mut retry_count = 0;
    loop {
        let bot_clone = bot.clone();
        let handler_clone = handler.clone();

        // A panic inside the dispatcher ends this task only; it is restarted below
        let handle = tokio::spawn(async move {
            use teloxide::update_listeners::Polling;

            let listener = Polling::builder(bot_clone.clone()).drop_pending_updates().build();

            Dispatcher::builder(bot_clone, handler_clone)
                .dependencies(DependencyMap::new())
                .enable_ctrlc_handler()
                .build()
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await
        });

        match handle.await {
            Ok(()) => {
                log::info!("Dispatcher shutdown gracefully");
                break;
            }
            Err(join_err) if join_err.is_panic() => {
                log::error!("Dispatcher panicked: {}", join_err);
                if retry_count >= MAX_DISPATCHER_RETRIES {
                    log::error!("Max retries reached after panic. Exiting...");
                    break;
                }
                retry_count += 1;
                log::info!(
                    "Restarting dispatcher (attempt {}/{})...",
                    retry_count,
                    MAX_DISPATCHER_RETRIES
                );
                exponential_backoff(retry_count).await;
            }
            Err(join_err) => {
                log::warn!("Dispatcher task was cancelled: {}", join_err);
                break;
            }
        }
    }

    Ok(())
}

/// One request from the terminal; progress goes to stdout.
async fn run_cli_download(url: String, destination: Option<String>) -> Result<()> {
    let config = load_config()?;

    let destination = match (destination, &config.mode) {
        (Some(destination), _) => destination,
        (None, BotMode::Fixed { destination }) => destination.clone(),
        (None, BotMode::Interactive { .. }) => {
            anyhow::bail!("--destination is required when BOT_MODE=interactive")
        }
    };

    let service = DownloadService::from_config(&config, Arc::new(TokioProcessRunner));
    let report = service.run_once(&url, &destination, &ConsoleNotifier).await;

    match report.error {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

fn check_config() -> Result<()> {
    let config = load_config()?;
    for line in configuration_summary(&config) {
        println!("{}", line);
    }
    for warning in configuration_warnings(&config) {
        println!("⚠️ {}", warning);
    }
    println!("✅ Configuration is valid");
    Ok(())
}

async fn exponential_backoff(retry_count: u32) {
    let delay = Duration::from_secs(2u64.pow(retry_count));
    sleep(delay).await;
}
