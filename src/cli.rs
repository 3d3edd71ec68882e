use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tidalbot")]
#[command(author, version, about = "Telegram bot that downloads music from Tidal and syncs it to cloud storage", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the bot (default)
    Run,

    /// Download one URL and sync it from the terminal, without Telegram
    Download {
        /// Tidal track, album or playlist URL
        url: String,

        /// rclone destination; defaults to RCLONE_DESTINATION
        #[arg(short, long)]
        destination: Option<String>,
    },

    /// Validate the environment and print the effective configuration
    CheckConfig,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
