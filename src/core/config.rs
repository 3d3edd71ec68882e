//! Startup configuration
//!
//! Everything the bot needs is read once from the environment into an
//! [`AppConfig`], validated, and then passed by value into the pipeline and the
//! handlers. Missing required values are fatal (`AppError::StartupConfigMissing`).

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use strum::{Display, EnumString};
use teloxide::types::UserId;
use url::Url;

use crate::core::error::{AppError, AppResult};
use crate::pipeline::settings::{CoverOptions, FormattingOptions, Quality};

/// Default values for optional settings
pub mod defaults {
    /// Seconds to wait for the destination reply in interactive mode
    pub const PROMPT_TIMEOUT_SECS: u64 = 60;

    /// Seconds the downloader may run before it is killed
    pub const DOWNLOADER_TIMEOUT_SECS: u64 = 3600;

    /// Seconds the sync tool may run before it is killed
    pub const SYNC_TIMEOUT_SECS: u64 = 3600;

    pub const DOWNLOADER_BIN: &str = "orpheusdl";
    pub const SYNC_BIN: &str = "rclone";
    pub const JOBS_ROOT: &str = "./jobs";
    pub const LOG_FILE_PATH: &str = "tidalbot.log";

    /// Request timeout for the Telegram HTTP client (in seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 60;
}

/// Where the sync destination of a request comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotMode {
    /// Variant 1: anyone may `/download`, everything goes to one remote
    Fixed { destination: String },
    /// Variant 2: only `admin` may `/download`, destination is asked for each time
    Interactive { admin: UserId, prompt_timeout: Duration },
}

/// How the downloader finds its configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum ConfigDelivery {
    /// `downloader -c <config> <url>`
    Flag,
    /// `downloader <url>` run inside the job directory, config at `config/settings.json`
    WorkingDir,
}

/// Account used by the downloader
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

/// Settings consumed by the download/sync pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub downloader_bin: String,
    pub sync_bin: String,
    /// Per-request directories are created below this (absolute) path
    pub jobs_root: PathBuf,
    pub credentials: Credentials,
    pub quality: Quality,
    pub config_delivery: ConfigDelivery,
    pub formatting: Option<FormattingOptions>,
    pub covers: Option<CoverOptions>,
    pub downloader_timeout: Duration,
    pub sync_timeout: Duration,
    /// Sync into `<destination>/<downloaded dir name>`. When off, every sync
    /// mirrors one download onto `<destination>` and deletes what was there.
    pub sync_into_subdir: bool,
    /// Remove the job directory after a successful sync
    pub cleanup_after_sync: bool,
}

impl PipelineConfig {
    /// Config with defaults for everything but the account, rooted at `jobs_root`.
    pub fn new(jobs_root: impl Into<PathBuf>, credentials: Credentials) -> Self {
        Self {
            downloader_bin: defaults::DOWNLOADER_BIN.to_string(),
            sync_bin: defaults::SYNC_BIN.to_string(),
            jobs_root: jobs_root.into(),
            credentials,
            quality: Quality::Hifi,
            config_delivery: ConfigDelivery::Flag,
            formatting: None,
            covers: None,
            downloader_timeout: Duration::from_secs(defaults::DOWNLOADER_TIMEOUT_SECS),
            sync_timeout: Duration::from_secs(defaults::SYNC_TIMEOUT_SECS),
            sync_into_subdir: true,
            cleanup_after_sync: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bot_token: SecretString,
    /// Custom Bot API server (BOT_API_URL)
    pub bot_api_url: Option<Url>,
    pub mode: BotMode,
    pub pipeline: PipelineConfig,
    pub log_file_path: String,
}

impl AppConfig {
    /// Reads the process environment.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let bot_token = env
            .optional("BOT_TOKEN")
            .or_else(|| env.optional("TELOXIDE_TOKEN"))
            .ok_or(AppError::StartupConfigMissing("BOT_TOKEN"))?;

        let credentials = Credentials {
            username: env.required("TIDAL_USERNAME")?,
            password: SecretString::from(env.required("TIDAL_PASSWORD")?),
        };

        let mode = match env.optional("BOT_MODE").as_deref() {
            None | Some("fixed") => BotMode::Fixed {
                destination: env.required("RCLONE_DESTINATION")?,
            },
            Some("interactive") => BotMode::Interactive {
                admin: UserId(env.parsed("ADMIN_USER_ID")?.ok_or(AppError::StartupConfigMissing("ADMIN_USER_ID"))?),
                prompt_timeout: env.seconds("PROMPT_TIMEOUT_SECS", defaults::PROMPT_TIMEOUT_SECS)?,
            },
            Some(other) => {
                return Err(AppError::InvalidConfig {
                    var: "BOT_MODE",
                    reason: format!("expected `fixed` or `interactive`, got `{}`", other),
                });
            }
        };

        let bot_api_url = env
            .optional("BOT_API_URL")
            .map(|raw| {
                Url::parse(&raw).map_err(|e| AppError::InvalidConfig {
                    var: "BOT_API_URL",
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        let jobs_root = absolute_path(
            "JOBS_ROOT",
            &env.optional("JOBS_ROOT").unwrap_or_else(|| defaults::JOBS_ROOT.to_string()),
        )?;

        let formatting = match (env.optional("TRACK_NAME_FORMAT"), env.optional("ALBUM_NAME_FORMAT")) {
            (None, None) => None,
            (track_name_format, album_name_format) => Some(FormattingOptions {
                track_name_format,
                album_name_format,
            }),
        };

        let covers = match (env.flag("EMBED_COVER")?, env.flag("SAVE_EXTERNAL_COVER")?) {
            (None, None) => None,
            (embed, save_external) => Some(CoverOptions {
                embed: embed.unwrap_or(true),
                save_external: save_external.unwrap_or(false),
            }),
        };

        let pipeline = PipelineConfig {
            downloader_bin: env
                .optional("DOWNLOADER_BIN")
                .unwrap_or_else(|| defaults::DOWNLOADER_BIN.to_string()),
            sync_bin: env.optional("SYNC_BIN").unwrap_or_else(|| defaults::SYNC_BIN.to_string()),
            jobs_root,
            credentials,
            quality: env.parsed("DOWNLOAD_QUALITY")?.unwrap_or(Quality::Hifi),
            config_delivery: env.parsed("CONFIG_DELIVERY")?.unwrap_or(ConfigDelivery::Flag),
            formatting,
            covers,
            downloader_timeout: env.seconds("DOWNLOADER_TIMEOUT_SECS", defaults::DOWNLOADER_TIMEOUT_SECS)?,
            sync_timeout: env.seconds("SYNC_TIMEOUT_SECS", defaults::SYNC_TIMEOUT_SECS)?,
            sync_into_subdir: env.flag("SYNC_INTO_SUBDIR")?.unwrap_or(true),
            cleanup_after_sync: env.flag("CLEANUP_AFTER_SYNC")?.unwrap_or(false),
        };

        Ok(Self {
            bot_token: SecretString::from(bot_token),
            bot_api_url,
            mode,
            pipeline,
            log_file_path: env
                .optional("LOG_FILE_PATH")
                .unwrap_or_else(|| defaults::LOG_FILE_PATH.to_string()),
        })
    }

    /// Admin user in interactive mode
    pub fn admin(&self) -> Option<UserId> {
        match self.mode {
            BotMode::Interactive { admin, .. } => Some(admin),
            BotMode::Fixed { .. } => None,
        }
    }
}

/// Log file path, readable before the full config is validated so that
/// startup errors end up in the log too.
pub fn log_file_path_from_env() -> String {
    std::env::var("LOG_FILE_PATH")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| defaults::LOG_FILE_PATH.to_string())
}

/// Telegram HTTP client timeout
pub fn request_timeout() -> Duration {
    Duration::from_secs(defaults::REQUEST_TIMEOUT_SECS)
}

fn absolute_path(var: &'static str, raw: &str) -> AppResult<PathBuf> {
    let expanded = shellexpand::tilde(raw);
    std::path::absolute(Path::new(expanded.as_ref())).map_err(|e| AppError::InvalidConfig {
        var,
        reason: e.to_string(),
    })
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }

    fn required(&self, key: &'static str) -> AppResult<String> {
        self.optional(key).ok_or(AppError::StartupConfigMissing(key))
    }

    fn parsed<T>(&self, key: &'static str) -> AppResult<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key)
            .map(|raw| {
                raw.parse::<T>().map_err(|e| AppError::InvalidConfig {
                    var: key,
                    reason: format!("`{}`: {}", raw, e),
                })
            })
            .transpose()
    }

    fn seconds(&self, key: &'static str, default: u64) -> AppResult<Duration> {
        let secs = self.parsed::<u64>(key)?.unwrap_or(default);
        if secs == 0 {
            return Err(AppError::InvalidConfig {
                var: key,
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(Duration::from_secs(secs))
    }

    fn flag(&self, key: &'static str) -> AppResult<Option<bool>> {
        match self.optional(key).map(|v| v.to_ascii_lowercase()).as_deref() {
            None => Ok(None),
            Some("1" | "true" | "yes" | "on") => Ok(Some(true)),
            Some("0" | "false" | "no" | "off") => Ok(Some(false)),
            Some(other) => Err(AppError::InvalidConfig {
                var: key,
                reason: format!("`{}` is not a boolean", other),
            }),
        }
    }
}
