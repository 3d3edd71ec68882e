//! Downloader configuration file
//!
//! Builds the JSON settings document the downloader reads and writes it to the
//! request's own config path. The file is flushed, synced and closed before
//! `write` returns, so the downloader never sees a partial file.

use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tokio::io::AsyncWriteExt;

use crate::core::config::{Credentials, PipelineConfig};
use crate::core::error::{AppError, AppResult};

/// Download quality requested from the streaming service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Standard,
    Hifi,
    Max,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormattingOptions {
    pub track_name_format: Option<String>,
    pub album_name_format: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoverOptions {
    pub embed: bool,
    pub save_external: bool,
}

/// Everything that goes into one settings file.
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    pub download_path: PathBuf,
    pub quality: Quality,
    pub credentials: Credentials,
    pub formatting: Option<FormattingOptions>,
    pub covers: Option<CoverOptions>,
}

impl DownloaderConfig {
    /// Settings for one request, downloading into `download_path`.
    pub fn for_request(pipeline: &PipelineConfig, download_path: impl Into<PathBuf>) -> Self {
        Self {
            download_path: download_path.into(),
            quality: pipeline.quality,
            credentials: pipeline.credentials.clone(),
            formatting: pipeline.formatting.clone(),
            covers: pipeline.covers,
        }
    }

    fn to_document(&self) -> SettingsDocument {
        SettingsDocument {
            global: GlobalSection {
                general: GeneralSection {
                    download_path: self.download_path.to_string_lossy().into_owned(),
                    download_quality: self.quality,
                },
                formatting: self.formatting.as_ref().map(|f| FormattingSection {
                    track_filename_format: f.track_name_format.clone(),
                    album_format: f.album_name_format.clone(),
                }),
                covers: self.covers.map(|c| CoversSection {
                    embed_cover: c.embed,
                    save_external: c.save_external,
                }),
            },
            modules: ModulesSection {
                tidal: TidalSection {
                    username: self.credentials.username.clone(),
                    password: self.credentials.password.expose_secret().to_string(),
                },
            },
        }
    }
}

/// On-disk layout of the settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsDocument {
    pub global: GlobalSection,
    pub modules: ModulesSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalSection {
    pub general: GeneralSection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatting: Option<FormattingSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub covers: Option<CoversSection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralSection {
    pub download_path: String,
    pub download_quality: Quality,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattingSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_filename_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_format: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoversSection {
    pub embed_cover: bool,
    pub save_external: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModulesSection {
    pub tidal: TidalSection,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TidalSection {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for TidalSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TidalSection")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Serializes `config` to `path`, creating parent directories as needed.
///
/// Overwrites any existing file. Returns the path that was written.
pub async fn write(path: &Path, config: &DownloaderConfig) -> AppResult<PathBuf> {
    let to_config_error = |source: std::io::Error| AppError::ConfigWrite {
        path: path.to_path_buf(),
        source,
    };

    let body = serde_json::to_vec_pretty(&config.to_document()).map_err(|e| to_config_error(e.into()))?;

    if let Some(parent) = path.parent() {
        fs_err::tokio::create_dir_all(parent).await.map_err(to_config_error)?;
    }

    let mut file = fs_err::tokio::File::create(path).await.map_err(to_config_error)?;
    file.write_all(&body).await.map_err(to_config_error)?;
    file.flush().await.map_err(to_config_error)?;
    file.sync_all().await.map_err(to_config_error)?;
    drop(file);

    log::debug!("Wrote downloader config to {}", path.display());
    Ok(path.to_path_buf())
}

/// Parses a settings file written by [`write`].
pub async fn read(path: &Path) -> AppResult<SettingsDocument> {
    let raw = fs_err::tokio::read(path).await?;
    serde_json::from_slice(&raw).map_err(|e| AppError::Io(e.into()))
}
