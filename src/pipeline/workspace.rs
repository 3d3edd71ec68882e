//! Per-request file layout and downloaded-directory resolution
//!
//! Every request owns `<jobs_root>/<job_id>/`, holding its own settings file
//! and its own download root, so concurrent requests never share a file.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use uuid::Uuid;

use crate::core::config::ConfigDelivery;
use crate::core::error::{AppError, AppResult};

const DOWNLOADS_DIR: &str = "downloads";
const SETTINGS_FILE: &str = "settings.json";

/// Paths belonging to one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobWorkspace {
    pub dir: PathBuf,
    pub config_path: PathBuf,
    pub download_root: PathBuf,
}

impl JobWorkspace {
    pub fn new(jobs_root: &Path, job_id: Uuid, delivery: ConfigDelivery) -> Self {
        let dir = jobs_root.join(job_id.to_string());
        let config_path = match delivery {
            ConfigDelivery::Flag => dir.join(SETTINGS_FILE),
            // Relative lookup the downloader performs from its working directory
            ConfigDelivery::WorkingDir => dir.join("config").join(SETTINGS_FILE),
        };
        Self {
            download_root: dir.join(DOWNLOADS_DIR),
            config_path,
            dir,
        }
    }
}

/// Last non-empty path segment of the URL (`.../album/123` → `123`).
pub fn url_last_segment(url: &str) -> Option<String> {
    match url::Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.rfind(|s| !s.is_empty()).map(str::to_string)),
        // Scheme-less input such as `tidal.com/album/1`
        Err(_) => url
            .split(['?', '#'])
            .next()
            .and_then(|path| path.rsplit('/').find(|s| !s.is_empty()))
            .map(str::to_string),
    }
}

/// Finds the directory the downloader produced for this request.
///
/// Checked in order: a directory named in the downloader's stdout, a directory
/// named after the URL's last segment, then the most recently modified
/// directory under the request's download root. A root holding only loose
/// files (a single track) resolves to the root itself.
pub fn resolve_download_dir(download_root: &Path, downloader_stdout: &str, url: &str) -> AppResult<PathBuf> {
    if let Some(dir) = dir_from_stdout(download_root, downloader_stdout) {
        log::debug!("Resolved download dir from downloader output: {}", dir.display());
        return Ok(dir);
    }

    if let Some(segment) = url_last_segment(url) {
        let candidate = download_root.join(segment);
        if candidate.is_dir() {
            log::debug!("Resolved download dir from URL: {}", candidate.display());
            return Ok(candidate);
        }
    }

    if let Some(dir) = newest_subdir(download_root) {
        log::debug!("Resolved download dir by modification time: {}", dir.display());
        return Ok(dir);
    }

    if holds_files(download_root) {
        log::debug!("Resolved download dir to the root: {}", download_root.display());
        return Ok(download_root.to_path_buf());
    }

    Err(AppError::DirectoryNotFound {
        root: download_root.to_path_buf(),
    })
}

/// Whether any regular file exists under `dir`, at any depth.
pub fn holds_files(dir: &Path) -> bool {
    let Ok(entries) = fs_err::read_dir(dir) else {
        return false;
    };
    entries.filter_map(Result::ok).any(|entry| match entry.file_type() {
        Ok(kind) if kind.is_dir() => holds_files(&entry.path()),
        Ok(_) => true,
        Err(_) => false,
    })
}

/// Last stdout mention of `<download_root>/<name>` that exists as a directory.
fn dir_from_stdout(download_root: &Path, stdout: &str) -> Option<PathBuf> {
    let root = download_root.to_string_lossy();
    let root = root.trim_end_matches('/');
    if root.is_empty() {
        return None;
    }

    stdout
        .lines()
        .filter_map(|line| {
            let start = line.find(root)?;
            let rest = line[start + root.len()..].strip_prefix('/')?;
            let name = rest
                .split('/')
                .next()?
                .trim_end_matches(['"', '\'', ',', '.', ')', ']'])
                .trim();
            (!name.is_empty()).then(|| download_root.join(name))
        })
        .filter(|candidate| candidate.is_dir())
        .last()
}

fn newest_subdir(root: &Path) -> Option<PathBuf> {
    let entries = match fs_err::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Cannot list {}: {}", root.display(), e);
            return None;
        }
    };

    entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let metadata = entry.metadata().ok()?;
            metadata.is_dir().then(|| {
                let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                (modified, entry.path())
            })
        })
        .max_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)))
        .map(|(_, path)| path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_layout_is_unique_per_job() {
        let root = Path::new("/srv/jobs");
        let a = JobWorkspace::new(root, Uuid::new_v4(), ConfigDelivery::Flag);
        let b = JobWorkspace::new(root, Uuid::new_v4(), ConfigDelivery::Flag);

        assert_ne!(a.config_path, b.config_path);
        assert_ne!(a.download_root, b.download_root);
        assert!(a.config_path.starts_with(&a.dir));
        assert!(a.download_root.starts_with(&a.dir));
    }

    #[test]
    fn test_working_dir_delivery_uses_relative_config_location() {
        let id = Uuid::new_v4();
        let ws = JobWorkspace::new(Path::new("/srv/jobs"), id, ConfigDelivery::WorkingDir);
        assert_eq!(ws.config_path, ws.dir.join("config").join("settings.json"));
    }

    #[test]
    fn test_url_last_segment() {
        assert_eq!(url_last_segment("https://example.com/album/123").as_deref(), Some("123"));
        assert_eq!(url_last_segment("https://tidal.com/browse/album/42/").as_deref(), Some("42"));
        assert_eq!(url_last_segment("https://tidal.com/track/7?u=1").as_deref(), Some("7"));
        assert_eq!(url_last_segment("tidal.com/album/9").as_deref(), Some("9"));
        assert_eq!(url_last_segment("https://example.com/"), None);
    }

    #[test]
    fn test_prefers_directory_reported_on_stdout() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("Artist - Album")).unwrap();
        std::fs::create_dir_all(root.join("123")).unwrap();

        let stdout = format!(
            "=== Downloading album ===\nSaving to \"{}/Artist - Album/01 Song.flac\"\nDone\n",
            root.display()
        );
        let dir = resolve_download_dir(root, &stdout, "https://example.com/album/123").unwrap();
        assert_eq!(dir, root.join("Artist - Album"));
    }

    #[test]
    fn test_falls_back_to_url_segment() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("123")).unwrap();
        std::fs::create_dir_all(tmp.path().join("other")).unwrap();

        let dir = resolve_download_dir(tmp.path(), "no paths here", "https://example.com/album/123").unwrap();
        assert_eq!(dir, tmp.path().join("123"));
    }

    #[test]
    fn test_falls_back_to_newest_directory() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("2019 Album")).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        std::fs::create_dir_all(tmp.path().join("Resolved Album Title")).unwrap();
        std::fs::write(tmp.path().join("stray.txt"), "file, not dir").unwrap();

        let dir = resolve_download_dir(tmp.path(), "", "https://example.com/album/123").unwrap();
        assert_eq!(dir, tmp.path().join("Resolved Album Title"));
    }

    #[test]
    fn test_missing_directory_is_its_own_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = resolve_download_dir(&tmp.path().join("never-created"), "", "https://x/1").unwrap_err();
        assert!(matches!(err, AppError::DirectoryNotFound { .. }));

        let err = resolve_download_dir(tmp.path(), "", "https://x/1").unwrap_err();
        assert!(matches!(err, AppError::DirectoryNotFound { .. }));
    }

    #[test]
    fn test_single_track_resolves_to_root() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("Artist - Song.flac"), b"fLaC").unwrap();

        let dir = resolve_download_dir(tmp.path(), "", "https://tidal.com/browse/track/77").unwrap();
        assert_eq!(dir, tmp.path());
    }

    #[test]
    fn test_holds_files_looks_into_subdirectories() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("Album/CD 1")).unwrap();
        assert!(!holds_files(tmp.path()));
        assert!(!holds_files(&tmp.path().join("missing")));

        std::fs::write(tmp.path().join("Album/CD 1/01.flac"), b"fLaC").unwrap();
        assert!(holds_files(tmp.path()));
    }
}
