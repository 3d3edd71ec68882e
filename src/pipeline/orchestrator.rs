//! Download-and-sync sequence
//!
//! `Idle → ConfigWritten → Downloaded → Synced → Done`, with `Errored` reachable
//! from every non-terminal state. The first failure ends the request: the
//! requester gets one error notification naming the stage, nothing is retried
//! and partial downloads are left in place. A failed job that never produced a
//! file has its directory removed.

use std::path::Path;
use std::sync::Arc;

use crate::core::config::{ConfigDelivery, PipelineConfig};
use crate::core::error::{AppError, AppResult};
use crate::core::process::{ProcessError, ProcessOutput, ProcessRunner, ProcessSpec};
use crate::pipeline::notify::Notifier;
use crate::pipeline::settings::{self, DownloaderConfig};
use crate::pipeline::workspace::{holds_files, resolve_download_dir, url_last_segment, JobWorkspace};
use crate::pipeline::{DownloadRequest, JobReport, JobState, Stage};

/// Builds the downloader invocation for one request.
pub fn downloader_spec(config: &PipelineConfig, workspace: &JobWorkspace, url: &str) -> ProcessSpec {
    let spec = ProcessSpec::new(&config.downloader_bin);
    match config.config_delivery {
        ConfigDelivery::Flag => spec
            .arg("-c")
            .arg(workspace.config_path.to_string_lossy())
            .arg(url),
        ConfigDelivery::WorkingDir => spec.arg(url).current_dir(&workspace.dir),
    }
}

/// Builds the sync invocation: `sync <local> <remote> --verbose`.
///
/// With `sync_into_subdir`, the remote is `<destination>/<remote_dir>`.
pub fn sync_spec(config: &PipelineConfig, local_path: &Path, destination: &str, remote_dir: Option<&str>) -> ProcessSpec {
    ProcessSpec::new(&config.sync_bin)
        .arg("sync")
        .arg(local_path.to_string_lossy())
        .arg(sync_target(config, destination, remote_dir))
        .arg("--verbose")
}

/// Remote subdirectory for a resolved download.
///
/// A download root synced as a whole is named after the URL's last segment,
/// or the job id when the URL has none.
pub fn remote_dir_name(workspace: &JobWorkspace, local_path: &Path, url: &str) -> Option<String> {
    let file_name = |path: &Path| path.file_name().map(|n| n.to_string_lossy().into_owned());
    if local_path == workspace.download_root {
        url_last_segment(url).or_else(|| file_name(&workspace.dir))
    } else {
        file_name(local_path)
    }
}

fn sync_target(config: &PipelineConfig, destination: &str, remote_dir: Option<&str>) -> String {
    match remote_dir {
        Some(name) if config.sync_into_subdir => {
            // `remote:` and `remote:path` are both valid rclone destinations
            if destination.ends_with(':') || destination.ends_with('/') {
                format!("{}{}", destination, name)
            } else {
                format!("{}/{}", destination, name)
            }
        }
        _ => destination.to_string(),
    }
}

fn stage_error(stage: Stage, program: &str, err: ProcessError) -> AppError {
    match err {
        ProcessError::Spawn(source) => AppError::Spawn {
            stage,
            program: program.to_string(),
            source,
        },
        ProcessError::Failed { exit_code, stderr } => AppError::Process {
            stage,
            exit_code,
            stderr,
        },
        ProcessError::TimedOut(timeout) => AppError::ProcessTimeout { stage, timeout },
    }
}

/// State of one request moving through the sequence
struct Job {
    report: JobReport,
}

impl Job {
    fn new(request: &DownloadRequest) -> Self {
        Self {
            report: JobReport {
                job_id: request.job_id,
                state: JobState::Idle,
                local_path: None,
                error: None,
            },
        }
    }

    fn advance(&mut self, next: JobState) {
        log::debug!("Job {}: {:?} -> {:?}", self.report.job_id, self.report.state, next);
        self.report.state = next;
    }

    /// Stage that runs next from the current state
    fn pending_stage(&self) -> Stage {
        match self.report.state {
            JobState::Idle => Stage::ConfigWrite,
            JobState::ConfigWritten => Stage::Download,
            _ => Stage::Sync,
        }
    }
}

pub struct Orchestrator {
    config: Arc<PipelineConfig>,
    runner: Arc<dyn ProcessRunner>,
}

impl Orchestrator {
    pub fn new(config: PipelineConfig, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            config: Arc::new(config),
            runner,
        }
    }

    pub fn workspace(&self, request: &DownloadRequest) -> JobWorkspace {
        JobWorkspace::new(&self.config.jobs_root, request.job_id, self.config.config_delivery)
    }

    /// Runs the whole sequence for `request`, reporting progress to `notifier`.
    ///
    /// Never returns an error: failures end in `JobState::Errored` with the
    /// error kept on the report, after the requester has been told.
    pub async fn run(&self, request: &DownloadRequest, notifier: &dyn Notifier) -> JobReport {
        log::info!(
            "Job {} started: {} -> {}",
            request.job_id,
            request.source_url,
            request.destination
        );
        notifier
            .notify(&format!("⏳ Starting download for {}...", request.source_url))
            .await;

        let workspace = self.workspace(request);
        let mut job = Job::new(request);
        match self.execute(request, &workspace, &mut job, notifier).await {
            Ok(()) => {
                job.advance(JobState::Done);
                log::info!("Job {} done", request.job_id);
                notifier
                    .notify(&format!("✅ Upload to {} completed!", request.destination))
                    .await;
            }
            Err(err) => {
                let stage = err.stage().unwrap_or_else(|| job.pending_stage());
                log::error!(
                    "Job {} failed at {} ({}): {}",
                    request.job_id,
                    stage,
                    err.kind(),
                    err
                );
                notifier.notify(&err.user_message()).await;
                job.advance(JobState::Errored { stage });
                job.report.error = Some(err);
                discard_if_empty(request, &workspace).await;
            }
        }
        job.report
    }

    async fn execute(
        &self,
        request: &DownloadRequest,
        workspace: &JobWorkspace,
        job: &mut Job,
        notifier: &dyn Notifier,
    ) -> AppResult<()> {
        // config-write
        fs_err::tokio::create_dir_all(&workspace.download_root)
            .await
            .map_err(|source| AppError::ConfigWrite {
                path: workspace.download_root.clone(),
                source,
            })?;
        let downloader_config = DownloaderConfig::for_request(&self.config, &workspace.download_root);
        settings::write(&workspace.config_path, &downloader_config).await?;
        job.advance(JobState::ConfigWritten);

        // download
        notifier
            .notify(&format!("📥 Downloading with {}...", self.config.downloader_bin))
            .await;
        let output = self.download(request, workspace).await?;
        job.advance(JobState::Downloaded);

        // resolve
        let local_path = resolve_download_dir(&workspace.download_root, &output.stdout, &request.source_url)?;
        job.report.local_path = Some(local_path.clone());
        log::info!("Job {} downloaded into {}", request.job_id, local_path.display());

        // sync
        notifier
            .notify(&format!(
                "Download completed. Starting upload to {}...",
                request.destination
            ))
            .await;
        let remote_dir = remote_dir_name(workspace, &local_path, &request.source_url);
        let spec = sync_spec(&self.config, &local_path, &request.destination, remote_dir.as_deref());
        log::info!("Job {} running: {}", request.job_id, spec.display());
        let sync_output = self
            .runner
            .run(&spec, self.config.sync_timeout)
            .await
            .map_err(|e| stage_error(Stage::Sync, &spec.program, e))?;
        log::debug!("Job {} sync output: {}", request.job_id, sync_output.stderr.trim());
        job.advance(JobState::Synced);

        if self.config.cleanup_after_sync {
            if let Err(e) = fs_err::tokio::remove_dir_all(&workspace.dir).await {
                log::warn!("Job {}: cleanup failed: {}", request.job_id, e);
            }
        }

        Ok(())
    }

    async fn download(&self, request: &DownloadRequest, workspace: &JobWorkspace) -> AppResult<ProcessOutput> {
        let spec = downloader_spec(&self.config, workspace, &request.source_url);
        log::info!("Job {} running: {}", request.job_id, spec.display());

        let result = self.runner.run(&spec, self.config.downloader_timeout).await;

        // The settings file carries the account password; it is only needed by this process
        if let Err(e) = fs_err::tokio::remove_file(&workspace.config_path).await {
            log::warn!("Job {}: could not remove downloader config: {}", request.job_id, e);
        }

        let output = result.map_err(|e| stage_error(Stage::Download, &spec.program, e))?;
        if !output.stderr.trim().is_empty() {
            log::warn!("Job {} downloader stderr: {}", request.job_id, output.stderr.trim());
        }
        Ok(output)
    }
}

/// Removes the job directory of a failed request that left no file behind.
async fn discard_if_empty(request: &DownloadRequest, workspace: &JobWorkspace) {
    if !workspace.dir.is_dir() || holds_files(&workspace.download_root) {
        return;
    }
    match fs_err::tokio::remove_dir_all(&workspace.dir).await {
        Ok(()) => log::debug!("Job {}: removed empty job directory", request.job_id),
        Err(e) => log::warn!("Job {}: could not remove empty job directory: {}", request.job_id, e),
    }
}
