//! Scripted process runner
//!
//! Records every invocation together with the settings file the tool would
//! have read, at start and at exit, and answers with a per-program script.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use tidalbot::core::process::{ProcessError, ProcessOutput, ProcessRunner, ProcessSpec};
use tidalbot::pipeline::settings::SettingsDocument;

type Script = Arc<dyn Fn(&ProcessSpec, Option<&SettingsDocument>) -> Result<ProcessOutput, ProcessError> + Send + Sync>;

/// One recorded call
#[derive(Debug, Clone)]
pub struct Invocation {
    pub spec: ProcessSpec,
    pub timeout: Duration,
    /// Settings file contents when the tool started
    pub settings_at_start: Option<String>,
    /// Settings file contents when the tool finished
    pub settings_at_exit: Option<String>,
}

impl Invocation {
    pub fn settings(&self) -> Option<SettingsDocument> {
        self.settings_at_start
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
    }
}

#[derive(Default)]
pub struct ScriptedRunner {
    scripts: HashMap<String, Script>,
    invocations: Mutex<Vec<Invocation>>,
    run_time: Duration,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer calls to `program` with `script`. Unscripted programs succeed silently.
    pub fn on<F>(mut self, program: &str, script: F) -> Self
    where
        F: Fn(&ProcessSpec, Option<&SettingsDocument>) -> Result<ProcessOutput, ProcessError> + Send + Sync + 'static,
    {
        self.scripts.insert(program.to_string(), Arc::new(script));
        self
    }

    /// Simulated duration of every call
    pub fn with_run_time(mut self, run_time: Duration) -> Self {
        self.run_time = run_time;
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn programs(&self) -> Vec<String> {
        self.invocations().into_iter().map(|i| i.spec.program).collect()
    }
}

/// Where the tool would look for its settings file
fn settings_path(spec: &ProcessSpec) -> Option<PathBuf> {
    match spec.args.iter().position(|a| a == "-c") {
        Some(pos) => spec.args.get(pos + 1).map(PathBuf::from),
        None => spec
            .current_dir
            .as_ref()
            .map(|dir| dir.join("config").join("settings.json")),
    }
}

fn read_settings(path: Option<&Path>) -> Option<String> {
    path.and_then(|p| std::fs::read_to_string(p).ok())
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn run(&self, spec: &ProcessSpec, timeout: Duration) -> Result<ProcessOutput, ProcessError> {
        let path = settings_path(spec);
        let settings_at_start = read_settings(path.as_deref());

        if !self.run_time.is_zero() {
            tokio::time::sleep(self.run_time).await;
        }
        let settings_at_exit = read_settings(path.as_deref());

        let invocation = Invocation {
            spec: spec.clone(),
            timeout,
            settings_at_start,
            settings_at_exit,
        };
        let settings = invocation.settings();
        self.invocations.lock().unwrap().push(invocation);

        match self.scripts.get(&spec.program) {
            Some(script) => script(spec, settings.as_ref()),
            None => Ok(ProcessOutput::default()),
        }
    }
}

/// Downloader that creates `<download_path>/<dir_name>/01 - Track.flac`
pub fn downloader_creating(
    dir_name: &str,
) -> impl Fn(&ProcessSpec, Option<&SettingsDocument>) -> Result<ProcessOutput, ProcessError> + Send + Sync + 'static {
    let dir_name = dir_name.to_string();
    move |_spec: &ProcessSpec, settings: Option<&SettingsDocument>| {
        let settings = settings.ok_or_else(|| ProcessError::Failed {
            exit_code: Some(2),
            stderr: "settings.json not found".to_string(),
        })?;
        let album = Path::new(&settings.global.general.download_path).join(&dir_name);
        std::fs::create_dir_all(&album).map_err(ProcessError::Spawn)?;
        std::fs::write(album.join("01 - Track.flac"), b"fLaC").map_err(ProcessError::Spawn)?;
        Ok(ProcessOutput {
            exit_code: 0,
            stdout: format!("=== Downloading album {} ===\n", dir_name),
            stderr: String::new(),
        })
    }
}

/// Downloader that writes a single `<download_path>/<file_name>`, as a track download does
pub fn downloader_writing_track(
    file_name: &str,
) -> impl Fn(&ProcessSpec, Option<&SettingsDocument>) -> Result<ProcessOutput, ProcessError> + Send + Sync + 'static {
    let file_name = file_name.to_string();
    move |_spec: &ProcessSpec, settings: Option<&SettingsDocument>| {
        let settings = settings.ok_or_else(|| ProcessError::Failed {
            exit_code: Some(2),
            stderr: "settings.json not found".to_string(),
        })?;
        let root = Path::new(&settings.global.general.download_path);
        std::fs::create_dir_all(root).map_err(ProcessError::Spawn)?;
        std::fs::write(root.join(&file_name), b"fLaC").map_err(ProcessError::Spawn)?;
        Ok(ProcessOutput {
            exit_code: 0,
            stdout: "=== Downloading track ===\n".to_string(),
            stderr: String::new(),
        })
    }
}

/// Tool that exits with `exit_code`, printing `stderr`
pub fn failing(
    exit_code: i32,
    stderr: &str,
) -> impl Fn(&ProcessSpec, Option<&SettingsDocument>) -> Result<ProcessOutput, ProcessError> + Send + Sync + 'static {
    let stderr = stderr.to_string();
    move |_spec: &ProcessSpec, _settings: Option<&SettingsDocument>| {
        Err(ProcessError::Failed {
            exit_code: Some(exit_code),
            stderr: stderr.clone(),
        })
    }
}
