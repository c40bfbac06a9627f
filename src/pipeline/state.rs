use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::Serialize;
use crate::config::{self, HarnessFileConfig};
use crate::errors::HarnessError;
use crate::models::{RunMode, ScriptOutcome};

/// Everything the batch driver needs, resolved from defaults, the config file,
/// and command-line overrides.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub base_dir: PathBuf,
    pub poc_dir: PathBuf,
    pub archive_dir: PathBuf,
    pub unique_dir: PathBuf,
    pub script_extension: String,
    pub exploratory_attempts: u32,
    pub verification_attempts: u32,
    pub backoff: Backoff,
    pub execution: ExecutionSettings,
    pub side_channel: Option<SideChannelSettings>,
    pub dedup: DedupSettings,
    pub alert_on_fault: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Before the first attempt of a batch run.
    pub warmup: Duration,
    /// After a `TIMEOUT` attempt.
    pub timeout: Duration,
    /// After a benign `200` attempt.
    pub benign: Duration,
}

impl Backoff {
    pub fn none() -> Self {
        Self { warmup: Duration::ZERO, timeout: Duration::ZERO, benign: Duration::ZERO }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            warmup: Duration::from_millis(config::DEFAULT_WARMUP_MS),
            timeout: Duration::from_millis(config::DEFAULT_TIMEOUT_BACKOFF_MS),
            benign: Duration::from_millis(config::DEFAULT_BENIGN_BACKOFF_MS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionSettings {
    pub interpreter: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            interpreter: config::DEFAULT_INTERPRETER.to_string(),
            args: Vec::new(),
            timeout: Duration::from_secs(config::DEFAULT_EXEC_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SideChannelSettings {
    pub url: String,
    pub marker: String,
    pub trigger: String,
    pub cleanup_find: String,
    pub cleanup_replace: String,
    pub probe_timeout: Duration,
}

impl SideChannelSettings {
    /// Build settings for `url`, deriving the trigger token from the last path segment.
    pub fn new(url: &str, marker: &str) -> Result<Self, HarnessError> {
        Self::with_trigger(url, marker, None)
    }

    fn with_trigger(url: &str, marker: &str, trigger: Option<&str>) -> Result<Self, HarnessError> {
        let trigger = match trigger {
            Some(t) => {
                reqwest::Url::parse(url)
                    .map_err(|e| HarnessError::Config(format!("Invalid side-channel URL '{}': {}", url, e)))?;
                t.to_string()
            }
            None => trigger_from_url(url)?,
        };
        Ok(Self {
            url: url.to_string(),
            marker: marker.to_string(),
            trigger,
            cleanup_find: config::DEFAULT_CLEANUP_FIND.to_string(),
            cleanup_replace: config::DEFAULT_CLEANUP_REPLACE.to_string(),
            probe_timeout: Duration::from_secs(config::DEFAULT_PROBE_TIMEOUT_SECS),
        })
    }

    fn from_file(file: &config::SideChannelConfig) -> Result<Self, HarnessError> {
        let mut settings = Self::with_trigger(&file.url, &file.marker, file.trigger.as_deref())?;
        if let Some(find) = &file.cleanup_find {
            settings.cleanup_find = find.clone();
        }
        if let Some(replace) = &file.cleanup_replace {
            settings.cleanup_replace = replace.clone();
        }
        if let Some(secs) = file.probe_timeout_secs {
            settings.probe_timeout = Duration::from_secs(secs);
        }
        Ok(settings)
    }

    /// Whether a script's source text writes to the side-channel resource.
    pub fn is_referenced_by(&self, source: &str) -> bool {
        source.contains(&self.trigger)
    }

    /// The disposable variant that removes the side-channel artifact instead of writing it.
    pub fn cleanup_variant(&self, source: &str) -> String {
        source.replace(&self.cleanup_find, &self.cleanup_replace)
    }
}

fn trigger_from_url(url: &str) -> Result<String, HarnessError> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| HarnessError::Config(format!("Invalid side-channel URL '{}': {}", url, e)))?;
    parsed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(|s| s.to_string())
        .ok_or_else(|| HarnessError::Config(format!(
            "Side-channel URL '{}' has no resource path; set side_channel.trigger", url
        )))
}

#[derive(Debug, Clone)]
pub struct DedupSettings {
    pub filler_chars: Vec<char>,
    pub min_filler_run: usize,
}

impl Default for DedupSettings {
    fn default() -> Self {
        Self {
            filler_chars: config::DEFAULT_FILLER_CHARS.to_vec(),
            min_filler_run: config::DEFAULT_MIN_FILLER_RUN,
        }
    }
}

impl HarnessConfig {
    /// Defaults for a product directory laid out as `<base>/POC`, `<base>/POC/success`.
    pub fn for_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let poc_dir = base_dir.join("POC");
        let archive_dir = poc_dir.join("success");
        let unique_dir = archive_dir.join("unique");
        Self {
            base_dir,
            poc_dir,
            archive_dir,
            unique_dir,
            script_extension: config::DEFAULT_SCRIPT_EXTENSION.to_string(),
            exploratory_attempts: config::DEFAULT_EXPLORATORY_ATTEMPTS,
            verification_attempts: config::DEFAULT_VERIFICATION_ATTEMPTS,
            backoff: Backoff::default(),
            execution: ExecutionSettings::default(),
            side_channel: None,
            dedup: DedupSettings::default(),
            alert_on_fault: true,
        }
    }

    /// Apply a parsed config file on top of the defaults. Relative directories in
    /// the file are resolved against `base_dir`.
    pub fn from_file(file: &HarnessFileConfig, base_override: Option<&Path>) -> Result<Self, HarnessError> {
        let target = file.target.clone().unwrap_or_default();
        let base_dir = base_override
            .map(Path::to_path_buf)
            .or_else(|| target.base_dir.as_ref().map(PathBuf::from))
            .ok_or_else(|| HarnessError::Config(
                "No target base directory: pass --base-dir or set target.base_dir".into()
            ))?;

        let mut config = Self::for_base_dir(base_dir);

        if let Some(dir) = &target.poc_dir {
            config.poc_dir = config.base_dir.join(dir);
            config.archive_dir = config.poc_dir.join("success");
            config.unique_dir = config.archive_dir.join("unique");
        }
        if let Some(dir) = &target.archive_dir {
            config.archive_dir = config.base_dir.join(dir);
            config.unique_dir = config.archive_dir.join("unique");
        }
        if let Some(dir) = &target.unique_dir {
            config.unique_dir = config.base_dir.join(dir);
        }
        if let Some(ext) = &target.script_extension {
            config.script_extension = ext.trim_start_matches('.').to_string();
        }

        if let Some(exec) = &file.execution {
            if let Some(interpreter) = &exec.interpreter {
                config.execution.interpreter = interpreter.clone();
            }
            if let Some(args) = &exec.args {
                config.execution.args = args.clone();
            }
            if let Some(secs) = exec.timeout_secs {
                config.execution.timeout = Duration::from_secs(secs);
            }
        }

        if let Some(budgets) = &file.budgets {
            config.exploratory_attempts = budgets.exploratory.unwrap_or(config.exploratory_attempts);
            config.verification_attempts = budgets.verification.unwrap_or(config.verification_attempts);
        }

        if let Some(backoff) = &file.backoff {
            if let Some(ms) = backoff.warmup_ms {
                config.backoff.warmup = Duration::from_millis(ms);
            }
            if let Some(ms) = backoff.timeout_ms {
                config.backoff.timeout = Duration::from_millis(ms);
            }
            if let Some(ms) = backoff.benign_ms {
                config.backoff.benign = Duration::from_millis(ms);
            }
        }

        if let Some(sc) = &file.side_channel {
            config.side_channel = Some(SideChannelSettings::from_file(sc)?);
        }

        if let Some(dedup) = &file.dedup {
            if let Some(chars) = &dedup.filler_chars {
                config.dedup.filler_chars = chars.clone();
            }
            if let Some(run) = dedup.min_filler_run {
                config.dedup.min_filler_run = run;
            }
        }

        if let Some(alert) = file.alert_on_fault {
            config.alert_on_fault = alert;
        }

        Ok(config)
    }

    /// Directory the batch for `mode` is enumerated from.
    pub fn batch_dir(&self, mode: RunMode) -> &Path {
        match mode {
            RunMode::Exploratory => &self.poc_dir,
            RunMode::Verification => &self.archive_dir,
        }
    }

    /// Cursor file for `mode`. One per (mode, product) pair.
    pub fn progress_path(&self, mode: RunMode) -> PathBuf {
        match mode {
            RunMode::Exploratory => self.base_dir.join("progress.txt"),
            RunMode::Verification => self.archive_dir.join("progress.txt"),
        }
    }

    pub fn max_attempts(&self, mode: RunMode) -> u32 {
        match mode {
            RunMode::Exploratory => self.exploratory_attempts,
            RunMode::Verification => self.verification_attempts,
        }
    }

    pub fn audit_dir(&self) -> PathBuf {
        self.base_dir.join("audit")
    }
}

/// What one batch run did. Written into the run summary.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub mode: RunMode,
    pub total: usize,
    pub start_index: usize,
    pub next_index: usize,
    pub crashed: usize,
    pub side_channel: usize,
    pub exhausted: usize,
    pub unreadable: usize,
    pub archived: Vec<String>,
    pub aborted_at: Option<String>,
}

impl BatchReport {
    pub fn new(mode: RunMode, total: usize, start_index: usize) -> Self {
        Self {
            mode,
            total,
            start_index,
            next_index: start_index,
            crashed: 0,
            side_channel: 0,
            exhausted: 0,
            unreadable: 0,
            archived: Vec::new(),
            aborted_at: None,
        }
    }

    pub fn attempted(&self) -> usize {
        self.next_index - self.start_index
    }

    pub fn findings(&self) -> usize {
        self.crashed + self.side_channel
    }

    pub fn record(&mut self, index: usize, script: &str, outcome: &ScriptOutcome, archived: bool) {
        self.next_index = index + 1;
        match outcome {
            ScriptOutcome::Crashed { .. } => self.crashed += 1,
            ScriptOutcome::SideChannelConfirmed { .. } => self.side_channel += 1,
            ScriptOutcome::Exhausted { .. } => self.exhausted += 1,
            ScriptOutcome::Unreadable { .. } => self.unreadable += 1,
            ScriptOutcome::Faulted { .. } => self.aborted_at = Some(script.to_string()),
        }
        if archived {
            self.archived.push(script.to_string());
        }
    }
}
