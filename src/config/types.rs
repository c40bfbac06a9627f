use serde::{Deserialize, Serialize};

pub const DEFAULT_SCRIPT_EXTENSION: &str = "py";
pub const DEFAULT_INTERPRETER: &str = "python3";
pub const DEFAULT_EXEC_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_EXPLORATORY_ATTEMPTS: u32 = 7;
pub const DEFAULT_VERIFICATION_ATTEMPTS: u32 = 5000;
pub const DEFAULT_WARMUP_MS: u64 = 5000;
pub const DEFAULT_TIMEOUT_BACKOFF_MS: u64 = 5000;
pub const DEFAULT_BENIGN_BACKOFF_MS: u64 = 3000;
pub const DEFAULT_CLEANUP_FIND: &str = ";echo hacker >";
pub const DEFAULT_CLEANUP_REPLACE: &str = ";rm";
pub const DEFAULT_SIDE_CHANNEL_MARKER: &str = "hacker";
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_FILLER_CHARS: &[char] = &['A', 'a'];
pub const DEFAULT_MIN_FILLER_RUN: usize = 100;

/// On-disk configuration. Every field is optional; CLI flags override and the
/// result is resolved into a `HarnessConfig`.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct HarnessFileConfig {
    pub target: Option<TargetConfig>,
    pub execution: Option<ExecutionConfig>,
    pub budgets: Option<BudgetConfig>,
    pub backoff: Option<BackoffConfig>,
    pub side_channel: Option<SideChannelConfig>,
    pub dedup: Option<DedupConfig>,
    pub alert_on_fault: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct TargetConfig {
    /// Product directory, e.g. `./Tenda/A/A18`.
    pub base_dir: Option<String>,
    pub poc_dir: Option<String>,
    pub archive_dir: Option<String>,
    pub unique_dir: Option<String>,
    pub script_extension: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ExecutionConfig {
    pub interpreter: Option<String>,
    pub args: Option<Vec<String>>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct BudgetConfig {
    pub exploratory: Option<u32>,
    pub verification: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct BackoffConfig {
    pub warmup_ms: Option<u64>,
    pub timeout_ms: Option<u64>,
    pub benign_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SideChannelConfig {
    pub url: String,
    pub marker: String,
    /// Token whose presence in a script's source makes it probe-eligible.
    pub trigger: Option<String>,
    pub cleanup_find: Option<String>,
    pub cleanup_replace: Option<String>,
    pub probe_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct DedupConfig {
    pub filler_chars: Option<Vec<char>>,
    pub min_filler_run: Option<usize>,
}
