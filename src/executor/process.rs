use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use async_trait::async_trait;
use serde::Serialize;
use tokio::process::Command;
use tokio::time::timeout;
use crate::errors::HarnessError;
use crate::pipeline::state::ExecutionSettings;
use tracing::{debug, warn};

/// Everything one execution printed, plus how it ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapturedOutput {
    pub text: String,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

impl CapturedOutput {
    /// Trimmed stdout followed by trimmed stderr.
    pub fn from_streams(stdout: &[u8], stderr: &[u8], exit_code: Option<i32>) -> Self {
        let stdout = String::from_utf8_lossy(stdout);
        let stderr = String::from_utf8_lossy(stderr);
        let (stdout, stderr) = (stdout.trim(), stderr.trim());
        let text = match (stdout.is_empty(), stderr.is_empty()) {
            (false, false) => format!("{}\n{}", stdout, stderr),
            (false, true) => stdout.to_string(),
            _ => stderr.to_string(),
        };
        Self { text, exit_code, timed_out: false }
    }

    /// Output for a run the harness killed. Carries the `TIMEOUT` marker so the
    /// attempt is retried like a request timeout.
    pub fn harness_timeout(limit: Duration) -> Self {
        Self {
            text: format!("TIMEOUT: execution exceeded {}s and was killed by the harness", limit.as_secs()),
            exit_code: None,
            timed_out: true,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), exit_code: Some(0), timed_out: false }
    }
}

/// Runs a script and captures its output. Output never streams to the harness console.
#[async_trait]
pub trait ScriptExecutor: Send + Sync {
    async fn run(&self, script: &Path) -> Result<CapturedOutput, HarnessError>;
}

/// Runs scripts as `<interpreter> [args...] <script>` subprocesses.
pub struct ProcessExecutor {
    interpreter: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ProcessExecutor {
    pub fn new(interpreter: &str, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            interpreter: interpreter.to_string(),
            args,
            timeout,
        }
    }

    pub fn from_settings(settings: &ExecutionSettings) -> Self {
        Self::new(&settings.interpreter, settings.args.clone(), settings.timeout)
    }
}

#[async_trait]
impl ScriptExecutor for ProcessExecutor {
    async fn run(&self, script: &Path) -> Result<CapturedOutput, HarnessError> {
        let mut cmd = Command::new(&self.interpreter);
        cmd.args(&self.args)
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = script.parent() {
            cmd.current_dir(dir);
        }

        debug!(interpreter = %self.interpreter, script = %script.display(), "Executing PoC");

        match timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => Ok(CapturedOutput::from_streams(
                &output.stdout,
                &output.stderr,
                output.status.code(),
            )),
            Ok(Err(e)) => Err(HarnessError::Execution(format!(
                "Failed to run {} {}: {}",
                self.interpreter,
                script.display(),
                e
            ))),
            Err(_) => {
                warn!(script = %script.display(), timeout_secs = self.timeout.as_secs(), "PoC killed after timeout");
                Ok(CapturedOutput::harness_timeout(self.timeout))
            }
        }
    }
}
