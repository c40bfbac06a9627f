use std::path::{Path, PathBuf};
use chrono::Utc;
use tokio::io::AsyncWriteExt;
use crate::errors::HarnessError;

/// Append-only, human-readable event log shared by every run against a product.
pub struct WorkflowLogger {
    path: PathBuf,
}

impl WorkflowLogger {
    pub fn new(base_dir: &Path) -> Self {
        Self { path: base_dir.join("workflow.log") }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn start_run(&self, run_id: &str) -> Result<(), HarnessError> {
        let header = format!(
            "\n# PoC Harness Run {}\n# Started: {}\n# Build: {} {}\n\n",
            run_id,
            Utc::now().to_rfc3339(),
            env!("BUILD_TIMESTAMP"),
            option_env!("GIT_HASH").unwrap_or("unknown"),
        );
        self.append(&header).await
    }

    pub async fn log_event(&self, message: &str) -> Result<(), HarnessError> {
        let line = format!("[{}] {}\n", Utc::now().format("%Y-%m-%d %H:%M:%S"), message);
        self.append(&line).await
    }

    async fn append(&self, text: &str) -> Result<(), HarnessError> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true).append(true).open(&self.path).await?;
        file.write_all(text.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
