use std::path::{Path, PathBuf};
use chrono::Utc;
use tokio::io::AsyncWriteExt;
use crate::errors::HarnessError;
use crate::models::AttemptRecord;
use crate::utils::truncation::truncate_output;

/// One JSON line per execution attempt, flushed as it is written.
pub struct AttemptLogger {
    path: PathBuf,
    file: tokio::fs::File,
}

impl AttemptLogger {
    pub async fn new(audit_dir: &Path, run_id: &str) -> Result<Self, HarnessError> {
        let filename = format!("attempts_{}_{}.jsonl", Utc::now().format("%Y%m%d_%H%M%S"), run_id);
        let path = audit_dir.join(filename);
        let file = tokio::fs::OpenOptions::new()
            .create(true).append(true).open(&path).await?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn log_attempt(&mut self, record: &AttemptRecord) -> Result<(), HarnessError> {
        let entry = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "script": record.script,
            "attempt": record.attempt,
            "max_attempts": record.max_attempts,
            "verdict": record.verdict,
            "marker": record.marker,
            "output": truncate_output(&record.output),
        });
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');
        self.file.write_all(line.as_bytes()).await?;
        self.file.flush().await?;
        Ok(())
    }
}
