use std::path::{Path, PathBuf};
use chrono::Utc;
use serde::Serialize;
use crate::archive::DedupReport;
use crate::errors::HarnessError;
use crate::pipeline::state::BatchReport;
use super::utils::atomic_write;

#[derive(Debug, Default, Serialize)]
pub struct RunSummaryData {
    pub run_id: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub batches: Vec<BatchReport>,
    pub dedup: Option<DedupReport>,
    pub error: Option<String>,
}

/// Summary of the latest run, rewritten atomically after every batch.
pub struct RunSummary {
    path: PathBuf,
    data: RunSummaryData,
}

impl RunSummary {
    pub fn new(audit_dir: &Path, run_id: &str) -> Self {
        Self {
            path: audit_dir.join("last_run.json"),
            data: RunSummaryData {
                run_id: run_id.to_string(),
                started_at: Utc::now().to_rfc3339(),
                ..Default::default()
            },
        }
    }

    pub fn record_batch(&mut self, report: &BatchReport) {
        self.data.batches.retain(|b| b.mode != report.mode);
        self.data.batches.push(report.clone());
    }

    pub fn record_dedup(&mut self, report: &DedupReport) {
        self.data.dedup = Some(report.clone());
    }

    pub fn record_error(&mut self, error: &HarnessError) {
        self.data.error = Some(error.to_string());
    }

    pub async fn save(&mut self) -> Result<(), HarnessError> {
        self.data.finished_at = Some(Utc::now().to_rfc3339());
        let json = serde_json::to_string_pretty(&self.data)?;
        atomic_write(&self.path, &json).await
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
