use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use crate::archive::DedupReport;
use crate::errors::HarnessError;
use crate::models::AttemptRecord;
use crate::pipeline::state::BatchReport;
use super::attempt_logger::AttemptLogger;
use super::summary::RunSummary;
use super::workflow_logger::WorkflowLogger;
use tracing::warn;

/// Durable record of one harness run under `<base_dir>/audit/`.
///
/// Audit writes never abort a batch: a failed write is reported through
/// `tracing` and the run carries on.
pub struct AuditSession {
    audit_dir: PathBuf,
    run_id: String,
    workflow: WorkflowLogger,
    attempts: Mutex<AttemptLogger>,
    summary: Mutex<RunSummary>,
}

impl AuditSession {
    pub async fn initialize(audit_dir: &Path) -> Result<Self, HarnessError> {
        tokio::fs::create_dir_all(audit_dir).await.map_err(|e| {
            HarnessError::Storage(format!("Failed to create audit directory {}: {}", audit_dir.display(), e))
        })?;

        let run_id = uuid::Uuid::new_v4().to_string();
        let workflow = WorkflowLogger::new(audit_dir);
        workflow.start_run(&run_id).await?;
        let attempts = AttemptLogger::new(audit_dir, &run_id).await?;
        let summary = RunSummary::new(audit_dir, &run_id);

        Ok(Self {
            audit_dir: audit_dir.to_path_buf(),
            run_id,
            workflow,
            attempts: Mutex::new(attempts),
            summary: Mutex::new(summary),
        })
    }

    pub async fn log_event(&self, message: &str) {
        if let Err(e) = self.workflow.log_event(message).await {
            warn!(error = %e, "Failed to write workflow log");
        }
    }

    pub async fn record_attempt(&self, record: &AttemptRecord) {
        if let Err(e) = self.attempts.lock().await.log_attempt(record).await {
            warn!(error = %e, script = %record.script, "Failed to write attempt log");
        }
    }

    pub async fn record_batch(&self, report: &BatchReport) {
        let mut summary = self.summary.lock().await;
        summary.record_batch(report);
        if let Err(e) = summary.save().await {
            warn!(error = %e, "Failed to write run summary");
        }
    }

    pub async fn record_dedup(&self, report: &DedupReport) {
        let mut summary = self.summary.lock().await;
        summary.record_dedup(report);
        if let Err(e) = summary.save().await {
            warn!(error = %e, "Failed to write run summary");
        }
    }

    pub async fn record_error(&self, error: &HarnessError) {
        self.log_event(&format!("Run halted: {}", error)).await;
        let mut summary = self.summary.lock().await;
        summary.record_error(error);
        if let Err(e) = summary.save().await {
            warn!(error = %e, "Failed to write run summary");
        }
    }

    pub fn audit_dir(&self) -> &Path {
        &self.audit_dir
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn workflow_log(&self) -> &Path {
        self.workflow.path()
    }
}
