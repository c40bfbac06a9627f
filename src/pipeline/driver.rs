use std::sync::Arc;
use serde::Serialize;
use tokio::sync::mpsc;
use crate::archive::{DedupReport, Deduplicator, SuccessArchive};
use crate::audit::AuditSession;
use crate::errors::{FaultScope, HarnessError};
use crate::executor::{ProcessExecutor, ScriptExecutor};
use crate::models::{Batch, RunMode, ScriptOutcome};
use crate::progress::ProgressStore;
use crate::triage::{HttpOracle, SideChannelOracle};
use super::batch::load_batch;
use super::events::HarnessEvent;
use super::runner::{PocRunner, ScriptRun, SideChannel};
use super::state::{BatchReport, HarnessConfig};
use tracing::{info, warn};

/// Reports from the end-to-end flow: explore, re-verify, deduplicate.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub exploratory: BatchReport,
    pub verification: BatchReport,
    pub dedup: DedupReport,
}

/// Iterates a mode's batch from its persisted cursor, one script at a time.
pub struct BatchDriver {
    config: HarnessConfig,
    runner: PocRunner,
    progress: ProgressStore,
    audit: Arc<AuditSession>,
    event_tx: Option<mpsc::UnboundedSender<HarnessEvent>>,
}

impl BatchDriver {
    /// Build a driver around the given execution and probing capabilities.
    /// The archive directory is created here; failing to create it is fatal.
    pub async fn new(
        config: HarnessConfig,
        executor: Arc<dyn ScriptExecutor>,
        oracle: Option<Arc<dyn SideChannelOracle>>,
    ) -> Result<Self, HarnessError> {
        let archive = SuccessArchive::new(&config.archive_dir, &config.script_extension);
        archive.ensure().await?;

        let audit = Arc::new(AuditSession::initialize(&config.audit_dir()).await?);

        let side_channel = match (&config.side_channel, oracle) {
            (Some(settings), Some(oracle)) => Some(SideChannel { settings: settings.clone(), oracle }),
            (Some(_), None) => {
                warn!("Side channel configured without an oracle, probing disabled");
                None
            }
            _ => None,
        };

        let runner = PocRunner::new(executor, side_channel, archive, config.backoff, audit.clone());
        let progress = ProgressStore::for_config(&config);

        info!(
            base_dir = %config.base_dir.display(),
            run_id = %audit.run_id(),
            "Harness initialized"
        );

        Ok(Self {
            config,
            runner,
            progress,
            audit,
            event_tx: None,
        })
    }

    /// Production wiring: subprocess executor and, if configured, the HTTP oracle.
    pub async fn from_config(config: HarnessConfig) -> Result<Self, HarnessError> {
        let executor: Arc<dyn ScriptExecutor> = Arc::new(ProcessExecutor::from_settings(&config.execution));
        let oracle: Option<Arc<dyn SideChannelOracle>> = match &config.side_channel {
            Some(settings) => Some(Arc::new(HttpOracle::from_settings(settings)?)),
            None => None,
        };
        Self::new(config, executor, oracle).await
    }

    /// Attach an event channel for streaming progress to a console renderer.
    pub fn with_event_channel(mut self, tx: mpsc::UnboundedSender<HarnessEvent>) -> Self {
        self.runner = self.runner.with_event_channel(tx.clone());
        self.event_tx = Some(tx);
        self
    }

    fn emit(&self, event: HarnessEvent) {
        if let Some(ref tx) = self.event_tx {
            let _ = tx.send(event);
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    pub fn audit(&self) -> &AuditSession {
        &self.audit
    }

    pub fn batch(&self, mode: RunMode) -> Result<Batch, HarnessError> {
        load_batch(self.config.batch_dir(mode), &self.config.script_extension)
    }

    /// Run `mode`'s batch from its cursor to the end, or until a script faults.
    pub async fn run_mode(&self, mode: RunMode) -> Result<BatchReport, HarnessError> {
        let batch = self.batch(mode)?;
        let total = batch.len();
        let stored = self.progress.load(mode).await;
        if stored > total {
            warn!(mode = %mode, cursor = stored, total, "Cursor beyond batch end, treating batch as exhausted");
        }
        let start = stored.min(total);
        let max_attempts = self.config.max_attempts(mode);
        let mut report = BatchReport::new(mode, total, start);

        if start >= total {
            info!(mode = %mode, total, "Batch already exhausted, nothing to run");
            self.audit.log_event(&format!("Batch {} exhausted ({} scripts), nothing to run", mode, total)).await;
            self.audit.record_batch(&report).await;
            return Ok(report);
        }

        info!(mode = %mode, start, total, max_attempts, "Starting batch");
        self.audit.log_event(&format!(
            "Batch {} starting at index {} of {} (budget {} attempts)",
            mode, start, total, max_attempts
        )).await;

        let warmup = self.config.backoff.warmup;
        if !warmup.is_zero() {
            info!(warmup_ms = warmup.as_millis() as u64, "Letting the target settle");
            tokio::time::sleep(warmup).await;
        }

        self.emit(HarnessEvent::BatchStarted { mode, total, start_index: start });

        for (index, script) in batch.remaining(start) {
            self.emit(HarnessEvent::ScriptStarted {
                mode,
                index,
                total,
                script: script.name.clone(),
            });
            info!(mode = %mode, index, total, script = %script.name, "Running PoC");

            let run = match self.runner.run_script(script, mode, max_attempts).await {
                Ok(run) => run,
                Err(e) if e.classify().scope == FaultScope::Script => {
                    warn!(script = %script.name, error = %e, "Skipping script");
                    ScriptRun {
                        outcome: ScriptOutcome::Unreadable { reason: e.to_string() },
                        archived: false,
                    }
                }
                Err(e) => return Err(self.halt(&report, e).await),
            };

            report.record(index, &script.name, &run.outcome, run.archived);
            if let Err(e) = self.progress.save(mode, index + 1).await {
                return Err(self.halt(&report, e).await);
            }
            self.emit(HarnessEvent::ProgressSaved { mode, next_index: index + 1 });
            self.emit(HarnessEvent::ScriptFinished {
                script: script.name.clone(),
                outcome: run.outcome.clone(),
                archived: run.archived,
            });
            self.audit.log_event(&format!(
                "{} [{}/{}] {} -> {}{} (next index {})",
                mode,
                index + 1,
                total,
                script.name,
                run.outcome.label(),
                if run.archived { ", archived" } else { "" },
                index + 1,
            )).await;

            if let ScriptOutcome::Faulted { output, .. } = run.outcome {
                warn!(mode = %mode, script = %script.name, "EXCEPTION from PoC, halting batch");
                self.emit(HarnessEvent::BatchAborted { mode, script: script.name.clone() });
                let fault = HarnessError::TargetFault { script: script.name.clone(), output };
                return Err(self.halt(&report, fault).await);
            }
        }

        info!(
            mode = %mode,
            attempted = report.attempted(),
            findings = report.findings(),
            archived = report.archived.len(),
            "Batch complete"
        );
        self.emit(HarnessEvent::BatchCompleted {
            mode,
            attempted: report.attempted(),
            findings: report.findings(),
        });
        self.audit.log_event(&format!(
            "Batch {} complete: {} attempted, {} findings",
            mode,
            report.attempted(),
            report.findings()
        )).await;
        self.audit.record_batch(&report).await;
        Ok(report)
    }

    async fn halt(&self, report: &BatchReport, error: HarnessError) -> HarnessError {
        self.audit.record_batch(report).await;
        self.audit.record_error(&error).await;
        error
    }

    /// Collapse the archive into one script per (base, parameter) under `unique_dir`.
    pub async fn dedup(&self) -> Result<DedupReport, HarnessError> {
        let dedup = Deduplicator::for_config(&self.config)?;
        let report = dedup.run(&self.config.archive_dir, &self.config.unique_dir).await?;
        self.audit.log_event(&format!(
            "Dedup: {} scanned, {} unique, {} duplicates, {} unrecognized",
            report.scanned,
            report.unique_count(),
            report.duplicates,
            report.unrecognized
        )).await;
        self.audit.record_dedup(&report).await;
        Ok(report)
    }

    /// Exploratory batch, then re-verification of the archive, then dedup.
    pub async fn run_all(&self) -> Result<RunReport, HarnessError> {
        let exploratory = self.run_mode(RunMode::Exploratory).await?;
        let verification = self.run_mode(RunMode::Verification).await?;
        let dedup = self.dedup().await?;
        Ok(RunReport { exploratory, verification, dedup })
    }
}
