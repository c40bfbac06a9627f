use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use crate::archive::SuccessArchive;
use crate::audit::AuditSession;
use crate::errors::HarnessError;
use crate::executor::{ScratchCopy, ScriptExecutor};
use crate::models::{AttemptRecord, PocScript, RunMode, ScriptOutcome, Verdict};
use crate::triage::{classify, Classification, Pause, ProbeResult, SideChannelOracle};
use crate::utils::excerpt;
use super::events::HarnessEvent;
use super::state::{Backoff, SideChannelSettings};
use tracing::{debug, info, warn};

/// Where a script is in its attempt loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptState {
    Pending,
    Attempting { attempt: u32 },
    /// No stop verdict; optionally pause before the next attempt.
    Continuing { attempt: u32, pause: Option<Duration> },
    /// Request timed out; back off before the next attempt.
    Retrying { attempt: u32, backoff: Duration },
    Stopped { attempt: u32, verdict: Verdict },
}

impl ScriptState {
    /// Transition out of `Attempting` once the attempt has been classified.
    pub fn after_classification(attempt: u32, classification: &Classification, backoff: &Backoff) -> Self {
        let pause = match classification.pause {
            Pause::None => None,
            Pause::Timeout => Some(backoff.timeout),
            Pause::Benign => Some(backoff.benign),
        };
        match classification.verdict {
            verdict if verdict.is_stop() => ScriptState::Stopped { attempt, verdict },
            Verdict::TimeoutRetry => ScriptState::Retrying {
                attempt,
                backoff: pause.unwrap_or(backoff.timeout),
            },
            _ => ScriptState::Continuing { attempt, pause },
        }
    }

    pub fn pause(&self) -> Option<Duration> {
        match self {
            ScriptState::Continuing { pause, .. } => *pause,
            ScriptState::Retrying { backoff, .. } => Some(*backoff),
            _ => None,
        }
    }
}

/// Side-channel settings paired with the oracle that probes them.
#[derive(Clone)]
pub struct SideChannel {
    pub settings: SideChannelSettings,
    pub oracle: Arc<dyn SideChannelOracle>,
}

/// Terminal result for one script and whether a copy landed in the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRun {
    pub outcome: ScriptOutcome,
    pub archived: bool,
}

/// Drives one PoC through up to `max_attempts` executions.
pub struct PocRunner {
    executor: Arc<dyn ScriptExecutor>,
    side_channel: Option<SideChannel>,
    archive: SuccessArchive,
    backoff: Backoff,
    audit: Arc<AuditSession>,
    event_tx: Option<mpsc::UnboundedSender<HarnessEvent>>,
}

impl PocRunner {
    pub fn new(
        executor: Arc<dyn ScriptExecutor>,
        side_channel: Option<SideChannel>,
        archive: SuccessArchive,
        backoff: Backoff,
        audit: Arc<AuditSession>,
    ) -> Self {
        Self {
            executor,
            side_channel,
            archive,
            backoff,
            audit,
            event_tx: None,
        }
    }

    pub fn with_event_channel(mut self, tx: mpsc::UnboundedSender<HarnessEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    fn emit(&self, event: HarnessEvent) {
        if let Some(ref tx) = self.event_tx {
            let _ = tx.send(event);
        }
    }

    pub async fn run_script(
        &self,
        script: &PocScript,
        mode: RunMode,
        max_attempts: u32,
    ) -> Result<ScriptRun, HarnessError> {
        let source = tokio::fs::read(&script.path)
            .await
            .map_err(|e| HarnessError::ScriptRead(format!("{}: {}", script.name, e)))?;
        let source_text = String::from_utf8_lossy(&source);

        let side_channel = self
            .side_channel
            .as_ref()
            .filter(|sc| sc.settings.is_referenced_by(&source_text));

        let mut state = ScriptState::Pending;
        debug!(script = %script.name, ?state, probes = side_channel.is_some(), "Script dequeued");

        for attempt in 1..=max_attempts {
            state = ScriptState::Attempting { attempt };
            debug!(script = %script.name, ?state, "Attempt starting");

            let output = {
                let scratch = ScratchCopy::materialize(&script.name, &source).await?;
                self.executor.run(scratch.path()).await?
            };

            let classification = classify(&output.text);
            state = ScriptState::after_classification(attempt, &classification, &self.backoff);

            info!(
                script = %script.name,
                attempt,
                max = max_attempts,
                verdict = %classification.verdict,
                "Attempt classified"
            );
            let record = AttemptRecord {
                script: script.name.clone(),
                attempt,
                max_attempts,
                output: output.text.clone(),
                verdict: classification.verdict,
                marker: classification.marker,
            };
            self.audit.record_attempt(&record).await;
            self.emit(HarnessEvent::AttemptClassified {
                script: script.name.clone(),
                attempt,
                max_attempts,
                verdict: classification.verdict,
                excerpt: excerpt(&output.text),
            });

            if let ScriptState::Stopped { verdict, .. } = state {
                let archived = self.archive_if_exploring(script, mode).await?;
                // The attempt may have written the artifact too; clear it before moving on.
                let mut cleanup_verified = None;
                if let Some(sc) = side_channel {
                    if self.probe(script, sc).await.is_confirmed() {
                        info!(script = %script.name, attempt, "Side-channel artifact present after stop verdict");
                        cleanup_verified = Some(self.clean_up(script, &source_text, sc).await);
                    }
                }
                let outcome = match verdict {
                    Verdict::ExceptionStop => ScriptOutcome::Faulted {
                        attempts: attempt,
                        output: output.text,
                        cleanup_verified,
                    },
                    _ => ScriptOutcome::Crashed { attempts: attempt, cleanup_verified },
                };
                return Ok(ScriptRun { outcome, archived });
            }

            if let Some(pause) = state.pause().filter(|p| !p.is_zero()) {
                debug!(script = %script.name, pause_ms = pause.as_millis() as u64, "Pausing before next attempt");
                tokio::time::sleep(pause).await;
            }

            if let Some(sc) = side_channel {
                if self.probe(script, sc).await.is_confirmed() {
                    state = ScriptState::Stopped { attempt, verdict: Verdict::SideChannelConfirmed };
                    info!(script = %script.name, attempt, ?state, "Side channel confirmed injection");
                    let archived = self.archive_if_exploring(script, mode).await?;
                    let cleanup_verified = self.clean_up(script, &source_text, sc).await;
                    return Ok(ScriptRun {
                        outcome: ScriptOutcome::SideChannelConfirmed { attempts: attempt, cleanup_verified },
                        archived,
                    });
                }
            }
        }

        debug!(script = %script.name, ?state, "Attempt budget exhausted");
        Ok(ScriptRun {
            outcome: ScriptOutcome::Exhausted { attempts: max_attempts },
            archived: false,
        })
    }

    async fn probe(&self, script: &PocScript, sc: &SideChannel) -> ProbeResult {
        let result = sc.oracle.probe().await;
        self.emit(HarnessEvent::SideChannelProbed {
            script: script.name.clone(),
            result: result.as_str().to_string(),
        });
        if let ProbeResult::Error(e) = &result {
            warn!(script = %script.name, resource = sc.oracle.resource(), error = %e, "Probe failed, treating as unconfirmed");
        }
        result
    }

    async fn archive_if_exploring(&self, script: &PocScript, mode: RunMode) -> Result<bool, HarnessError> {
        if !mode.archives_findings() {
            return Ok(false);
        }
        self.archive.store(script).await?;
        Ok(true)
    }

    /// Run the cleanup variant once in a throwaway copy, then re-probe.
    /// Returns whether the artifact is gone.
    async fn clean_up(&self, script: &PocScript, source: &str, sc: &SideChannel) -> bool {
        let variant = sc.settings.cleanup_variant(source);
        match ScratchCopy::materialize(&script.name, variant.as_bytes()).await {
            Ok(scratch) => {
                if let Err(e) = self.executor.run(scratch.path()).await {
                    warn!(script = %script.name, error = %e, "Cleanup variant failed to run");
                }
            }
            Err(e) => warn!(script = %script.name, error = %e, "Cleanup variant could not be written"),
        }

        if self.probe(script, sc).await.is_confirmed() {
            warn!(script = %script.name, resource = sc.oracle.resource(), "Side-channel artifact still present after cleanup");
            false
        } else {
            debug!(script = %script.name, "Side-channel artifact cleaned up");
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triage::classify;

    #[test]
    fn test_exception_stops() {
        let state = ScriptState::after_classification(3, &classify("EXCEPTION: boom"), &Backoff::default());
        assert_eq!(state, ScriptState::Stopped { attempt: 3, verdict: Verdict::ExceptionStop });
        assert_eq!(state.pause(), None);
    }

    #[test]
    fn test_500_stops() {
        let state = ScriptState::after_classification(1, &classify("500"), &Backoff::default());
        assert_eq!(state, ScriptState::Stopped { attempt: 1, verdict: Verdict::SuccessStop });
    }

    #[test]
    fn test_timeout_retries_with_timeout_backoff() {
        let backoff = Backoff::default();
        let state = ScriptState::after_classification(2, &classify("TIMEOUT"), &backoff);
        assert_eq!(state, ScriptState::Retrying { attempt: 2, backoff: backoff.timeout });
        assert_eq!(state.pause(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_200_continues_with_benign_pause() {
        let backoff = Backoff::default();
        let state = ScriptState::after_classification(1, &classify("200"), &backoff);
        assert_eq!(state, ScriptState::Continuing { attempt: 1, pause: Some(Duration::from_secs(3)) });
    }

    #[test]
    fn test_unrecognized_continues_without_pause() {
        let state = ScriptState::after_classification(1, &classify("Connection refused"), &Backoff::default());
        assert_eq!(state, ScriptState::Continuing { attempt: 1, pause: None });
        assert_eq!(state.pause(), None);
    }
}
