use crate::models::{RunMode, ScriptOutcome, Verdict};

/// Messages sent from the batch driver to a console renderer.
#[derive(Debug, Clone)]
pub enum HarnessEvent {
    /// A batch run is about to start (after warm-up)
    BatchStarted {
        mode: RunMode,
        total: usize,
        start_index: usize,
    },
    /// A script was dequeued
    ScriptStarted {
        mode: RunMode,
        index: usize,
        total: usize,
        script: String,
    },
    /// One attempt was classified
    AttemptClassified {
        script: String,
        attempt: u32,
        max_attempts: u32,
        verdict: Verdict,
        excerpt: String,
    },
    /// The side-channel resource was probed
    SideChannelProbed {
        script: String,
        result: String,
    },
    /// A script reached a terminal state
    ScriptFinished {
        script: String,
        outcome: ScriptOutcome,
        archived: bool,
    },
    /// The cursor was persisted
    ProgressSaved {
        mode: RunMode,
        next_index: usize,
    },
    /// Every remaining script was processed
    BatchCompleted {
        mode: RunMode,
        attempted: usize,
        findings: usize,
    },
    /// An EXCEPTION halted the batch
    BatchAborted {
        mode: RunMode,
        script: String,
    },
}
