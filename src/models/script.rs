use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use super::verdict::Verdict;

/// A generated proof-of-concept script. Identity is the file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PocScript {
    pub name: String,
    pub path: PathBuf,
}

impl PocScript {
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_string();
        Some(Self { name, path: path.to_path_buf() })
    }
}

/// Ordered scripts for one run mode, sorted by file name.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    scripts: Vec<PocScript>,
}

impl Batch {
    pub fn new(mut scripts: Vec<PocScript>) -> Self {
        scripts.sort_by(|a, b| a.name.cmp(&b.name));
        Self { scripts }
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    pub fn scripts(&self) -> &[PocScript] {
        &self.scripts
    }

    /// Scripts from `cursor` onward, paired with their batch index.
    pub fn remaining(&self, cursor: usize) -> impl Iterator<Item = (usize, &PocScript)> {
        let start = cursor.min(self.scripts.len());
        self.scripts[start..]
            .iter()
            .enumerate()
            .map(move |(offset, script)| (start + offset, script))
    }
}

/// One execution attempt of one script. Transient, written to the attempt log only.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptRecord {
    pub script: String,
    pub attempt: u32,
    pub max_attempts: u32,
    pub output: String,
    pub verdict: Verdict,
    pub marker: Option<&'static str>,
}

/// Terminal result of driving one script through its attempt loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScriptOutcome {
    /// A `500` response was observed. `cleanup_verified` is set when the side
    /// channel also held the marker and the cleanup variant ran.
    Crashed { attempts: u32, cleanup_verified: Option<bool> },
    /// The side channel saw the marker. `cleanup_verified` is false when the
    /// follow-up probe still saw it after the cleanup variant ran.
    SideChannelConfirmed { attempts: u32, cleanup_verified: bool },
    /// The script printed `EXCEPTION`.
    Faulted { attempts: u32, output: String, cleanup_verified: Option<bool> },
    /// Budget used up without a stop verdict.
    Exhausted { attempts: u32 },
    /// The script could not be read; nothing was executed.
    Unreadable { reason: String },
}

impl ScriptOutcome {
    /// Scripts with this outcome are copied into the success archive in exploratory mode.
    pub fn is_finding(&self) -> bool {
        matches!(
            self,
            Self::Crashed { .. } | Self::SideChannelConfirmed { .. } | Self::Faulted { .. }
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Crashed { .. } => "crashed",
            Self::SideChannelConfirmed { .. } => "side-channel",
            Self::Faulted { .. } => "faulted",
            Self::Exhausted { .. } => "exhausted",
            Self::Unreadable { .. } => "unreadable",
        }
    }
}
