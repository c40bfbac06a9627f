use serde::{Deserialize, Serialize};

/// The two independent ways a batch is driven. Each has its own source batch and
/// its own progress cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Every generated PoC, small attempt budget, findings are archived.
    Exploratory,
    /// Archived PoCs only, large attempt budget, nothing is re-archived.
    Verification,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exploratory => "exploratory",
            Self::Verification => "verification",
        }
    }

    pub fn archives_findings(&self) -> bool {
        matches!(self, Self::Exploratory)
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
