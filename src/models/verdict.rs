use serde::{Deserialize, Serialize};

/// Classification of one execution attempt. Drives control flow only, never persisted
/// beyond the attempt that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// No decisive marker; keep attempting.
    Continue,
    /// The PoC itself blew up. Fatal to the batch.
    ExceptionStop,
    /// The request timed out; back off and try again.
    TimeoutRetry,
    /// Server error from the target, taken as crash evidence.
    SuccessStop,
    /// The out-of-band probe saw the injected marker.
    SideChannelConfirmed,
}

impl Verdict {
    /// Whether this verdict ends the attempt loop for the current script.
    pub fn is_stop(&self) -> bool {
        matches!(
            self,
            Verdict::ExceptionStop | Verdict::SuccessStop | Verdict::SideChannelConfirmed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Continue => "continue",
            Self::ExceptionStop => "exception-stop",
            Self::TimeoutRetry => "timeout-retry",
            Self::SuccessStop => "success-stop",
            Self::SideChannelConfirmed => "side-channel-confirmed",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
