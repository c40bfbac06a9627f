use crate::models::Verdict;

/// Whether the runner sleeps after an attempt, and which backoff applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pause {
    None,
    Timeout,
    Benign,
}

/// One entry of the ordered rule list: if the captured output contains `marker`,
/// the attempt gets `verdict` and the runner applies `pause`.
#[derive(Debug, Clone, Copy)]
pub struct VerdictRule {
    pub marker: &'static str,
    pub verdict: Verdict,
    pub pause: Pause,
}

impl VerdictRule {
    pub fn matches(&self, output: &str) -> bool {
        output.contains(self.marker)
    }
}

/// Evaluated top to bottom, first match wins. `EXCEPTION` must stay first.
pub const VERDICT_RULES: &[VerdictRule] = &[
    VerdictRule { marker: "EXCEPTION", verdict: Verdict::ExceptionStop, pause: Pause::None },
    VerdictRule { marker: "TIMEOUT", verdict: Verdict::TimeoutRetry, pause: Pause::Timeout },
    VerdictRule { marker: "500", verdict: Verdict::SuccessStop, pause: Pause::None },
    VerdictRule { marker: "200", verdict: Verdict::Continue, pause: Pause::Benign },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub verdict: Verdict,
    pub pause: Pause,
    /// The marker that fired, if any.
    pub marker: Option<&'static str>,
}

impl Classification {
    fn unrecognized() -> Self {
        Self { verdict: Verdict::Continue, pause: Pause::None, marker: None }
    }
}

/// Classify one attempt's captured stdout+stderr with the standard rules.
pub fn classify(output: &str) -> Classification {
    classify_with(VERDICT_RULES, output)
}

pub fn classify_with(rules: &[VerdictRule], output: &str) -> Classification {
    rules
        .iter()
        .find(|rule| rule.matches(output))
        .map(|rule| Classification {
            verdict: rule.verdict,
            pause: rule.pause,
            marker: Some(rule.marker),
        })
        .unwrap_or_else(Classification::unrecognized)
}
