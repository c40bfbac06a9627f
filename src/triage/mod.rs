pub mod classifier;
pub mod oracle;

pub use classifier::{classify, classify_with, Classification, Pause, VerdictRule, VERDICT_RULES};
pub use oracle::{judge_body, HttpOracle, ProbeResult, SideChannelOracle};
