pub mod success;
pub mod dedup;

pub use success::SuccessArchive;
pub use dedup::{DedupCopy, DedupReport, Deduplicator};
