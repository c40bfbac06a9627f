pub mod batch;
pub mod commands;
pub mod dedup;
pub mod logs;
pub mod probe;
pub mod status;
pub mod target;
pub mod validate;

pub use commands::{Cli, Commands};
