pub mod archive;
pub mod audit;
pub mod cli;
pub mod config;
pub mod errors;
pub mod executor;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod triage;
pub mod ui;
pub mod utils;
