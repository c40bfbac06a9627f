pub mod store;

pub use store::ProgressStore;
