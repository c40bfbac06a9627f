pub mod session;
pub mod attempt_logger;
pub mod workflow_logger;
pub mod summary;
pub mod utils;

pub use session::AuditSession;
