pub mod batch;
pub mod driver;
pub mod events;
pub mod runner;
pub mod state;

pub use batch::load_batch;
pub use driver::{BatchDriver, RunReport};
pub use events::HarnessEvent;
pub use runner::{PocRunner, ScriptRun, ScriptState, SideChannel};
pub use state::{Backoff, BatchReport, DedupSettings, ExecutionSettings, HarnessConfig, SideChannelSettings};
