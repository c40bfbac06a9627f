pub mod process;
pub mod scratch;

pub use process::{CapturedOutput, ProcessExecutor, ScriptExecutor};
pub use scratch::ScratchCopy;
