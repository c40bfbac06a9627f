pub mod verdict;
pub mod mode;
pub mod script;

pub use verdict::*;
pub use mode::*;
pub use script::*;
