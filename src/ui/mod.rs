pub mod alert;
pub mod progress;
pub mod renderer;

pub use alert::ring_bell;
pub use progress::{spawn_console, BatchProgress};
pub use renderer::render_event;
