use console::Term;
use tracing::debug;

/// Audible operator alert. Written to stderr so piped stdout stays clean.
pub fn ring_bell() {
    if let Err(e) = Term::stderr().write_str("\u{7}") {
        debug!(error = %e, "Could not ring terminal bell");
    }
}
