use std::path::Path;
use crate::errors::HarnessError;
use crate::models::{Batch, PocScript};
use tracing::warn;

/// Enumerate `<dir>/*.<extension>` (non-recursive) into a batch sorted by file name.
/// A missing directory is an empty batch.
pub fn load_batch(dir: &Path, extension: &str) -> Result<Batch, HarnessError> {
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "Batch directory does not exist, nothing to run");
        return Ok(Batch::default());
    }

    let pattern = format!(
        "{}/*.{}",
        glob::Pattern::escape(&dir.to_string_lossy()),
        glob::Pattern::escape(extension),
    );
    let paths = glob::glob(&pattern)
        .map_err(|e| HarnessError::Config(format!("Invalid batch pattern '{}': {}", pattern, e)))?;

    let mut scripts = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) if path.is_file() => {
                match PocScript::from_path(&path) {
                    Some(script) => scripts.push(script),
                    None => warn!(path = %path.display(), "Skipping PoC with a non-UTF-8 file name"),
                }
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Skipping unreadable batch entry"),
        }
    }

    Ok(Batch::new(scripts))
}
