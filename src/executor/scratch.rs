use std::path::{Path, PathBuf};
use tempfile::TempDir;
use crate::errors::HarnessError;

/// A disposable copy of a script in its own temporary directory. The directory
/// and everything the script left in it are removed when this is dropped.
pub struct ScratchCopy {
    dir: TempDir,
    path: PathBuf,
}

impl ScratchCopy {
    pub async fn materialize(name: &str, contents: &[u8]) -> Result<Self, HarnessError> {
        let dir = tempfile::Builder::new()
            .prefix("poc-harness-")
            .tempdir()
            .map_err(|e| HarnessError::Storage(format!("Failed to create scratch directory: {}", e)))?;
        let path = dir.path().join(name);
        tokio::fs::write(&path, contents)
            .await
            .map_err(|e| HarnessError::Storage(format!("Failed to write scratch copy {}: {}", path.display(), e)))?;
        Ok(Self { dir, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}
