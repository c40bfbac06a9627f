use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use crate::errors::HarnessError;
use crate::models::RunMode;
use crate::pipeline::state::HarnessConfig;
use tracing::{debug, warn};

/// Durable cursors into each mode's batch: "index of the next script to attempt".
///
/// Each cursor is a plain-text file holding one decimal integer. A missing or
/// unreadable file loads as 0, so a damaged cursor restarts the batch instead of
/// failing the run.
#[derive(Debug, Clone)]
pub struct ProgressStore {
    paths: HashMap<RunMode, PathBuf>,
}

impl ProgressStore {
    pub fn new(exploratory: PathBuf, verification: PathBuf) -> Self {
        let mut paths = HashMap::new();
        paths.insert(RunMode::Exploratory, exploratory);
        paths.insert(RunMode::Verification, verification);
        Self { paths }
    }

    pub fn for_config(config: &HarnessConfig) -> Self {
        Self::new(
            config.progress_path(RunMode::Exploratory),
            config.progress_path(RunMode::Verification),
        )
    }

    pub fn path(&self, mode: RunMode) -> &Path {
        &self.paths[&mode]
    }

    pub async fn load(&self, mode: RunMode) -> usize {
        let path = self.path(mode);
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return 0,
            Err(e) => {
                warn!(mode = %mode, path = %path.display(), error = %e, "Progress file unreadable, starting from 0");
                return 0;
            }
        };

        match content.trim().parse::<usize>() {
            Ok(index) => index,
            Err(_) => {
                warn!(mode = %mode, path = %path.display(), "Progress file corrupt, starting from 0");
                0
            }
        }
    }

    /// Persist `index` and make it durable before returning.
    pub async fn save(&self, mode: RunMode, index: usize) -> Result<(), HarnessError> {
        let path = self.path(mode);
        let tmp = path.with_extension("txt.tmp");

        let mut file = tokio::fs::File::create(&tmp).await.map_err(|e| storage_error(&tmp, e))?;
        file.write_all(index.to_string().as_bytes()).await.map_err(|e| storage_error(&tmp, e))?;
        file.sync_all().await.map_err(|e| storage_error(&tmp, e))?;
        drop(file);

        tokio::fs::rename(&tmp, path).await.map_err(|e| storage_error(path, e))?;
        sync_parent(path).await?;
        debug!(mode = %mode, next_index = index, "Progress saved");
        Ok(())
    }
}

/// Flush the directory entry so the rename itself survives a crash.
#[cfg(unix)]
async fn sync_parent(path: &Path) -> Result<(), HarnessError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let handle = tokio::fs::File::open(dir).await.map_err(|e| storage_error(dir, e))?;
    handle.sync_all().await.map_err(|e| storage_error(dir, e))
}

#[cfg(not(unix))]
async fn sync_parent(_path: &Path) -> Result<(), HarnessError> {
    Ok(())
}

fn storage_error(path: &Path, e: std::io::Error) -> HarnessError {
    HarnessError::Storage(format!("Failed to write progress file {}: {}", path.display(), e))
}
