use std::path::{Path, PathBuf};
use crate::errors::HarnessError;
use crate::models::{Batch, PocScript};
use crate::pipeline::batch::load_batch;
use tracing::info;

/// Directory holding byte-exact copies of every PoC that produced a finding.
#[derive(Debug, Clone)]
pub struct SuccessArchive {
    dir: PathBuf,
    extension: String,
}

impl SuccessArchive {
    pub fn new(dir: impl Into<PathBuf>, extension: &str) -> Self {
        Self { dir: dir.into(), extension: extension.to_string() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the archive directory. Failure here is fatal at startup.
    pub async fn ensure(&self) -> Result<(), HarnessError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            HarnessError::Storage(format!("Failed to create success archive {}: {}", self.dir.display(), e))
        })
    }

    /// Copy `script` into the archive under its own name.
    pub async fn store(&self, script: &PocScript) -> Result<PathBuf, HarnessError> {
        let dest = self.dir.join(&script.name);
        if dest == script.path {
            return Ok(dest);
        }
        tokio::fs::copy(&script.path, &dest).await.map_err(|e| {
            HarnessError::Storage(format!("Failed to archive {} into {}: {}", script.name, self.dir.display(), e))
        })?;
        info!(script = %script.name, archive = %self.dir.display(), "PoC archived");
        Ok(dest)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.dir.join(name).is_file()
    }

    /// Current archive contents as a batch, the source for re-verification.
    pub fn list(&self) -> Result<Batch, HarnessError> {
        load_batch(&self.dir, &self.extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_store_is_byte_copy() {
        let dir = TempDir::new().unwrap();
        let poc_dir = dir.path().join("POC");
        std::fs::create_dir(&poc_dir).unwrap();
        let bytes = b"data = {\"pwd\": \"\xe4\xb8\xad\"}\n";
        std::fs::write(poc_dir.join("login_1.py"), bytes).unwrap();

        let archive = SuccessArchive::new(poc_dir.join("success"), "py");
        archive.ensure().await.unwrap();
        let script = PocScript::from_path(&poc_dir.join("login_1.py")).unwrap();
        let dest = archive.store(&script).await.unwrap();

        assert_eq!(std::fs::read(dest).unwrap(), bytes);
        assert!(archive.contains("login_1.py"));
        assert_eq!(archive.list().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ensure_fails_when_parent_is_a_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("POC"), "not a dir").unwrap();
        let archive = SuccessArchive::new(dir.path().join("POC/success"), "py");
        assert!(matches!(archive.ensure().await, Err(HarnessError::Storage(_))));
    }

    #[tokio::test]
    async fn test_list_excludes_progress_file() {
        let dir = TempDir::new().unwrap();
        let archive = SuccessArchive::new(dir.path(), "py");
        std::fs::write(dir.path().join("progress.txt"), "3").unwrap();
        std::fs::write(dir.path().join("a_1.py"), "x").unwrap();
        assert_eq!(archive.list().unwrap().len(), 1);
    }
}
