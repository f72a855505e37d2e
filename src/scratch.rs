//! Per-run scratch storage for downloads, staged uploads, and audio.
//!
//! A [`ScratchWorkspace`] is acquired at the start of an ingestion run and
//! removed when dropped, on every exit path. Nothing in it survives the run.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use uuid::Uuid;

use crate::types::RagError;

/// Temporary directory scoped to one ingestion run.
#[derive(Debug)]
pub struct ScratchWorkspace {
    dir: TempDir,
}

impl ScratchWorkspace {
    pub fn create() -> Result<Self, RagError> {
        let dir = TempDir::with_prefix("answersmith-").map_err(|err| RagError::Io(err.to_string()))?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Creates (if needed) and returns a named subdirectory.
    pub async fn subdir(&self, name: &str) -> Result<PathBuf, RagError> {
        let path = self.dir.path().join(name);
        tokio::fs::create_dir_all(&path).await?;
        Ok(path)
    }

    /// Collision-free file path for a staged artifact.
    pub fn unique_path(&self, prefix: &str, extension: &str) -> PathBuf {
        self.dir
            .path()
            .join(format!("{prefix}-{}.{extension}", Uuid::new_v4()))
    }
}
