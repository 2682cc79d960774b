//! On-disk result store: one `result.json` per phase directory

use crate::core::FitResult;
use crate::persistence::{ResultKey, ResultStore};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

const RESULT_FILE: &str = "result.json";

/// Stores results under `<root>/<pipeline>/<settings tag>/<phase>/result.json`
#[derive(Debug, Clone)]
pub struct DirectoryResultStore {
    root: PathBuf,
}

impl DirectoryResultStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of the result file for `key`
    pub fn result_path(&self, key: &ResultKey) -> PathBuf {
        self.root.join(key.relative_dir()).join(RESULT_FILE)
    }
}

#[async_trait::async_trait]
impl ResultStore for DirectoryResultStore {
    async fn load(&self, key: &ResultKey) -> Result<Option<FitResult>> {
        let path = self.result_path(key);
        if !tokio::fs::try_exists(&path)
            .await
            .with_context(|| format!("Failed to check {}", path.display()))?
        {
            return Ok(None);
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let result = serde_json::from_str(&content)
            .with_context(|| format!("Corrupt result file {}", path.display()))?;
        debug!("Loaded stored result from {}", path.display());
        Ok(Some(result))
    }

    async fn save(&self, key: &ResultKey, result: &FitResult) -> Result<()> {
        let path = self.result_path(key);
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        // Write then rename so an interrupted save never leaves half a file
        let staging = dir.join(format!("{}.tmp", RESULT_FILE));
        let json = serde_json::to_string_pretty(result)?;
        tokio::fs::write(&staging, json)
            .await
            .with_context(|| format!("Failed to write {}", staging.display()))?;
        tokio::fs::rename(&staging, &path)
            .await
            .with_context(|| format!("Failed to move result into {}", path.display()))?;

        debug!("Saved result to {}", path.display());
        Ok(())
    }
}
