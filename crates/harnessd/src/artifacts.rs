//! Raw result artifacts.
//!
//! Every submitted report is written verbatim under the output directory
//! before anything tries to parse it. Names are fresh v4 UUIDs and files are
//! opened with `create_new`, so an artifact is never overwritten.

use crate::scope::IoScope;
use harness_common::{HarnessError, Result};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use uuid::Uuid;

const ARTIFACT_EXTENSION: &str = "xml";

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Persist `text` under a newly generated name and return that name
    pub async fn write_new(&self, text: &str, scope: &IoScope) -> Result<String> {
        let name = format!("{}.{}", Uuid::new_v4(), ARTIFACT_EXTENSION);
        let path = self.path_of(&name);

        scope
            .run("artifact write", async {
                fs::create_dir_all(&self.dir).await?;
                let mut file = OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(&path)
                    .await?;
                file.write_all(text.as_bytes()).await?;
                file.sync_all().await?;
                Ok::<_, HarnessError>(())
            })
            .await
            .map_err(|e| {
                warn!("Failed to write artifact {}: {}", path.display(), e);
                e
            })?;

        info!("Stored result artifact {}", name);
        Ok(name)
    }

    pub async fn read(&self, name: &str, scope: &IoScope) -> Result<String> {
        let path = self.path_of(name);
        scope
            .run("artifact read", async {
                Ok::<_, HarnessError>(fs::read_to_string(&path).await?)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_new_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path().join("output"));
        let scope = IoScope::unbounded();

        let name = store.write_new("<r/>", &scope).await.unwrap();
        assert!(name.ends_with(".xml"));
        assert_eq!(store.read(&name, &scope).await.unwrap(), "<r/>");
    }

    #[tokio::test]
    async fn test_names_are_unique() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        let scope = IoScope::unbounded();

        let a = store.write_new("same", &scope).await.unwrap();
        let b = store.write_new("same", &scope).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_unwritable_dir_is_io_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let store = ArtifactStore::new(blocker.join("sub"));

        let err = store
            .write_new("text", &IoScope::unbounded())
            .await
            .unwrap_err();
        assert!(err.io_kind().is_some());
    }
}
