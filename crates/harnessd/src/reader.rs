//! Resource reader abstraction.
//!
//! Configuration, task datasets and instruction fragments are all read
//! through `ResourceReader`, so tests can count reads or inject failures
//! without touching the filesystem layout.

use async_trait::async_trait;
use std::io;
use std::path::Path;

#[async_trait]
pub trait ResourceReader: Send + Sync {
    /// Read a whole text resource
    async fn read_to_string(&self, path: &Path) -> io::Result<String>;
}

/// Reads resources from the local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct FsReader;

#[async_trait]
impl ResourceReader for FsReader {
    async fn read_to_string(&self, path: &Path) -> io::Result<String> {
        tokio::fs::read_to_string(path).await
    }
}
