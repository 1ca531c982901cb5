//! Content source — the narrow seam between the engine and whatever stores
//! artifact bytes. The engine never knows the storage technology; it only
//! asks for the bytes behind a storage path.

use crate::{PramanaError, PramanaResult};
use async_trait::async_trait;
use std::path::PathBuf;

/// Fetches artifact content by storage path
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch(&self, storage_path: &str) -> PramanaResult<Vec<u8>>;
}

/// Filesystem-backed content source. Paths are resolved relative to a root
/// directory so callers cannot reach outside the artifact store.
pub struct FsContentSource {
    root: PathBuf,
}

impl FsContentSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ContentSource for FsContentSource {
    async fn fetch(&self, storage_path: &str) -> PramanaResult<Vec<u8>> {
        if storage_path.contains("..") {
            return Err(PramanaError::Retrieval(format!(
                "refusing path with parent components: {}",
                storage_path
            )));
        }
        let full = self.root.join(storage_path);
        tokio::fs::read(&full)
            .await
            .map_err(|e| PramanaError::Retrieval(format!("{}: {}", full.display(), e)))
    }
}
