// services/src/storage_engine/blob_store.rs
//! Content storage behind an opaque locator. The locator is generated
//! here (UUID plus a sanitized extension) and never derived from the
//! client-supplied filename, so stored names cannot collide and cannot
//! carry path components.
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use models::errors::{ApiError, ApiResult};

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` and returns the generated opaque locator.
    async fn write(&self, original_name: &str, bytes: &[u8]) -> ApiResult<String>;
    async fn read(&self, locator: &str) -> ApiResult<Vec<u8>>;
    async fn remove(&self, locator: &str) -> ApiResult<()>;
}

/// Keeps at most 8 alphanumeric characters of the original extension so
/// downloads keep a recognizable suffix without trusting client input.
fn opaque_name(original_name: &str) -> String {
    let ext: String = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(8)
        .collect::<String>()
        .to_ascii_lowercase();
    if ext.is_empty() {
        Uuid::new_v4().simple().to_string()
    } else {
        format!("{}.{}", Uuid::new_v4().simple(), ext)
    }
}

#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    pub async fn new(root: impl AsRef<Path>) -> ApiResult<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| ApiError::storage(format!("Failed to create upload dir: {}", e)))?;
        Ok(DiskStore { root })
    }

    fn path_for(&self, locator: &str) -> ApiResult<PathBuf> {
        // locators are generated by us; anything with path structure is bogus
        if locator.is_empty()
            || locator.contains('/')
            || locator.contains('\\')
            || locator.contains("..")
        {
            return Err(ApiError::validation("Invalid file locator"));
        }
        Ok(self.root.join(locator))
    }
}

#[async_trait]
impl BlobStore for DiskStore {
    async fn write(&self, original_name: &str, bytes: &[u8]) -> ApiResult<String> {
        let locator = opaque_name(original_name);
        let path = self.path_for(&locator)?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| ApiError::storage(format!("Failed to write content: {}", e)))?;
        Ok(locator)
    }

    async fn read(&self, locator: &str) -> ApiResult<Vec<u8>> {
        let path = self.path_for(locator)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ApiError::not_found("Stored content not found"),
                _ => ApiError::storage(format!("Failed to read content: {}", e)),
            })
    }

    async fn remove(&self, locator: &str) -> ApiResult<()> {
        let path = self.path_for(locator)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            // already gone is fine for compensating cleanup
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ApiError::storage(format!("Failed to remove content: {}", e))),
        }
    }
}

/// In-memory blob store for tests and the `memory` backend.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        MemoryBlobStore::default()
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn write(&self, original_name: &str, bytes: &[u8]) -> ApiResult<String> {
        let locator = opaque_name(original_name);
        self.blobs
            .write()
            .await
            .insert(locator.clone(), bytes.to_vec());
        Ok(locator)
    }

    async fn read(&self, locator: &str) -> ApiResult<Vec<u8>> {
        self.blobs
            .read()
            .await
            .get(locator)
            .cloned()
            .ok_or_else(|| ApiError::not_found("Stored content not found"))
    }

    async fn remove(&self, locator: &str) -> ApiResult<()> {
        self.blobs.write().await.remove(locator);
        Ok(())
    }
}
