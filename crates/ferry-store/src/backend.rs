//! Asset storage backend with BLAKE3 content addressing.
//!
//! Media binary payloads live in a flat uploads directory, addressed by
//! basename (the manifest's `file_name`). The backend abstracts the
//! filesystem so stores and tests can swap it out.

use async_trait::async_trait;
use ferry_core::Result;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Storage backend trait for asset binary payloads.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Write data under the given basename.
    async fn write(&self, name: &str, data: &[u8]) -> Result<()>;

    /// Read data stored under the given basename.
    async fn read(&self, name: &str) -> Result<Vec<u8>>;

    /// Delete data stored under the given basename.
    async fn delete(&self, name: &str) -> Result<()>;

    /// Check whether data exists under the given basename.
    async fn exists(&self, name: &str) -> Result<bool>;
}

/// Filesystem storage backend over one uploads directory.
#[derive(Debug)]
pub struct FilesystemBackend {
    base_path: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend rooted at the given directory.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn full_path(&self, name: &str) -> PathBuf {
        self.base_path.join(name)
    }

    /// Validate that the backend can write, read, and delete files.
    ///
    /// Performs a full round-trip through the trait methods at startup to
    /// catch filesystem issues (permission errors, missing mount) before
    /// any migration work runs.
    pub async fn validate(&self) -> std::result::Result<(), String> {
        const TEST_FILE: &str = ".health-check";
        let data = b"storage-health-check";

        self.write(TEST_FILE, data)
            .await
            .map_err(|e| format!("write({}): {}", TEST_FILE, e))?;
        let read_data = self
            .read(TEST_FILE)
            .await
            .map_err(|e| format!("read({}): {}", TEST_FILE, e))?;
        if read_data != data {
            return Err("read-back mismatch".to_string());
        }
        self.delete(TEST_FILE)
            .await
            .map_err(|e| format!("delete({}): {}", TEST_FILE, e))?;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for FilesystemBackend {
    async fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(name);
        debug!(name = %name, size = data.len(), "asset_backend: write");

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                warn!(parent = %parent.display(), error = %e, "asset_backend: create_dir_all failed");
                e
            })?;
        }

        // Atomic write: temp file + rename
        let temp_path = full_path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &full_path).await.map_err(|e| {
            warn!(from = %temp_path.display(), to = %full_path.display(), error = %e, "asset_backend: rename failed");
            e
        })?;

        Ok(())
    }

    async fn read(&self, name: &str) -> Result<Vec<u8>> {
        Ok(fs::read(self.full_path(name)).await?)
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let full_path = self.full_path(name);
        if fs::try_exists(&full_path).await? {
            fs::remove_file(full_path).await?;
        }
        Ok(())
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        Ok(fs::try_exists(self.full_path(name)).await?)
    }
}

/// Compute the BLAKE3 content hash of data with a "blake3:" prefix.
///
/// Returns a string in the format `blake3:{64-char-hex}`. This is the
/// content-addressing identity media assets are deduplicated by.
pub fn compute_content_hash(data: &[u8]) -> String {
    let hash = blake3::hash(data);
    format!("blake3:{}", hash.to_hex())
}
