//! Blob storage for Nimbus.
//!
//! File contents live on disk under an opaque storage key. The file record in
//! the directory only carries the key; this module turns a key into bytes.

use std::io;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::{NimbusError, Result};

/// Disk-backed blob store.
///
/// Blobs are stored in a sharded directory structure:
/// ```text
/// {base_path}/
/// ├── ab/
/// │   └── ab12cd34-5678-90ab-cdef-123456789012.txt
/// └── cd/
///     └── cd90ab12-3456-7890-abcd-ef1234567890.bin
/// ```
#[derive(Debug, Clone)]
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a new FileStorage with the given base path.
    ///
    /// The base directory will be created if it doesn't exist.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path)?;

        Ok(Self { base_path })
    }

    /// Get the base path of this storage.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Store content under a freshly generated key and return the key.
    pub async fn save(&self, content: &[u8], original_name: &str) -> Result<String> {
        let key = Self::generate_key(original_name);
        self.save_with_key(content, &key).await?;
        Ok(key)
    }

    /// Store content under a caller-chosen key.
    pub async fn save_with_key(&self, content: &[u8], key: &str) -> Result<()> {
        let path = self.blob_path(key)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;

        Ok(())
    }

    /// Read the blob stored under `key`.
    pub async fn load(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.blob_path(key)?;

        match tokio::fs::read(&path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(NimbusError::FileNotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a blob.
    ///
    /// Returns `true` if the blob was deleted, `false` if it didn't exist.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let path = self.blob_path(key)?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Check if a blob exists.
    pub async fn exists(&self, key: &str) -> bool {
        match self.blob_path(key) {
            Ok(path) => tokio::fs::try_exists(path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Resolve a key to its on-disk path: `{base_path}/{shard}/{key}`.
    fn blob_path(&self, key: &str) -> Result<PathBuf> {
        if !Self::is_valid_key(key) {
            return Err(NimbusError::Validation(format!("invalid storage key: {key:?}")));
        }
        Ok(self.base_path.join(&key[..2]).join(key))
    }

    /// Keys are flat names: ASCII alphanumerics, `-`, `_` and `.`, never
    /// starting with a dot, at least two characters.
    fn is_valid_key(key: &str) -> bool {
        key.len() >= 2
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    }

    /// Extract the file extension from a filename.
    ///
    /// Returns "bin" if no usable extension is found.
    fn extract_extension(filename: &str) -> &str {
        Path::new(filename)
            .extension()
            .and_then(|s| s.to_str())
            .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or("bin")
    }

    /// Generate a new UUID-based storage key keeping the original extension.
    pub fn generate_key(original_name: &str) -> String {
        let ext = Self::extract_extension(original_name);
        format!("{}.{ext}", Uuid::new_v4())
    }
}
