//! File records and their repository.

use serde::Serialize;
use uuid::Uuid;

use crate::db::DbPool;
use crate::{NimbusError, Result};

/// Descriptor of a stored file, as the sharing core sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct FileDescriptor {
    /// Opaque unique file ID.
    pub id: String,
    /// The single owner of the file.
    pub owner_id: i64,
    /// Containing folder, if any. Sharing ignores the hierarchy.
    pub parent_folder_id: Option<String>,
    /// Display name.
    pub name: String,
    /// Blob storage key.
    #[serde(skip_serializing)]
    pub storage_key: String,
    /// File size in bytes.
    pub size: i64,
    /// MIME type.
    pub mime_type: String,
    /// Soft-delete flag.
    pub is_deleted: bool,
    /// When the file was created.
    pub created_at: String,
}

/// Data for registering a new file.
#[derive(Debug, Clone)]
pub struct NewFile {
    /// File ID (a fresh UUID unless set explicitly).
    pub id: String,
    /// Owner user ID.
    pub owner_id: i64,
    /// Containing folder.
    pub parent_folder_id: Option<String>,
    /// Display name.
    pub name: String,
    /// Blob storage key.
    pub storage_key: String,
    /// Size in bytes.
    pub size: i64,
    /// MIME type, guessed from the name by default.
    pub mime_type: String,
}

impl NewFile {
    /// Create a new file record with a generated ID.
    pub fn new(
        owner_id: i64,
        name: impl Into<String>,
        storage_key: impl Into<String>,
        size: i64,
    ) -> Self {
        let name = name.into();
        let mime_type = mime_guess::from_path(&name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id,
            parent_folder_id: None,
            name,
            storage_key: storage_key.into(),
            size,
            mime_type,
        }
    }

    /// Use a specific file ID.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Place the file in a folder.
    pub fn with_parent_folder(mut self, folder_id: impl Into<String>) -> Self {
        self.parent_folder_id = Some(folder_id.into());
        self
    }

    /// Override the guessed MIME type.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }
}

/// Repository for file records.
pub struct FileRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FileRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Register a new file.
    pub async fn create(&self, file: &NewFile) -> Result<FileDescriptor> {
        sqlx::query(
            "INSERT INTO files (id, owner_id, parent_folder_id, name, storage_key, size, mime_type)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&file.id)
        .bind(file.owner_id)
        .bind(&file.parent_folder_id)
        .bind(&file.name)
        .bind(&file.storage_key)
        .bind(file.size)
        .bind(&file.mime_type)
        .execute(self.pool)
        .await?;

        self.get_by_id(&file.id)
            .await?
            .ok_or(NimbusError::FileNotFound)
    }

    /// Get a file by ID, including soft-deleted files.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<FileDescriptor>> {
        let file = sqlx::query_as::<_, FileDescriptor>(
            "SELECT id, owner_id, parent_folder_id, name, storage_key, size, mime_type,
                    is_deleted, created_at
             FROM files WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(file)
    }

    /// List the live files of an owner, newest first.
    pub async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<FileDescriptor>> {
        let files = sqlx::query_as::<_, FileDescriptor>(
            "SELECT id, owner_id, parent_folder_id, name, storage_key, size, mime_type,
                    is_deleted, created_at
             FROM files WHERE owner_id = ? AND is_deleted = 0
             ORDER BY created_at DESC, id DESC",
        )
        .bind(owner_id)
        .fetch_all(self.pool)
        .await?;

        Ok(files)
    }

    /// Mark a file as deleted. Returns false if the file does not exist.
    pub async fn soft_delete(&self, id: &str) -> Result<bool> {
        self.set_deleted(id, true).await
    }

    /// Restore a soft-deleted file. Returns false if the file does not exist.
    pub async fn restore(&self, id: &str) -> Result<bool> {
        self.set_deleted(id, false).await
    }

    async fn set_deleted(&self, id: &str, deleted: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE files SET is_deleted = ? WHERE id = ?")
            .bind(deleted)
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Permanently remove a file record.
    pub async fn purge(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    #[test]
    fn test_new_file_guesses_mime() {
        let file = NewFile::new(1, "photo.png", "key.png", 10);
        assert_eq!(file.mime_type, "image/png");

        let file = NewFile::new(1, "mystery", "key.bin", 10);
        assert_eq!(file.mime_type, "application/octet-stream");

        let file = NewFile::new(1, "notes", "key.bin", 10).with_mime_type("text/markdown");
        assert_eq!(file.mime_type, "text/markdown");
    }

    #[test]
    fn test_new_file_generates_ids() {
        let a = NewFile::new(1, "a.txt", "k1.txt", 1);
        let b = NewFile::new(1, "a.txt", "k2.txt", 1);
        assert_ne!(a.id, b.id);
        assert_eq!(a.with_id("f1").id, "f1");
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = FileRepository::new(db.pool());

        let file = repo
            .create(
                &NewFile::new(1, "report.pdf", "abc.pdf", 2048)
                    .with_id("f1")
                    .with_parent_folder("docs"),
            )
            .await
            .unwrap();

        assert_eq!(file.id, "f1");
        assert_eq!(file.owner_id, 1);
        assert_eq!(file.parent_folder_id.as_deref(), Some("docs"));
        assert_eq!(file.mime_type, "application/pdf");
        assert!(!file.is_deleted);

        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_soft_delete_and_restore() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = FileRepository::new(db.pool());
        repo.create(&NewFile::new(1, "a.txt", "a.txt", 1).with_id("f1"))
            .await
            .unwrap();

        assert!(repo.soft_delete("f1").await.unwrap());
        assert!(repo.get_by_id("f1").await.unwrap().unwrap().is_deleted);
        assert!(repo.list_by_owner(1).await.unwrap().is_empty());

        assert!(repo.restore("f1").await.unwrap());
        assert!(!repo.get_by_id("f1").await.unwrap().unwrap().is_deleted);
        assert_eq!(repo.list_by_owner(1).await.unwrap().len(), 1);

        assert!(!repo.soft_delete("missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_purge() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = FileRepository::new(db.pool());
        repo.create(&NewFile::new(1, "a.txt", "a.txt", 1).with_id("f1"))
            .await
            .unwrap();

        assert!(repo.purge("f1").await.unwrap());
        assert!(repo.get_by_id("f1").await.unwrap().is_none());
    }
}
