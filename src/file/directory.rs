//! File directory collaborator.

use async_trait::async_trait;

use super::metadata::{FileDescriptor, FileRepository};
use crate::db::DbPool;
use crate::Result;

/// Resolves file identifiers to descriptors.
///
/// Descriptors are returned regardless of the soft-delete flag; callers
/// decide how deleted files behave.
#[async_trait]
pub trait FileDirectory: Send + Sync {
    /// Look up a file, optionally restricted to a given owner.
    ///
    /// With `owner_id` set, a file owned by someone else is reported as
    /// absent, exactly like a missing file.
    async fn get_file_descriptor(
        &self,
        file_id: &str,
        owner_id: Option<i64>,
    ) -> Result<Option<FileDescriptor>>;
}

/// File directory backed by the `files` table.
#[derive(Debug, Clone)]
pub struct SqlFileDirectory {
    pool: DbPool,
}

impl SqlFileDirectory {
    /// Create a directory over the given pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FileDirectory for SqlFileDirectory {
    async fn get_file_descriptor(
        &self,
        file_id: &str,
        owner_id: Option<i64>,
    ) -> Result<Option<FileDescriptor>> {
        let file = FileRepository::new(&self.pool).get_by_id(file_id).await?;
        Ok(file.filter(|f| owner_id.map_or(true, |owner| f.owner_id == owner)))
    }
}
