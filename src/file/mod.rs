//! File collaborators for Nimbus.
//!
//! This module provides what the sharing core consumes about files:
//! - File records (owner, soft-delete flag, storage key, size, MIME type)
//! - A [`FileDirectory`] seam resolving file IDs to descriptors
//! - Disk blob storage keyed by storage key

mod directory;
mod metadata;
mod storage;

pub use directory::{FileDirectory, SqlFileDirectory};
pub use metadata::{FileDescriptor, FileRepository, NewFile};
pub use storage::FileStorage;
