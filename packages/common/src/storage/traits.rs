use async_trait::async_trait;

use super::error::StorageError;
use crate::task::BlobRef;

/// Versioned object storage.
///
/// Objects are addressed by name plus an opaque version id; writing the same
/// name again produces a new version and leaves old versions readable. This
/// is what lets in-flight grading tasks keep referring to the exact testcase
/// bytes they were created against, even if the problem is re-uploaded.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store bytes under `object_name`, returning a reference to the newly
    /// created version.
    async fn put(&self, object_name: &str, data: &[u8]) -> Result<BlobRef, StorageError>;

    /// Retrieve the bytes of one exact version.
    async fn get(&self, blob: &BlobRef) -> Result<Vec<u8>, StorageError>;

    /// Retrieve the bytes of the most recently written version of
    /// `object_name`.
    async fn get_current(&self, object_name: &str) -> Result<Vec<u8>, StorageError>;

    /// Check whether the exact version exists.
    async fn exists(&self, blob: &BlobRef) -> Result<bool, StorageError>;

    /// Delete one version. Returns `true` if it existed.
    async fn delete(&self, blob: &BlobRef) -> Result<bool, StorageError>;
}
