use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::error::StorageError;
use super::traits::ObjectStore;
use crate::task::BlobRef;

/// Filesystem-backed versioned object store.
///
/// Objects live at `{base_path}/{object_name}/{version_id}`; `object_name`
/// may contain `/` separators (e.g. `problem-id/1.in`). A `current` marker
/// next to the versions points at the latest write. Writes go through a temp
/// file plus rename so neither a version nor the marker is ever observable
/// half-written.
pub struct FilesystemObjectStore {
    base_path: PathBuf,
}

const CURRENT_MARKER: &str = "current";

fn validate_name(object_name: &str) -> Result<&Path, StorageError> {
    let path = Path::new(object_name);
    let plain = !object_name.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if plain {
        Ok(path)
    } else {
        Err(StorageError::InvalidName(object_name.to_string()))
    }
}

impl FilesystemObjectStore {
    pub async fn new(base_path: PathBuf) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self { base_path })
    }

    fn version_path(&self, blob: &BlobRef) -> Result<PathBuf, StorageError> {
        let name = validate_name(&blob.object_name)?;
        validate_name(&blob.version_id)?;
        // The marker is not a version.
        if blob.version_id == CURRENT_MARKER {
            return Err(StorageError::InvalidName(blob.version_id.clone()));
        }
        Ok(self.base_path.join(name).join(&blob.version_id))
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl ObjectStore for FilesystemObjectStore {
    async fn put(&self, object_name: &str, data: &[u8]) -> Result<BlobRef, StorageError> {
        let blob = BlobRef::new(object_name, uuid::Uuid::new_v4().to_string());
        let version_path = self.version_path(&blob)?;

        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Some(parent) = version_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(&temp_path, &version_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Some(object_dir) = version_path.parent() {
            let marker_temp = self.temp_path();
            fs::write(&marker_temp, blob.version_id.as_bytes()).await?;
            if let Err(e) = fs::rename(&marker_temp, object_dir.join(CURRENT_MARKER)).await {
                let _ = fs::remove_file(&marker_temp).await;
                return Err(e.into());
            }
        }

        Ok(blob)
    }

    async fn get(&self, blob: &BlobRef) -> Result<Vec<u8>, StorageError> {
        let path = self.version_path(blob)?;
        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound {
                object_name: blob.object_name.clone(),
                version_id: blob.version_id.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_current(&self, object_name: &str) -> Result<Vec<u8>, StorageError> {
        let name = validate_name(object_name)?;
        let marker_path = self.base_path.join(name).join(CURRENT_MARKER);
        let version_id = match fs::read_to_string(&marker_path).await {
            Ok(version_id) => version_id.trim().to_string(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound {
                    object_name: object_name.to_string(),
                    version_id: CURRENT_MARKER.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        self.get(&BlobRef::new(object_name, version_id)).await
    }

    async fn exists(&self, blob: &BlobRef) -> Result<bool, StorageError> {
        let path = self.version_path(blob)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn delete(&self, blob: &BlobRef) -> Result<bool, StorageError> {
        let path = self.version_path(blob)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
