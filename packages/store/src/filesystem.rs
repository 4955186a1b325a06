use std::path::PathBuf;

use async_trait::async_trait;
use common::path::validate_object_path;
use common::storage::{ImageBucket, ObjectEntry, PublicUrlLayout, StorageError};
use tokio::fs;
use tracing::debug;

/// Filesystem-backed image bucket.
///
/// Objects live at `{base_path}/{object path}`, so a room's images share the
/// directory `{base_path}/{room_code}`. Writes land in `{base_path}/.tmp` first
/// and are renamed into place.
pub struct FilesystemImageBucket {
    base_path: PathBuf,
    max_size: u64,
    layout: PublicUrlLayout,
}

impl FilesystemImageBucket {
    /// Create a new filesystem bucket, creating its directories if needed.
    pub async fn new(
        base_path: PathBuf,
        max_size: u64,
        layout: PublicUrlLayout,
    ) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            max_size,
            layout,
        })
    }

    /// Filesystem location of a validated object path.
    fn object_file(&self, path: &str) -> Result<PathBuf, StorageError> {
        let path =
            validate_object_path(path).map_err(|msg| StorageError::InvalidPath(msg.to_string()))?;
        Ok(self.base_path.join(path))
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl ImageBucket for FilesystemImageBucket {
    async fn put(
        &self,
        path: &str,
        bytes: &[u8],
        _content_type: &str,
    ) -> Result<(), StorageError> {
        if bytes.len() as u64 > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: bytes.len() as u64,
                limit: self.max_size,
            });
        }

        let object_file = self.object_file(path)?;
        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, bytes).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Some(parent) = object_file.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(&temp_path, &object_file).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        debug!(path, size = bytes.len(), "Stored object");
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let object_file = self.object_file(path)?;
        match fs::read(&object_file).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>, StorageError> {
        let dir = self.object_file(prefix)?;
        let mut read_dir = match fs::read_dir(&dir).await {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            entries.push(ObjectEntry { name });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn remove(&self, paths: &[String]) -> Result<(), StorageError> {
        let files = paths
            .iter()
            .map(|p| self.object_file(p))
            .collect::<Result<Vec<_>, _>>()?;

        for file in files {
            match fs::remove_file(&file).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn layout(&self) -> &PublicUrlLayout {
        &self.layout
    }
}
