use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::RoomCode;
use common::config::ImageConfig;
use common::path::file_extension;
use common::storage::ImageBucket;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::error::{DisplayError, RemoteError, ValidationError, bounded};

const DEFAULT_EXTENSION: &str = "png";
const SUFFIX_LEN: usize = 8;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// A local image picked for upload.
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, guessing its content type from the extension.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self {
            name,
            content_type,
            bytes,
        })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Outcome of checking an [`ImageFile`] against the upload rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validity {
    Valid,
    Invalid(ValidationError),
}

impl Validity {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn into_result(self) -> Result<(), ValidationError> {
        match self {
            Self::Valid => Ok(()),
            Self::Invalid(e) => Err(e),
        }
    }
}

#[derive(Debug, Error)]
pub enum ImageError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("invalid image reference: {0}")]
    InvalidReference(String),
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// Ties image blobs to the pastes that reference them.
///
/// Blobs for a room live under `{room}/`, so clearing a room can remove every
/// image it ever stored, including ones no paste points at anymore.
#[derive(Clone)]
pub struct ImageCoordinator {
    bucket: Arc<dyn ImageBucket>,
    max_size: u64,
    timeout: Duration,
}

impl ImageCoordinator {
    pub fn new(bucket: Arc<dyn ImageBucket>, config: &ImageConfig, timeout: Duration) -> Self {
        Self {
            bucket,
            max_size: config.max_size,
            timeout,
        }
    }

    /// Type is checked before size. A file of exactly `max_size` bytes is accepted.
    pub fn validate(&self, file: &ImageFile) -> Validity {
        if !file.content_type.starts_with("image/") {
            return Validity::Invalid(ValidationError::NotAnImage {
                content_type: file.content_type.clone(),
            });
        }
        if file.size() > self.max_size {
            return Validity::Invalid(ValidationError::TooLarge {
                size: file.size(),
                limit: self.max_size,
            });
        }
        Validity::Valid
    }

    /// Store `file` under the room's prefix and return its public URL.
    #[instrument(skip(self, file), fields(room = %room, name = %file.name, size = file.size()))]
    pub async fn upload(&self, file: &ImageFile, room: &RoomCode) -> Result<String, ImageError> {
        self.validate(file).into_result()?;

        let path = new_object_path(room, &file.name);
        bounded(
            self.timeout,
            self.bucket.put(&path, &file.bytes, &file.content_type),
        )
        .await?;

        debug!(path, "Uploaded image");
        Ok(self.bucket.public_url(&path))
    }

    /// Object path behind a public URL issued by this bucket.
    pub fn object_path(&self, url: &str) -> Result<String, ImageError> {
        self.bucket
            .object_path(url)
            .ok_or_else(|| ImageError::InvalidReference(url.to_string()))
    }

    /// Remove the blob behind `url`.
    #[instrument(skip(self))]
    pub async fn delete_by_url(&self, url: &str) -> Result<(), ImageError> {
        let path = self.object_path(url)?;
        bounded(self.timeout, self.bucket.remove(std::slice::from_ref(&path))).await?;
        debug!(path, "Deleted image");
        Ok(())
    }

    /// Remove every blob stored for `room`. Returns how many were removed.
    #[instrument(skip(self), fields(room = %room))]
    pub async fn delete_all_for_room(&self, room: &RoomCode) -> Result<usize, ImageError> {
        let entries = bounded(self.timeout, self.bucket.list(room.as_str())).await?;
        if entries.is_empty() {
            return Ok(0);
        }

        let paths: Vec<String> = entries
            .iter()
            .map(|entry| format!("{room}/{}", entry.name))
            .collect();
        bounded(self.timeout, self.bucket.remove(&paths)).await?;

        debug!(count = paths.len(), "Deleted room images");
        Ok(paths.len())
    }

    /// Fetch the bytes behind an image paste for display.
    pub async fn resolve(&self, url: &str) -> Result<Vec<u8>, DisplayError> {
        let path = self
            .bucket
            .object_path(url)
            .ok_or_else(|| DisplayError::InvalidReference {
                url: url.to_string(),
            })?;
        bounded(self.timeout, self.bucket.get(&path))
            .await
            .map_err(|source| DisplayError::Unavailable {
                url: url.to_string(),
                source,
            })
    }
}

/// `{room}/{unix millis}-{8 base36 chars}.{ext}`; the extension falls back to png.
pub(crate) fn new_object_path(room: &RoomCode, file_name: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let mut rng = rand::rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect();
    let ext = file_extension(file_name).unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
    format!("{room}/{millis}-{suffix}.{ext}")
}
