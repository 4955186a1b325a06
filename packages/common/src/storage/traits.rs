use async_trait::async_trait;
use uuid::Uuid;

use super::error::StorageError;
use super::subscription::Subscription;
use super::url::PublicUrlLayout;
use crate::paste::{NewPaste, Paste, RoomCode};

/// The shared, append/delete-only collection of pastes.
///
/// Per-row atomicity is all the engine relies on; nothing here is transactional
/// across calls.
#[async_trait]
pub trait PasteStore: Send + Sync {
    /// Every paste in the room, newest `created_at` first.
    async fn list(&self, room: &RoomCode) -> Result<Vec<Paste>, StorageError>;

    /// Create a paste. The store assigns `id` and `created_at`.
    async fn insert(&self, paste: NewPaste) -> Result<Paste, StorageError>;

    /// Delete one paste. Deleting an id that no longer exists is not an error.
    async fn delete_by_id(&self, id: Uuid) -> Result<(), StorageError>;

    /// Delete every paste in the room and return how many rows went away.
    async fn delete_by_room(&self, room: &RoomCode) -> Result<u64, StorageError>;

    /// Start a change feed for the room.
    ///
    /// The feed is live when this returns: any mutation committed afterwards is
    /// delivered.
    async fn subscribe(&self, room: &RoomCode) -> Result<Subscription, StorageError>;
}

/// An object listed under a prefix. `name` is relative to the prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub name: String,
}

/// Binary object storage for image blobs, namespaced by room.
#[async_trait]
pub trait ImageBucket: Send + Sync {
    /// Store bytes at `path`.
    async fn put(&self, path: &str, bytes: &[u8], content_type: &str)
    -> Result<(), StorageError>;

    /// Retrieve all bytes of the object at `path`.
    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Objects directly under `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>, StorageError>;

    /// Delete objects in one batch. Paths that do not exist are skipped.
    async fn remove(&self, paths: &[String]) -> Result<(), StorageError>;

    /// How public URLs map to object paths for this bucket.
    fn layout(&self) -> &PublicUrlLayout;

    /// The publicly addressable URL of the object at `path`.
    fn public_url(&self, path: &str) -> String {
        self.layout().url_for(path)
    }

    /// Inverse of [`ImageBucket::public_url`]. `None` for foreign or malformed URLs.
    fn object_path(&self, url: &str) -> Option<String> {
        self.layout().path_of(url)
    }
}
