use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common::storage::{
    ImageBucket, ObjectEntry, PasteStore, PublicUrlLayout, StorageError, Subscription,
};
use common::path::validate_object_path;
use common::{ChangeEvent, NewPaste, Paste, RoomCode};
use dashmap::DashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::hub::ChangeHub;

/// Paste store held in process memory, with a broadcast change feed.
///
/// Every mutation is published to the room's subscribers after it commits.
/// Deletes publish one event per removed row, like a row-level database feed.
pub struct MemoryPasteStore {
    rows: RwLock<Vec<Paste>>,
    hub: ChangeHub,
    last_created_at: Mutex<DateTime<Utc>>,
}

impl MemoryPasteStore {
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            hub: ChangeHub::new(channel_capacity),
            last_created_at: Mutex::new(DateTime::<Utc>::MIN_UTC),
        }
    }

    pub fn hub(&self) -> &ChangeHub {
        &self.hub
    }

    /// Strictly increasing creation timestamps, so insert order is the sort order.
    fn next_created_at(&self) -> DateTime<Utc> {
        let mut last = self
            .last_created_at
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let now = Utc::now();
        let next = if now > *last {
            now
        } else {
            *last + Duration::microseconds(1)
        };
        *last = next;
        next
    }
}

impl Default for MemoryPasteStore {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl PasteStore for MemoryPasteStore {
    async fn list(&self, room: &RoomCode) -> Result<Vec<Paste>, StorageError> {
        let rows = self.rows.read().await;
        let mut pastes: Vec<Paste> = rows
            .iter()
            .filter(|p| &p.room_code == room)
            .cloned()
            .collect();
        pastes.sort_by(Paste::newest_first);
        Ok(pastes)
    }

    async fn insert(&self, paste: NewPaste) -> Result<Paste, StorageError> {
        let created = {
            let mut rows = self.rows.write().await;
            let created = Paste {
                id: Uuid::now_v7(),
                room_code: paste.room_code,
                content: paste.content,
                kind: paste.kind,
                created_at: self.next_created_at(),
            };
            rows.push(created.clone());
            created
        };

        self.hub
            .publish(&created.room_code, ChangeEvent::Inserted(created.clone()));
        Ok(created)
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<(), StorageError> {
        let removed = {
            let mut rows = self.rows.write().await;
            rows.iter()
                .position(|p| p.id == id)
                .map(|index| rows.remove(index))
        };

        if let Some(removed) = removed {
            self.hub.publish(&removed.room_code, ChangeEvent::Deleted);
        }
        Ok(())
    }

    async fn delete_by_room(&self, room: &RoomCode) -> Result<u64, StorageError> {
        let removed = {
            let mut rows = self.rows.write().await;
            let before = rows.len();
            rows.retain(|p| &p.room_code != room);
            (before - rows.len()) as u64
        };

        for _ in 0..removed {
            self.hub.publish(room, ChangeEvent::Deleted);
        }
        Ok(removed)
    }

    async fn subscribe(&self, room: &RoomCode) -> Result<Subscription, StorageError> {
        Ok(self.hub.subscribe(room))
    }
}

struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
}

/// Image bucket held in process memory.
pub struct MemoryImageBucket {
    objects: DashMap<String, StoredObject>,
    layout: PublicUrlLayout,
}

impl MemoryImageBucket {
    pub fn new(layout: PublicUrlLayout) -> Self {
        Self {
            objects: DashMap::new(),
            layout,
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.objects.contains_key(path)
    }

    pub fn content_type(&self, path: &str) -> Option<String> {
        self.objects.get(path).map(|o| o.content_type.clone())
    }
}

fn checked_path(path: &str) -> Result<&str, StorageError> {
    validate_object_path(path).map_err(|msg| StorageError::InvalidPath(msg.to_string()))
}

#[async_trait]
impl ImageBucket for MemoryImageBucket {
    async fn put(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<(), StorageError> {
        let path = checked_path(path)?;
        self.objects.insert(
            path.to_string(),
            StoredObject {
                bytes: bytes.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let path = checked_path(path)?;
        self.objects
            .get(path)
            .map(|o| o.bytes.clone())
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>, StorageError> {
        let prefix = checked_path(prefix)?;
        let dir = format!("{prefix}/");
        let mut entries: Vec<ObjectEntry> = self
            .objects
            .iter()
            .filter_map(|entry| {
                let name = entry.key().strip_prefix(&dir)?;
                (!name.contains('/')).then(|| ObjectEntry {
                    name: name.to_string(),
                })
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn remove(&self, paths: &[String]) -> Result<(), StorageError> {
        for path in paths {
            let path = checked_path(path)?;
            self.objects.remove(path);
        }
        Ok(())
    }

    fn layout(&self) -> &PublicUrlLayout {
        &self.layout
    }
}
