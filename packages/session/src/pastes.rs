use std::sync::Arc;
use std::time::Duration;

use common::config::PasteConfig;
use common::storage::PasteStore;
use common::{NewPaste, Paste, RoomCode};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::{RemoteError, ValidationError, bounded};

/// Thin client over a [`PasteStore`] that bounds every call and checks text
/// before it is sent.
#[derive(Clone)]
pub struct PasteStoreClient {
    store: Arc<dyn PasteStore>,
    max_text_chars: usize,
    timeout: Duration,
}

impl PasteStoreClient {
    pub fn new(store: Arc<dyn PasteStore>, config: &PasteConfig, timeout: Duration) -> Self {
        Self {
            store,
            max_text_chars: config.max_text_chars,
            timeout,
        }
    }

    pub(crate) fn store(&self) -> &Arc<dyn PasteStore> {
        &self.store
    }

    /// Trim `raw` and check it is a storable text paste.
    pub fn prepare_text(&self, raw: &str) -> Result<String, ValidationError> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyPaste);
        }
        let chars = text.chars().count();
        if chars > self.max_text_chars {
            return Err(ValidationError::TextTooLong {
                chars,
                limit: self.max_text_chars,
            });
        }
        Ok(text.to_string())
    }

    /// All pastes in `room`, newest first.
    #[instrument(skip(self), fields(room = %room))]
    pub async fn list(&self, room: &RoomCode) -> Result<Vec<Paste>, RemoteError> {
        let mut pastes = bounded(self.timeout, self.store.list(room)).await?;
        pastes.retain(|p| &p.room_code == room);
        pastes.sort_by(Paste::newest_first);
        debug!(count = pastes.len(), "Fetched pastes");
        Ok(pastes)
    }

    #[instrument(skip(self, new_paste), fields(room = %new_paste.room_code, kind = %new_paste.kind))]
    pub async fn insert(&self, new_paste: NewPaste) -> Result<Paste, RemoteError> {
        let created = bounded(self.timeout, self.store.insert(new_paste)).await?;
        debug!(id = %created.id, "Inserted paste");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn delete_by_id(&self, id: Uuid) -> Result<(), RemoteError> {
        bounded(self.timeout, self.store.delete_by_id(id)).await
    }

    #[instrument(skip(self), fields(room = %room))]
    pub async fn delete_by_room(&self, room: &RoomCode) -> Result<u64, RemoteError> {
        let removed = bounded(self.timeout, self.store.delete_by_room(room)).await?;
        debug!(removed, "Cleared room");
        Ok(removed)
    }
}
