use std::sync::Arc;

use common::{ChangeEvent, NewPaste, Paste, RoomCode};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::clipboard::Clipboard;
use crate::error::{AddPhase, DisplayError, SessionError};
use crate::export::{ExportFormat, ExportOrder, Exported};
use crate::feed::{ChangeFeed, ChangeFeedSubscriber};
use crate::images::{ImageCoordinator, ImageError, ImageFile};
use crate::pastes::PasteStoreClient;

/// Content for a new paste.
#[derive(Debug, Clone)]
pub enum PasteInput {
    Text(String),
    Image(ImageFile),
}

/// How a session behaves when it is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenOptions {
    /// Copy the newest text paste to the clipboard after the first fetch.
    /// Off for hosts that open a room to run a single command.
    pub auto_copy: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self { auto_copy: true }
    }
}

/// What applying one change-feed event did to the local list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncUpdate {
    /// A paste from the feed was merged in.
    Inserted(Uuid),
    /// The paste was already present.
    Duplicate(Uuid),
    /// The list was replaced by a full fetch holding this many pastes.
    Refetched(usize),
}

/// One client's view of one room.
///
/// The list is always newest first with unique ids. Adds are merged only
/// after the store confirms them; deletes remove the row locally as soon as
/// the store call succeeds, without waiting for the feed to echo it.
pub struct RoomSession {
    room: RoomCode,
    pastes: Vec<Paste>,
    store: PasteStoreClient,
    images: ImageCoordinator,
    clipboard: Arc<dyn Clipboard>,
    feed: Option<ChangeFeed>,
    view: watch::Sender<Vec<Paste>>,
    auto_copied: bool,
}

impl RoomSession {
    /// Subscribe to `room`, then load it.
    ///
    /// The feed is opened first so no mutation falls between the fetch and the
    /// subscription; inserts seen by both are deduplicated by id.
    #[instrument(skip_all, fields(room = %room))]
    pub(crate) async fn open(
        room: RoomCode,
        store: PasteStoreClient,
        feeds: &ChangeFeedSubscriber,
        images: ImageCoordinator,
        clipboard: Arc<dyn Clipboard>,
        options: OpenOptions,
    ) -> Result<Self, SessionError> {
        let feed = feeds
            .subscribe(&room)
            .await
            .map_err(|source| SessionError::Load {
                room: room.clone(),
                source,
            })?;

        let (view, _) = watch::channel(Vec::new());
        let mut session = Self {
            room,
            pastes: Vec::new(),
            store,
            images,
            clipboard,
            feed: Some(feed),
            view,
            auto_copied: !options.auto_copy,
        };
        session.reload().await?;

        info!(count = session.pastes.len(), "Joined room");
        Ok(session)
    }

    pub fn room(&self) -> &RoomCode {
        &self.room
    }

    /// Current pastes, newest first.
    pub fn pastes(&self) -> &[Paste] {
        &self.pastes
    }

    pub fn get(&self, id: Uuid) -> Option<&Paste> {
        self.pastes.iter().find(|p| p.id == id)
    }

    /// A receiver that sees every new version of the list.
    pub fn view(&self) -> watch::Receiver<Vec<Paste>> {
        self.view.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.feed.is_none()
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }
        Ok(())
    }

    fn publish(&self) {
        self.view.send_replace(self.pastes.clone());
    }

    /// Replace the list with a fresh fetch. On failure the list is unchanged.
    pub async fn reload(&mut self) -> Result<usize, SessionError> {
        let fetched = self
            .store
            .list(&self.room)
            .await
            .map_err(|source| SessionError::Load {
                room: self.room.clone(),
                source,
            })?;

        self.pastes = fetched;
        self.publish();
        self.auto_copy_newest_text();
        Ok(self.pastes.len())
    }

    /// Runs once per session, after the first successful fetch, unless the
    /// session was opened without auto-copy.
    fn auto_copy_newest_text(&mut self) {
        if self.auto_copied {
            return;
        }
        self.auto_copied = true;

        let Some(newest) = self.pastes.iter().find(|p| !p.is_image()) else {
            return;
        };
        match self.clipboard.write_text(&newest.content) {
            Ok(()) => debug!(paste_id = %newest.id, "Copied newest text paste"),
            Err(e) => warn!(error = %e, "Auto-copy failed"),
        }
    }

    /// Insert `paste` at its sorted position unless its id is already present.
    fn merge(&mut self, paste: Paste) -> bool {
        if self.pastes.iter().any(|p| p.id == paste.id) {
            return false;
        }
        let at = self
            .pastes
            .partition_point(|p| Paste::newest_first(p, &paste).is_lt());
        self.pastes.insert(at, paste);
        self.publish();
        true
    }

    /// Wait for the next change-feed event and apply it.
    ///
    /// Returns `None` once the session is closed. A failed re-fetch is
    /// reported and leaves the list as it was.
    pub async fn next_change(&mut self) -> Option<Result<SyncUpdate, SessionError>> {
        let event = self.feed.as_mut()?.next().await?;
        Some(self.apply(event).await)
    }

    async fn apply(&mut self, event: ChangeEvent) -> Result<SyncUpdate, SessionError> {
        match event {
            ChangeEvent::Inserted(paste) => {
                let id = paste.id;
                if self.merge(paste) {
                    debug!(room = %self.room, paste_id = %id, "Merged remote paste");
                    Ok(SyncUpdate::Inserted(id))
                } else {
                    Ok(SyncUpdate::Duplicate(id))
                }
            }
            // Delete events carry no row, so the only safe response is a full fetch.
            ChangeEvent::Deleted => self.reload().await.map(SyncUpdate::Refetched),
        }
    }

    pub async fn add(&mut self, input: PasteInput) -> Result<Paste, SessionError> {
        match input {
            PasteInput::Text(text) => self.add_text(&text).await,
            PasteInput::Image(file) => self.add_image(&file).await,
        }
    }

    /// Trim and store a text paste. Blank or oversized text never reaches the store.
    #[instrument(skip(self, raw), fields(room = %self.room))]
    pub async fn add_text(&mut self, raw: &str) -> Result<Paste, SessionError> {
        self.ensure_open()?;
        let text = self.store.prepare_text(raw)?;

        let created = self
            .store
            .insert(NewPaste::text(self.room.clone(), text))
            .await
            .map_err(|source| SessionError::Add {
                phase: AddPhase::Store,
                source,
            })?;

        self.merge(created.clone());
        Ok(created)
    }

    /// Upload `file`, then store a paste pointing at it.
    #[instrument(skip(self, file), fields(room = %self.room, name = %file.name))]
    pub async fn add_image(&mut self, file: &ImageFile) -> Result<Paste, SessionError> {
        self.ensure_open()?;

        let url = self
            .images
            .upload(file, &self.room)
            .await
            .map_err(|e| match e {
                ImageError::Validation(v) => SessionError::Validation(v),
                ImageError::InvalidReference(url) => SessionError::InvalidReference(url),
                ImageError::Remote(source) => SessionError::Add {
                    phase: AddPhase::Upload,
                    source,
                },
            })?;

        let created = match self
            .store
            .insert(NewPaste::image(self.room.clone(), url.clone()))
            .await
        {
            Ok(created) => created,
            Err(source) => {
                if let Err(e) = self.images.delete_by_url(&url).await {
                    warn!(url, error = %e, "Failed to remove image after store error");
                }
                return Err(SessionError::Add {
                    phase: AddPhase::Store,
                    source,
                });
            }
        };

        self.merge(created.clone());
        Ok(created)
    }

    /// Delete one paste, and its image blob if it has one.
    ///
    /// Blob removal is best effort; only the store delete decides the outcome.
    #[instrument(skip(self), fields(room = %self.room, paste_id = %id))]
    pub async fn delete_one(&mut self, id: Uuid) -> Result<(), SessionError> {
        self.ensure_open()?;

        let image_url = self
            .get(id)
            .filter(|p| p.is_image())
            .map(|p| p.content.clone());
        if let Some(url) = image_url {
            if let Err(e) = self.images.delete_by_url(&url).await {
                warn!(paste_id = %id, url, error = %e, "Failed to delete image blob");
            }
        }

        self.store
            .delete_by_id(id)
            .await
            .map_err(|source| SessionError::Delete { id, source })?;

        // Deliberate asymmetry: deletes apply locally without waiting for the
        // feed, while adds only appear once the store confirms them.
        let before = self.pastes.len();
        self.pastes.retain(|p| p.id != id);
        if self.pastes.len() != before {
            self.publish();
        }
        Ok(())
    }

    /// Delete every paste in the room.
    ///
    /// Blobs are only swept when the local list holds an image paste.
    #[instrument(skip(self), fields(room = %self.room))]
    pub async fn clear_all(&mut self) -> Result<u64, SessionError> {
        self.ensure_open()?;

        if self.pastes.iter().any(Paste::is_image) {
            match self.images.delete_all_for_room(&self.room).await {
                Ok(removed) => debug!(removed, "Removed room images"),
                Err(e) => warn!(error = %e, "Failed to delete room images"),
            }
        }

        let removed = self
            .store
            .delete_by_room(&self.room)
            .await
            .map_err(|source| SessionError::Clear {
                room: self.room.clone(),
                source,
            })?;

        self.pastes.clear();
        self.publish();
        info!(removed, "Cleared room");
        Ok(removed)
    }

    /// Put a paste's content on the local clipboard.
    pub fn copy(&self, id: Uuid) -> Result<(), SessionError> {
        let paste = self.get(id).ok_or(SessionError::NotFound(id))?;
        self.clipboard.write_text(&paste.content)?;
        Ok(())
    }

    /// Add whatever text is on the local clipboard.
    pub async fn paste_from_clipboard(&mut self) -> Result<Paste, SessionError> {
        let text = self.clipboard.read_text()?;
        self.add_text(&text).await
    }

    /// Bytes of an image paste, for display.
    pub async fn resolve_image(&self, url: &str) -> Result<Vec<u8>, DisplayError> {
        self.images.resolve(url).await
    }

    /// Render the current list for download.
    pub fn export(&self, format: ExportFormat, order: ExportOrder) -> serde_json::Result<Exported> {
        Exported::render(&self.room, &self.pastes, format, order)
    }

    /// Stop listening for changes. The list stays readable. Safe to call twice.
    pub fn close(&mut self) {
        if let Some(mut feed) = self.feed.take() {
            feed.close();
            info!(room = %self.room, "Left room");
        }
    }
}

impl Drop for RoomSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for RoomSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomSession")
            .field("room", &self.room)
            .field("pastes", &self.pastes.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
