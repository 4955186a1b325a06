use std::sync::Arc;

use common::RoomCode;
use common::config::{ImageConfig, PasteConfig, SessionConfig};
use common::storage::{ImageBucket, PasteStore};
use serde::Deserialize;

use crate::clipboard::Clipboard;
use crate::error::SessionError;
use crate::feed::ChangeFeedSubscriber;
use crate::images::ImageCoordinator;
use crate::pastes::PasteStoreClient;
use crate::room::{OpenOptions, RoomSession};

/// Settings shared by every session an [`Engine`] opens.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub paste: PasteConfig,
    #[serde(default)]
    pub image: ImageConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// The store, bucket and clipboard a host wires together once; sessions are
/// opened from it per room.
#[derive(Clone)]
pub struct Engine {
    pastes: PasteStoreClient,
    feeds: ChangeFeedSubscriber,
    images: ImageCoordinator,
    clipboard: Arc<dyn Clipboard>,
}

impl Engine {
    pub fn new(
        store: Arc<dyn PasteStore>,
        bucket: Arc<dyn ImageBucket>,
        clipboard: Arc<dyn Clipboard>,
        config: &EngineConfig,
    ) -> Self {
        let timeout = config.session.request_timeout();
        let pastes = PasteStoreClient::new(store, &config.paste, timeout);
        let feeds = ChangeFeedSubscriber::new(pastes.store().clone(), timeout);
        Self {
            pastes,
            feeds,
            images: ImageCoordinator::new(bucket, &config.image, timeout),
            clipboard,
        }
    }

    pub fn pastes(&self) -> &PasteStoreClient {
        &self.pastes
    }

    pub fn images(&self) -> &ImageCoordinator {
        &self.images
    }

    /// Join `room`: subscribe, fetch, and auto-copy the newest text paste.
    pub async fn open(&self, room: RoomCode) -> Result<RoomSession, SessionError> {
        self.open_with(room, OpenOptions::default()).await
    }

    pub async fn open_with(
        &self,
        room: RoomCode,
        options: OpenOptions,
    ) -> Result<RoomSession, SessionError> {
        RoomSession::open(
            room,
            self.pastes.clone(),
            &self.feeds,
            self.images.clone(),
            self.clipboard.clone(),
            options,
        )
        .await
    }
}
