use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use common::config::{ImageConfig, SessionConfig};
use common::storage::{
    ImageBucket, ObjectEntry, PasteStore, PublicUrlLayout, StorageError, Subscription,
};
use common::{NewPaste, Paste, RoomCode};
use session::{Engine, EngineConfig, ImageFile, MemoryClipboard, RoomSession, SyncUpdate};
use store::{MemoryImageBucket, MemoryPasteStore};
use uuid::Uuid;

pub const BASE_URL: &str = "http://localhost:8000";
pub const BUCKET: &str = "images";

/// Switch that makes the next calls of one operation fail.
#[derive(Default)]
pub struct Fault(AtomicBool);

impl Fault {
    pub fn set(&self, failing: bool) {
        self.0.store(failing, Ordering::SeqCst);
    }

    fn check(&self, op: &str) -> Result<(), StorageError> {
        if self.0.load(Ordering::SeqCst) {
            return Err(StorageError::Backend(format!("injected {op} failure")));
        }
        Ok(())
    }
}

/// Memory paste store with injectable failures and call counters.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryPasteStore,
    pub fail_list: Fault,
    pub fail_insert: Fault,
    pub fail_delete: Fault,
    pub fail_clear: Fault,
    pub list_calls: AtomicUsize,
    pub insert_calls: AtomicUsize,
}

#[async_trait]
impl PasteStore for FlakyStore {
    async fn list(&self, room: &RoomCode) -> Result<Vec<Paste>, StorageError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.fail_list.check("list")?;
        self.inner.list(room).await
    }

    async fn insert(&self, paste: NewPaste) -> Result<Paste, StorageError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        self.fail_insert.check("insert")?;
        self.inner.insert(paste).await
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<(), StorageError> {
        self.fail_delete.check("delete")?;
        self.inner.delete_by_id(id).await
    }

    async fn delete_by_room(&self, room: &RoomCode) -> Result<u64, StorageError> {
        self.fail_clear.check("clear")?;
        self.inner.delete_by_room(room).await
    }

    async fn subscribe(&self, room: &RoomCode) -> Result<Subscription, StorageError> {
        self.inner.subscribe(room).await
    }
}

/// Memory image bucket with injectable failures and call counters.
pub struct FlakyBucket {
    pub inner: MemoryImageBucket,
    pub fail_put: Fault,
    pub fail_remove: Fault,
    pub put_calls: AtomicUsize,
}

impl Default for FlakyBucket {
    fn default() -> Self {
        Self {
            inner: MemoryImageBucket::new(PublicUrlLayout::new(BASE_URL, BUCKET)),
            fail_put: Fault::default(),
            fail_remove: Fault::default(),
            put_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ImageBucket for FlakyBucket {
    async fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<(), StorageError> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        self.fail_put.check("put")?;
        self.inner.put(path, bytes, content_type).await
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        self.inner.get(path).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>, StorageError> {
        self.inner.list(prefix).await
    }

    async fn remove(&self, paths: &[String]) -> Result<(), StorageError> {
        self.fail_remove.check("remove")?;
        self.inner.remove(paths).await
    }

    fn layout(&self) -> &PublicUrlLayout {
        self.inner.layout()
    }
}

/// A shared store and bucket plus one clipboard per simulated device.
pub struct TestRoom {
    pub room: RoomCode,
    pub store: Arc<FlakyStore>,
    pub bucket: Arc<FlakyBucket>,
    pub config: EngineConfig,
}

impl TestRoom {
    pub fn new() -> Self {
        Self::with_config(EngineConfig {
            image: ImageConfig {
                public_base_url: BASE_URL.into(),
                bucket: BUCKET.into(),
                ..ImageConfig::default()
            },
            session: SessionConfig {
                request_timeout_ms: 2_000,
            },
            ..EngineConfig::default()
        })
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            room: RoomCode::parse("4242", 4).unwrap(),
            store: Arc::new(FlakyStore::default()),
            bucket: Arc::new(FlakyBucket::default()),
            config,
        }
    }

    /// A device with its own clipboard.
    pub fn device(&self) -> (Engine, Arc<MemoryClipboard>) {
        self.device_with(MemoryClipboard::new())
    }

    /// A device whose clipboard already holds `text`.
    pub fn device_holding(&self, text: &str) -> (Engine, Arc<MemoryClipboard>) {
        self.device_with(MemoryClipboard::with_text(text))
    }

    fn device_with(&self, clipboard: MemoryClipboard) -> (Engine, Arc<MemoryClipboard>) {
        let clipboard = Arc::new(clipboard);
        let engine = Engine::new(
            self.store.clone(),
            self.bucket.clone(),
            clipboard.clone(),
            &self.config,
        );
        (engine, clipboard)
    }

    pub async fn open(&self) -> (RoomSession, Arc<MemoryClipboard>) {
        let (engine, clipboard) = self.device();
        let session = engine.open(self.room.clone()).await.unwrap();
        (session, clipboard)
    }

    /// Write a paste directly to the store, as another client would.
    pub async fn seed_text(&self, content: &str) -> Paste {
        self.store
            .inner
            .insert(NewPaste::text(self.room.clone(), content))
            .await
            .unwrap()
    }
}

pub fn png(name: &str, size: usize) -> ImageFile {
    ImageFile::new(name, "image/png", vec![0x89; size])
}

/// Apply feed events until `done` holds for the session's list.
pub async fn sync_until<F>(session: &mut RoomSession, done: F) -> Vec<SyncUpdate>
where
    F: Fn(&[Paste]) -> bool,
{
    let mut updates = Vec::new();
    while !done(session.pastes()) {
        let update = tokio::time::timeout(Duration::from_secs(2), session.next_change())
            .await
            .expect("timed out waiting for change feed")
            .expect("session closed")
            .expect("change failed to apply");
        updates.push(update);
    }
    updates
}

pub fn ids(pastes: &[Paste]) -> Vec<Uuid> {
    pastes.iter().map(|p| p.id).collect()
}
