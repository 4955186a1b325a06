use std::sync::Arc;
use std::time::Duration;

use common::RoomCode;
use common::config::{FeedConfig, ImageConfig};
use common::storage::PublicUrlLayout;
use session::{Engine, EngineConfig, MemoryClipboard, SyncUpdate};
use store::{DatabaseConfig, DatabasePasteStore, FilesystemImageBucket, init_db};

use crate::support::{ids, png, sync_until};

async fn sqlite_engine(dir: &std::path::Path) -> (Engine, Engine) {
    let db = init_db(&DatabaseConfig {
        url: "sqlite::memory:".into(),
        max_connections: 1,
    })
    .await
    .unwrap();
    let store = Arc::new(DatabasePasteStore::new(
        db,
        FeedConfig {
            poll_interval_ms: 20,
            channel_capacity: 16,
        },
    ));

    let config = EngineConfig::default();
    let bucket = Arc::new(
        FilesystemImageBucket::new(
            dir.join("images"),
            config.image.max_size,
            PublicUrlLayout::new(&config.image.public_base_url, &config.image.bucket),
        )
        .await
        .unwrap(),
    );

    let a = Engine::new(
        store.clone(),
        bucket.clone(),
        Arc::new(MemoryClipboard::new()),
        &config,
    );
    let b = Engine::new(store, bucket, Arc::new(MemoryClipboard::new()), &config);
    (a, b)
}

#[tokio::test]
async fn polling_feed_keeps_two_devices_in_step() {
    let dir = tempfile::tempdir().unwrap();
    let (device_a, device_b) = sqlite_engine(dir.path()).await;
    let room = RoomCode::parse("4242", 4).unwrap();

    let mut a = device_a.open(room.clone()).await.unwrap();
    let mut b = device_b.open(room.clone()).await.unwrap();

    let text = a.add_text("over sql").await.unwrap();
    let updates = sync_until(&mut b, |pastes| pastes.len() == 1).await;
    assert_eq!(updates, vec![SyncUpdate::Inserted(text.id)]);

    let image = a.add_image(&png("pic.png", 128)).await.unwrap();
    let stored = dir.path().join("images").join(
        device_a
            .images()
            .object_path(&image.content)
            .unwrap(),
    );
    assert!(stored.exists());
    sync_until(&mut b, |pastes| pastes.len() == 2).await;
    assert_eq!(ids(b.pastes()), vec![image.id, text.id]);

    // A row that lives shorter than one poll is invisible to a polling feed,
    // so let a's feed observe the image before it goes away.
    loop {
        let update = tokio::time::timeout(Duration::from_secs(2), a.next_change())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        if update == SyncUpdate::Duplicate(image.id) {
            break;
        }
    }

    b.delete_one(image.id).await.unwrap();
    assert!(!stored.exists());
    sync_until(&mut a, |pastes| pastes.len() == 1).await;
    assert_eq!(ids(a.pastes()), vec![text.id]);

    a.close();
    b.close();
}

#[tokio::test]
async fn image_limit_is_applied_by_the_filesystem_bucket_too() {
    let dir = tempfile::tempdir().unwrap();
    let layout = PublicUrlLayout::new("http://localhost:8000", "images");
    let bucket = FilesystemImageBucket::new(dir.path().join("images"), 4, layout)
        .await
        .unwrap();

    let engine = Engine::new(
        Arc::new(store::MemoryPasteStore::default()),
        Arc::new(bucket),
        Arc::new(MemoryClipboard::new()),
        &EngineConfig {
            image: ImageConfig {
                max_size: 1024,
                ..ImageConfig::default()
            },
            ..EngineConfig::default()
        },
    );
    let room = RoomCode::parse("4242", 4).unwrap();

    let err = engine
        .images()
        .upload(&png("a.png", 16), &room)
        .await
        .unwrap_err();
    assert!(matches!(err, session::ImageError::Remote(_)));
}
