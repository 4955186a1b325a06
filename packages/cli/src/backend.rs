use std::sync::Arc;

use anyhow::Context;
use common::storage::{ImageBucket, PublicUrlLayout};
use session::{Clipboard, Engine, NoClipboard};
use store::{DatabasePasteStore, FilesystemImageBucket, init_db};
use tracing::{info, warn};

use crate::clipboard::SystemClipboard;
use crate::config::{AppConfig, StorageBackend};

/// Connect the paste store, image bucket and clipboard described by `config`.
pub async fn connect(config: &AppConfig) -> anyhow::Result<Engine> {
    let db = init_db(&config.database)
        .await
        .context("Failed to connect to the paste database")?;
    let store = Arc::new(DatabasePasteStore::new(db, config.feed.clone()));

    let bucket = image_bucket(config).await?;

    let clipboard: Arc<dyn Clipboard> = if SystemClipboard::available() {
        Arc::new(SystemClipboard)
    } else {
        warn!("No system clipboard, copy and paste are disabled");
        Arc::new(NoClipboard)
    };

    Ok(Engine::new(store, bucket, clipboard, &config.engine()))
}

async fn image_bucket(config: &AppConfig) -> anyhow::Result<Arc<dyn ImageBucket>> {
    let layout = PublicUrlLayout::new(&config.image.public_base_url, &config.image.bucket);

    match config.storage.backend {
        StorageBackend::Filesystem => {
            let bucket =
                FilesystemImageBucket::new(config.storage.root.clone(), config.image.max_size, layout)
                    .await
                    .with_context(|| {
                        format!("Failed to open image storage at {}", config.storage.root.display())
                    })?;
            info!(root = %config.storage.root.display(), "Using filesystem image storage");
            Ok(Arc::new(bucket))
        }
        #[cfg(feature = "s3")]
        StorageBackend::S3 => {
            let s3 = config
                .storage
                .s3
                .as_ref()
                .context("storage.backend is s3 but [storage.s3] is missing")?;
            let bucket = store::S3ImageBucket::new(s3, layout)
                .context("Failed to configure the S3 image bucket")?;
            info!(endpoint = %s3.endpoint, bucket = %s3.bucket, "Using S3 image storage");
            Ok(Arc::new(bucket))
        }
        #[cfg(not(feature = "s3"))]
        StorageBackend::S3 => {
            anyhow::bail!("storage.backend is s3 but clypsync was built without the `s3` feature")
        }
    }
}
