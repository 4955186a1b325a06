use std::path::PathBuf;

use common::config::{FeedConfig, ImageConfig, PasteConfig, RoomConfig, SessionConfig};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use session::EngineConfig;
use store::DatabaseConfig;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Filesystem,
    S3,
}

/// Credentials and endpoint for the `s3` backend.
#[cfg(feature = "s3")]
pub use store::S3BucketConfig;

/// Where image blobs are kept.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// `filesystem` or `s3`. Default: "filesystem".
    #[serde(default)]
    pub backend: StorageBackend,
    /// Root directory for the filesystem backend. Default: "./data/images".
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
    #[cfg(feature = "s3")]
    pub s3: Option<S3BucketConfig>,
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("./data/images")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            root: default_storage_root(),
            #[cfg(feature = "s3")]
            s3: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub room: RoomConfig,
    #[serde(default)]
    pub paste: PasteConfig,
    #[serde(default)]
    pub image: ImageConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub session: SessionConfig,
    /// File holding the joined PIN. Default: ".clypsync/pin".
    #[serde(default = "default_pin_file")]
    pub pin_file: PathBuf,
}

fn default_pin_file() -> PathBuf {
    PathBuf::from(".clypsync/pin")
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("CLYPSYNC_CONFIG").unwrap_or_else(|_| "config/config".to_string());

        let s = Config::builder()
            .set_default("room.pin_length", 4_i64)?
            .set_default("paste.max_text_chars", 10_000_i64)?
            .set_default("storage.backend", "filesystem")?
            .set_default("storage.root", "./data/images")?
            .set_default("database.url", "sqlite://clypsync.db?mode=rwc")?
            .set_default("pin_file", ".clypsync/pin")?
            .add_source(File::with_name(&config_path).required(false))
            // e.g. CLYPSYNC__DATABASE__URL, CLYPSYNC__STORAGE__S3__BUCKET
            .add_source(Environment::with_prefix("CLYPSYNC").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            paste: self.paste.clone(),
            image: self.image.clone(),
            session: self.session.clone(),
        }
    }
}
