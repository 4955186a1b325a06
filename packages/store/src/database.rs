use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use common::config::FeedConfig;
use common::storage::{PasteStore, StorageError, Subscription};
use common::{NewPaste, Paste, RoomCode};
use sea_orm::*;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::entity::paste;
use crate::poll::Snapshot;

/// Database connection settings.
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Connection URL, e.g. `postgres://...` or `sqlite://clypsync.db?mode=rwc`.
    /// Default: "sqlite://clypsync.db?mode=rwc".
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Pool size for server databases. Default: 10.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_url() -> String {
    "sqlite://clypsync.db?mode=rwc".into()
}
fn default_max_connections() -> u32 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

/// Connect and bring the `paste` table up to date.
pub async fn init_db(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(config.url.to_owned());
    opt.connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(false);

    if config.url.starts_with("sqlite:") {
        // One connection keeps an in-memory database alive and avoids SQLite
        // writer contention.
        opt.max_connections(1).min_connections(1);
    } else {
        opt.max_connections(config.max_connections)
            .min_connections(1)
            .idle_timeout(Duration::from_secs(60));
    }

    let db = Database::connect(opt).await?;
    db.get_schema_registry("store::entity::*")
        .sync(&db)
        .await?;

    info!(url = %redact(&config.url), "Paste database ready");
    Ok(db)
}

/// Strip credentials from a connection URL before logging it.
fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}

/// Paste store on a SQL database.
///
/// SQL has no change notifications, so [`PasteStore::subscribe`] polls the
/// room every `poll_interval` and turns differences into events.
#[derive(Clone)]
pub struct DatabasePasteStore {
    db: DatabaseConnection,
    feed: FeedConfig,
}

impl DatabasePasteStore {
    pub fn new(db: DatabaseConnection, feed: FeedConfig) -> Self {
        Self { db, feed }
    }
}

fn db_err(err: DbErr) -> StorageError {
    StorageError::backend(err)
}

#[async_trait]
impl PasteStore for DatabasePasteStore {
    #[instrument(skip(self), fields(room = %room))]
    async fn list(&self, room: &RoomCode) -> Result<Vec<Paste>, StorageError> {
        let models = paste::Entity::find()
            .filter(paste::Column::RoomCode.eq(room.as_str()))
            .order_by_desc(paste::Column::CreatedAt)
            .order_by_desc(paste::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(models.into_iter().map(Paste::from).collect())
    }

    #[instrument(skip(self, new_paste), fields(room = %new_paste.room_code, kind = %new_paste.kind))]
    async fn insert(&self, new_paste: NewPaste) -> Result<Paste, StorageError> {
        let model = paste::ActiveModel {
            id: Set(Uuid::now_v7()),
            room_code: Set(new_paste.room_code.as_str().to_string()),
            content: Set(new_paste.content),
            kind: Set(new_paste.kind),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;

        Ok(Paste::from(model))
    }

    #[instrument(skip(self))]
    async fn delete_by_id(&self, id: Uuid) -> Result<(), StorageError> {
        let result = paste::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        debug!(rows = result.rows_affected, "Deleted paste");
        Ok(())
    }

    #[instrument(skip(self), fields(room = %room))]
    async fn delete_by_room(&self, room: &RoomCode) -> Result<u64, StorageError> {
        let result = paste::Entity::delete_many()
            .filter(paste::Column::RoomCode.eq(room.as_str()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected)
    }

    async fn subscribe(&self, room: &RoomCode) -> Result<Subscription, StorageError> {
        let mut snapshot = Snapshot::new(&self.list(room).await?);

        let (tx, rx) = mpsc::channel(self.feed.channel_capacity.max(1));
        let store = self.clone();
        let task_room = room.clone();
        let period = self.feed.poll_interval();

        let producer = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately; the snapshot already covers it.
            interval.tick().await;

            loop {
                interval.tick().await;
                let current = match store.list(&task_room).await {
                    Ok(current) => current,
                    Err(e) => {
                        warn!(room = %task_room, error = %e, "Change feed poll failed");
                        continue;
                    }
                };

                for event in snapshot.advance(&current) {
                    if tx.send(event).await.is_err() {
                        return;
                    }
                }
            }
        });

        debug!(room = %room, ?period, "Polling change feed started");
        Ok(Subscription::new(room.clone(), rx, producer))
    }
}
