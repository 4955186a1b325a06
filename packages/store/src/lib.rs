//! Backends for the paste store and the image bucket.

pub mod database;
pub mod entity;
pub mod filesystem;
pub mod hub;
pub mod memory;
mod poll;
#[cfg(feature = "object-storage")]
pub mod object_storage;

pub use database::{DatabaseConfig, DatabasePasteStore, init_db};
pub use filesystem::FilesystemImageBucket;
pub use hub::ChangeHub;
pub use memory::{MemoryImageBucket, MemoryPasteStore};
#[cfg(feature = "object-storage")]
pub use object_storage::{S3BucketConfig, S3ImageBucket};
