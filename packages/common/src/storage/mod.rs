mod error;
mod subscription;
mod traits;
mod url;

pub use error::StorageError;
pub use subscription::Subscription;
pub use traits::{ImageBucket, ObjectEntry, PasteStore};
pub use url::PublicUrlLayout;
