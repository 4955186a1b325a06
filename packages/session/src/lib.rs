//! Room-scoped paste synchronization.
//!
//! A [`RoomSession`] keeps one room's pastes in newest-first order, merging its
//! own mutations, full fetches and live change-feed events into a single list.
//! Image pastes go through the [`ImageCoordinator`], which ties each uploaded
//! blob to the paste that references it.

pub mod clipboard;
pub mod engine;
pub mod error;
pub mod export;
pub mod feed;
pub mod images;
pub mod pastes;
pub mod room;

pub use clipboard::{Clipboard, ClipboardError, MemoryClipboard, NoClipboard};
pub use engine::{Engine, EngineConfig};
pub use error::{AddPhase, DisplayError, RemoteError, SessionError, ValidationError};
pub use export::{ExportFormat, ExportOrder, Exported};
pub use feed::{ChangeFeed, ChangeFeedSubscriber};
pub use images::{ImageCoordinator, ImageError, ImageFile, Validity};
pub use pastes::PasteStoreClient;
pub use room::{OpenOptions, PasteInput, RoomSession, SyncUpdate};
