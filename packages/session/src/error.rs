use std::fmt;
use std::future::Future;
use std::time::Duration;

use common::RoomCode;
use common::storage::StorageError;
use thiserror::Error;
use uuid::Uuid;

/// A store or bucket call that did not succeed.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

/// Run a remote call with an upper bound on how long it may hang.
pub(crate) async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, RemoteError>
where
    F: Future<Output = Result<T, StorageError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(RemoteError::from),
        Err(_) => Err(RemoteError::Timeout(limit)),
    }
}

/// Whole megabytes or kilobytes when the limit divides evenly, bytes otherwise.
fn human_size(bytes: &u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    match *bytes {
        b if b >= MB && b % MB == 0 => format!("{}MB", b / MB),
        b if b >= KB && b % KB == 0 => format!("{}KB", b / KB),
        b => format!("{b} bytes"),
    }
}

/// Input rejected before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("File must be an image")]
    NotAnImage { content_type: String },
    #[error("Image must be smaller than {}", human_size(.limit))]
    TooLarge { size: u64, limit: u64 },
    #[error("Paste cannot be empty")]
    EmptyPaste,
    #[error("Paste must be at most {limit} characters")]
    TextTooLong { chars: usize, limit: usize },
}

impl ValidationError {
    /// Short machine-friendly reason.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NotAnImage { .. } => "wrong type",
            Self::TooLarge { .. } => "too large",
            Self::EmptyPaste => "empty",
            Self::TextTooLong { .. } => "too long",
        }
    }
}

/// Which step of an add failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddPhase {
    /// Storing the image blob.
    Upload,
    /// Creating the paste record.
    Store,
}

impl fmt::Display for AddPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upload => f.write_str("upload"),
            Self::Store => f.write_str("store"),
        }
    }
}

/// Errors surfaced by a room session.
///
/// None of them leave the local list half-updated: local state only changes
/// after the remote step it mirrors has succeeded.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to load pastes for room {room}: {source}")]
    Load {
        room: RoomCode,
        #[source]
        source: RemoteError,
    },
    #[error("failed to add paste during {phase}: {source}")]
    Add {
        phase: AddPhase,
        #[source]
        source: RemoteError,
    },
    #[error("failed to delete paste {id}: {source}")]
    Delete {
        id: Uuid,
        #[source]
        source: RemoteError,
    },
    #[error("failed to clear room {room}: {source}")]
    Clear {
        room: RoomCode,
        #[source]
        source: RemoteError,
    },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("invalid image reference: {0}")]
    InvalidReference(String),
    #[error("paste {0} is not in this room")]
    NotFound(Uuid),
    #[error("clipboard error: {0}")]
    Clipboard(#[from] crate::clipboard::ClipboardError),
    #[error("room session is closed")]
    Closed,
}

impl SessionError {
    /// The short notification shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Load { .. } => "Failed to load pastes".into(),
            Self::Add {
                phase: AddPhase::Upload,
                ..
            } => "Failed to upload image".into(),
            Self::Add {
                phase: AddPhase::Store,
                ..
            } => "Failed to add paste".into(),
            Self::Delete { .. } => "Failed to delete paste".into(),
            Self::Clear { .. } => "Failed to clear pastes".into(),
            Self::Validation(e) => e.to_string(),
            Self::InvalidReference(_) => "Invalid image URL".into(),
            Self::NotFound(_) => "Paste not found".into(),
            Self::Clipboard(_) => "Clipboard unavailable".into(),
            Self::Closed => "Room is closed".into(),
        }
    }
}

/// An image that cannot be shown. Rendered as a placeholder; never fatal.
#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("not an image URL from this bucket: {url}")]
    InvalidReference { url: String },
    #[error("image {url} is unavailable: {source}")]
    Unavailable {
        url: String,
        #[source]
        source: RemoteError,
    },
}
