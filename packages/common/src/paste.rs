#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Number of digits in a room PIN unless configured otherwise.
pub const DEFAULT_PIN_LENGTH: usize = 4;

/// A room PIN.
///
/// The room has no row of its own: it exists only as the `room_code` shared by
/// its pastes, the change-feed filter, and the blob namespace `{room_code}/...`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

/// Rejected PIN input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRoomCode {
    #[error("PIN may only contain digits")]
    NonDigit,
    #[error("PIN must be exactly {expected} digits, got {actual}")]
    Length { expected: usize, actual: usize },
}

impl RoomCode {
    /// Parse user input into a PIN of exactly `pin_length` ASCII digits.
    /// Surrounding whitespace is ignored.
    pub fn parse(raw: &str, pin_length: usize) -> Result<Self, InvalidRoomCode> {
        let trimmed = raw.trim();

        if !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Err(InvalidRoomCode::NonDigit);
        }

        if trimmed.len() != pin_length {
            return Err(InvalidRoomCode::Length {
                expected: pin_length,
                actual: trimmed.len(),
            });
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Wrap a room code read back from a store row.
    pub fn new_unchecked(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RoomCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// How a paste's `content` is interpreted.
///
/// When the `sea-orm` feature is enabled, this enum can be used directly in SeaORM entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "lowercase")]
pub enum PasteKind {
    /// Literal text.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "text"))]
    Text,
    /// Public URL of a blob in the image bucket.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "image"))]
    Image,
}

impl PasteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
        }
    }
}

impl fmt::Display for PasteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing an invalid paste kind string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid paste type '{invalid}'. Valid values: text, image")]
pub struct ParseKindError {
    invalid: String,
}

impl FromStr for PasteKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            _ => Err(ParseKindError {
                invalid: s.to_string(),
            }),
        }
    }
}

/// One shared content record. Pastes are never mutated in place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paste {
    /// Assigned by the store at creation, never reused.
    pub id: Uuid,
    pub room_code: RoomCode,
    /// Literal text, or the public URL of an image blob.
    pub content: String,
    #[serde(rename = "type")]
    pub kind: PasteKind,
    /// Assigned by the store; the only ordering key.
    pub created_at: DateTime<Utc>,
}

impl Paste {
    pub fn is_image(&self) -> bool {
        self.kind == PasteKind::Image
    }

    /// Newest-first ordering. Ties on `created_at` fall back to the id so the
    /// order is total and identical on every client.
    pub fn newest_first(a: &Paste, b: &Paste) -> Ordering {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    }
}

/// What an insert submits; the store fills in `id` and `created_at`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewPaste {
    pub room_code: RoomCode,
    pub content: String,
    pub kind: PasteKind,
}

impl NewPaste {
    pub fn text(room_code: RoomCode, content: impl Into<String>) -> Self {
        Self {
            room_code,
            content: content.into(),
            kind: PasteKind::Text,
        }
    }

    pub fn image(room_code: RoomCode, url: impl Into<String>) -> Self {
        Self {
            room_code,
            content: url.into(),
            kind: PasteKind::Image,
        }
    }
}
