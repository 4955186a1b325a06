use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use common::{Paste, PasteKind, RoomCode};
use serde::Serialize;

const TEXT_SEPARATOR: &str = "\n\n===\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Text,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "txt",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Text => "text/plain",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "txt" | "text" => Ok(Self::Text),
            other => Err(format!("unknown export format: {other}")),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportOrder {
    #[default]
    Newest,
    Oldest,
}

impl FromStr for ExportOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "newest" => Ok(Self::Newest),
            "oldest" => Ok(Self::Oldest),
            other => Err(format!("unknown export order: {other}")),
        }
    }
}

#[derive(Serialize)]
struct ExportRow<'a> {
    content: &'a str,
    #[serde(rename = "type")]
    kind: PasteKind,
    created_at: DateTime<Utc>,
}

/// A rendered export, ready to be written to `file_name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exported {
    pub file_name: String,
    pub mime_type: &'static str,
    pub body: String,
}

impl Exported {
    /// Render `pastes` (newest first, as a session holds them).
    ///
    /// The text format keeps text pastes only.
    pub fn render(
        room: &RoomCode,
        pastes: &[Paste],
        format: ExportFormat,
        order: ExportOrder,
    ) -> serde_json::Result<Self> {
        let ordered: Vec<&Paste> = match order {
            ExportOrder::Newest => pastes.iter().collect(),
            ExportOrder::Oldest => pastes.iter().rev().collect(),
        };

        let body = match format {
            ExportFormat::Json => {
                let rows: Vec<ExportRow<'_>> = ordered
                    .iter()
                    .map(|p| ExportRow {
                        content: &p.content,
                        kind: p.kind,
                        created_at: p.created_at,
                    })
                    .collect();
                serde_json::to_string_pretty(&rows)?
            }
            ExportFormat::Text => ordered
                .iter()
                .filter(|p| !p.is_image())
                .map(|p| p.content.as_str())
                .collect::<Vec<_>>()
                .join(TEXT_SEPARATOR),
        };

        Ok(Self {
            file_name: format!("clypsync-{room}.{}", format.extension()),
            mime_type: format.mime_type(),
            body,
        })
    }
}
