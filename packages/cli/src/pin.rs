use std::io;
use std::path::PathBuf;

use anyhow::Context;
use common::RoomCode;
use tracing::{debug, warn};

/// The one persisted value: which room this device has joined.
#[derive(Debug, Clone)]
pub struct PinFile {
    path: PathBuf,
    pin_length: usize,
}

impl PinFile {
    pub fn new(path: impl Into<PathBuf>, pin_length: usize) -> Self {
        Self {
            path: path.into(),
            pin_length,
        }
    }

    /// The joined room, if any. A corrupt file counts as not joined.
    pub fn load(&self) -> anyhow::Result<Option<RoomCode>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read {}", self.path.display()));
            }
        };

        match RoomCode::parse(&raw, self.pin_length) {
            Ok(room) => Ok(Some(room)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring invalid saved PIN");
                Ok(None)
            }
        }
    }

    pub fn save(&self, room: &RoomCode) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(&self.path, room.as_str())
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        debug!(room = %room, path = %self.path.display(), "Saved PIN");
        Ok(())
    }

    /// Forget the joined room. Returns whether one was saved.
    pub fn clear(&self) -> anyhow::Result<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", self.path.display())),
        }
    }
}
