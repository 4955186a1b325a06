use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct ClipboardError(pub String);

/// Access to the local text clipboard.
pub trait Clipboard: Send + Sync {
    fn read_text(&self) -> Result<String, ClipboardError>;
    fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Clipboard held in memory. Counts writes so auto-copy can be observed.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    contents: Mutex<Option<String>>,
    writes: AtomicUsize,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            contents: Mutex::new(Some(text.into())),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.contents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl Clipboard for MemoryClipboard {
    fn read_text(&self) -> Result<String, ClipboardError> {
        self.contents()
            .ok_or_else(|| ClipboardError("clipboard is empty".into()))
    }

    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        *self
            .contents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(text.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Stand-in for hosts without a clipboard. Every call fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoClipboard;

impl Clipboard for NoClipboard {
    fn read_text(&self) -> Result<String, ClipboardError> {
        Err(ClipboardError("no clipboard available".into()))
    }

    fn write_text(&self, _text: &str) -> Result<(), ClipboardError> {
        Err(ClipboardError("no clipboard available".into()))
    }
}
