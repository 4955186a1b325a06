use arboard::Clipboard as Arboard;
use session::{Clipboard, ClipboardError};

/// Hidden subcommand run by the background process that keeps a copied
/// selection alive on Linux.
pub const HOLD_COMMAND: &str = "hold-clipboard";

/// The desktop clipboard. A handle is opened per call.
///
/// On Linux the selection is served by whichever process owns it and vanishes
/// when that process exits, so writes are handed to a detached copy of this
/// binary that holds the text until another application replaces it.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl SystemClipboard {
    /// Whether this host has a usable clipboard.
    pub fn available() -> bool {
        Arboard::new().is_ok()
    }
}

fn open() -> Result<Arboard, ClipboardError> {
    Arboard::new().map_err(|e| ClipboardError(e.to_string()))
}

fn clipboard_err(err: impl std::fmt::Display) -> ClipboardError {
    ClipboardError(err.to_string())
}

impl Clipboard for SystemClipboard {
    fn read_text(&self) -> Result<String, ClipboardError> {
        open()?.get_text().map_err(clipboard_err)
    }

    #[cfg(target_os = "linux")]
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        use std::io::Write;

        let exe = std::env::current_exe().map_err(clipboard_err)?;
        let mut child = holder_command(&exe).spawn().map_err(clipboard_err)?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ClipboardError("clipboard holder has no stdin".into()))?;
        stdin.write_all(text.as_bytes()).map_err(clipboard_err)?;
        tracing::debug!(pid = child.id(), "Handed selection to clipboard holder");
        Ok(())
    }

    #[cfg(not(target_os = "linux"))]
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        open()?.set_text(text.to_owned()).map_err(clipboard_err)
    }
}

/// The detached process that takes over a Linux selection.
#[cfg(target_os = "linux")]
fn holder_command(exe: &std::path::Path) -> std::process::Command {
    use std::process::{Command, Stdio};

    let mut command = Command::new(exe);
    command
        .arg(HOLD_COMMAND)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    command
}

/// Read the text from stdin, own the selection, and return only once another
/// application has taken it over.
pub fn hold_from_stdin() -> anyhow::Result<()> {
    use std::io::Read;

    let mut text = String::new();
    std::io::stdin().read_to_string(&mut text)?;
    hold(text)
}

#[cfg(target_os = "linux")]
fn hold(text: String) -> anyhow::Result<()> {
    use arboard::SetExtLinux;

    Arboard::new()?.set().wait().text(text)?;
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn hold(text: String) -> anyhow::Result<()> {
    Arboard::new()?.set_text(text)?;
    Ok(())
}
