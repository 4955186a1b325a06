use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow, bail};
use common::{Paste, RoomCode};
use session::{
    ExportFormat, ExportOrder, ImageFile, OpenOptions, RoomSession, SessionError, SyncUpdate,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::backend;
use crate::config::AppConfig;
use crate::pin::PinFile;
use crate::render::{paste_count, paste_line, unavailable_image_line};

/// Attach the short user-facing message to a session error.
fn toast(err: SessionError) -> anyhow::Error {
    let message = err.user_message();
    anyhow::Error::new(err).context(message)
}

fn require_room(pin: &PinFile) -> anyhow::Result<RoomCode> {
    pin.load()?
        .ok_or_else(|| anyhow!("Not in a room. Run `clypsync join <pin>` first"))
}

/// One-shot commands leave the device clipboard alone.
const ONE_SHOT: OpenOptions = OpenOptions { auto_copy: false };

async fn open_joined(
    config: &AppConfig,
    pin: &PinFile,
    options: OpenOptions,
) -> anyhow::Result<RoomSession> {
    let room = require_room(pin)?;
    let engine = backend::connect(config).await?;
    engine.open_with(room, options).await.map_err(toast)
}

/// Find a paste by full id, or by a prefix or suffix of its hex digits.
fn resolve_id(pastes: &[Paste], raw: &str) -> anyhow::Result<Uuid> {
    if let Ok(id) = Uuid::parse_str(raw) {
        return Ok(id);
    }

    let needle = raw.trim().to_ascii_lowercase().replace('-', "");
    if needle.is_empty() {
        bail!("Paste id cannot be empty");
    }

    let matches: Vec<Uuid> = pastes
        .iter()
        .map(|p| p.id)
        .filter(|id| {
            let hex = id.simple().to_string();
            hex.starts_with(&needle) || hex.ends_with(&needle)
        })
        .collect();

    match matches.as_slice() {
        [id] => Ok(*id),
        [] => bail!("No paste matches `{raw}`"),
        _ => bail!("`{raw}` matches {} pastes, use more digits", matches.len()),
    }
}

pub async fn join(config: &AppConfig, pin: &PinFile, raw: &str) -> anyhow::Result<()> {
    let room = RoomCode::parse(raw, config.room.pin_length).context("Invalid PIN")?;

    let engine = backend::connect(config).await?;
    let mut session = engine.open(room.clone()).await.map_err(toast)?;
    pin.save(&room)?;

    println!(
        "Joined room {room} ({})",
        paste_count(session.pastes().len())
    );
    if let Some(newest) = session.pastes().iter().find(|p| !p.is_image()) {
        println!("Newest text: {}", crate::render::preview(&newest.content, 60));
    }
    session.close();
    Ok(())
}

pub fn leave(pin: &PinFile) -> anyhow::Result<()> {
    let joined = pin.load()?;
    pin.clear()?;
    match joined {
        Some(room) => println!("Left room {room}"),
        None => println!("Not in a room"),
    }
    Ok(())
}

pub async fn status(config: &AppConfig, pin: &PinFile) -> anyhow::Result<()> {
    let Some(room) = pin.load()? else {
        println!("Not in a room");
        return Ok(());
    };

    let engine = backend::connect(config).await?;
    let mut session = engine.open_with(room.clone(), ONE_SHOT).await.map_err(toast)?;
    println!("Room:     {room}");
    println!("Pastes:   {}", session.pastes().len());
    println!("Database: {}", config.database.url.split('@').next_back().unwrap_or_default());
    println!("Images:   {:?}", config.storage.backend);
    session.close();
    Ok(())
}

pub async fn list(config: &AppConfig, pin: &PinFile, limit: usize) -> anyhow::Result<()> {
    let mut session = open_joined(config, pin, ONE_SHOT).await?;
    let pastes = session.pastes();

    if pastes.is_empty() {
        println!("Room {} is empty", session.room());
    } else {
        for paste in pastes.iter().take(limit) {
            println!("{}", listing_line(&session, paste).await);
        }
        if pastes.len() > limit {
            println!("… and {} more", pastes.len() - limit);
        }
    }
    session.close();
    Ok(())
}

/// Image pastes are checked against the bucket so a missing blob shows as a
/// placeholder instead of a dead link.
async fn listing_line(session: &RoomSession, paste: &Paste) -> String {
    if !paste.is_image() {
        return paste_line(paste);
    }
    match session.resolve_image(&paste.content).await {
        Ok(_) => paste_line(paste),
        Err(e) => {
            debug!(paste_id = %paste.id, error = %e, "Image unavailable");
            unavailable_image_line(paste)
        }
    }
}

pub async fn add_text(config: &AppConfig, pin: &PinFile, text: &str) -> anyhow::Result<()> {
    let mut session = open_joined(config, pin, ONE_SHOT).await?;
    let created = session.add_text(text).await.map_err(toast)?;
    println!("Added {}", paste_line(&created));
    session.close();
    Ok(())
}

pub async fn add_image(config: &AppConfig, pin: &PinFile, file: &Path) -> anyhow::Result<()> {
    let image = ImageFile::from_path(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let mut session = open_joined(config, pin, ONE_SHOT).await?;
    let created = session.add_image(&image).await.map_err(toast)?;
    println!("Added {}", paste_line(&created));
    session.close();
    Ok(())
}

pub async fn paste(config: &AppConfig, pin: &PinFile) -> anyhow::Result<()> {
    let mut session = open_joined(config, pin, ONE_SHOT).await?;
    let created = session.paste_from_clipboard().await.map_err(toast)?;
    println!("Added {}", paste_line(&created));
    session.close();
    Ok(())
}

pub async fn copy(config: &AppConfig, pin: &PinFile, raw_id: &str) -> anyhow::Result<()> {
    let mut session = open_joined(config, pin, ONE_SHOT).await?;
    let id = resolve_id(session.pastes(), raw_id)?;
    session.copy(id).map_err(toast)?;
    println!("Copied to clipboard");
    session.close();
    Ok(())
}

pub async fn delete(config: &AppConfig, pin: &PinFile, raw_id: &str) -> anyhow::Result<()> {
    let mut session = open_joined(config, pin, ONE_SHOT).await?;
    let id = resolve_id(session.pastes(), raw_id)?;
    session.delete_one(id).await.map_err(toast)?;
    println!("Deleted paste ({} left)", session.pastes().len());
    session.close();
    Ok(())
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

pub async fn clear(config: &AppConfig, pin: &PinFile, yes: bool) -> anyhow::Result<()> {
    let mut session = open_joined(config, pin, ONE_SHOT).await?;
    let prompt = format!(
        "Delete all {} in room {}?",
        paste_count(session.pastes().len()),
        session.room()
    );
    if !yes && !confirm(&prompt)? {
        println!("Cancelled");
        return Ok(());
    }

    let removed = session.clear_all().await.map_err(toast)?;
    println!("Cleared {}", paste_count(removed as usize));
    session.close();
    Ok(())
}

pub async fn export(
    config: &AppConfig,
    pin: &PinFile,
    format: ExportFormat,
    order: ExportOrder,
    out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut session = open_joined(config, pin, ONE_SHOT).await?;
    let exported = session
        .export(format, order)
        .context("Failed to render export")?;
    session.close();

    let path = out.unwrap_or_else(|| PathBuf::from(&exported.file_name));
    tokio::fs::write(&path, exported.body.as_bytes())
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Exported as {}", path.display());
    Ok(())
}

pub async fn watch(config: &AppConfig, pin: &PinFile) -> anyhow::Result<()> {
    let mut session = open_joined(config, pin, OpenOptions::default()).await?;
    println!(
        "Watching room {} ({}), Ctrl-C to stop",
        session.room(),
        paste_count(session.pastes().len())
    );
    for paste in session.pastes().iter().rev() {
        println!("{}", paste_line(paste));
    }

    let result = follow(&mut session).await;
    session.close();
    result
}

async fn follow(session: &mut RoomSession) -> anyhow::Result<()> {
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                println!();
                return Ok(());
            }
            change = session.next_change() => match change {
                Some(Ok(SyncUpdate::Inserted(id))) => {
                    if let Some(paste) = session.get(id) {
                        println!("{}", paste_line(paste));
                    }
                }
                Some(Ok(SyncUpdate::Duplicate(_))) => {}
                Some(Ok(SyncUpdate::Refetched(count))) => {
                    println!("-- room changed, {} --", paste_count(count));
                }
                Some(Err(e)) => warn!(error = %e, "{}", e.user_message()),
                None => return Ok(()),
            },
        }
    }
}
