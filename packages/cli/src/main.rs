mod backend;
mod clipboard;
mod commands;
mod config;
mod pin;
mod render;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use session::{ExportFormat, ExportOrder};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::pin::PinFile;

#[derive(Parser)]
#[command(name = "clypsync", version, about = "Share a clipboard through a room PIN")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Join a room and copy its newest text paste
    Join {
        /// Numeric room PIN
        pin: String,
    },
    /// Leave the current room
    Leave,
    /// Show the joined room and its paste count
    Status,
    /// List the newest pastes
    List {
        #[arg(short, long, default_value_t = 5)]
        limit: usize,
    },
    /// Add a text paste
    Add {
        /// Text to share; surrounding whitespace is trimmed
        text: String,
    },
    /// Upload an image and add it as a paste
    AddImage { file: PathBuf },
    /// Add the text currently on the system clipboard
    Paste,
    /// Copy a paste to the system clipboard
    Copy {
        /// Paste id, or a unique prefix of one
        id: String,
    },
    /// Delete one paste
    Delete {
        /// Paste id, or a unique prefix of one
        id: String,
    },
    /// Delete every paste in the room
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Write the room's pastes to a file
    Export {
        #[arg(short, long, default_value = "json")]
        format: ExportFormat,
        #[arg(short, long, default_value = "newest")]
        order: ExportOrder,
        /// Output path. Defaults to clypsync-{pin}.{json|txt}
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Follow the room live until Ctrl-C
    Watch,
    /// Keep a copied selection alive until another application replaces it
    #[command(name = clipboard::HOLD_COMMAND, hide = true)]
    HoldClipboard,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Command::HoldClipboard = cli.command {
        return clipboard::hold_from_stdin();
    }

    let config = AppConfig::load().context("Failed to load config")?;
    let pin = PinFile::new(config.pin_file.clone(), config.room.pin_length);

    match cli.command {
        Command::Join { pin: raw } => commands::join(&config, &pin, &raw).await,
        Command::Leave => commands::leave(&pin),
        Command::Status => commands::status(&config, &pin).await,
        Command::List { limit } => commands::list(&config, &pin, limit).await,
        Command::Add { text } => commands::add_text(&config, &pin, &text).await,
        Command::AddImage { file } => commands::add_image(&config, &pin, &file).await,
        Command::Paste => commands::paste(&config, &pin).await,
        Command::Copy { id } => commands::copy(&config, &pin, &id).await,
        Command::Delete { id } => commands::delete(&config, &pin, &id).await,
        Command::Clear { yes } => commands::clear(&config, &pin, yes).await,
        Command::Export { format, order, out } => {
            commands::export(&config, &pin, format, order, out).await
        }
        Command::Watch => commands::watch(&config, &pin).await,
        Command::HoldClipboard => Ok(()),
    }
}
