pub mod config;
pub mod event;
pub mod paste;
pub mod path;
pub mod storage;

pub use event::ChangeEvent;
pub use paste::{InvalidRoomCode, NewPaste, Paste, PasteKind, RoomCode};
