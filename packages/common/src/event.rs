use crate::paste::Paste;

/// A change-feed notification for one room.
///
/// Deletes carry no payload: a single delete and a room-wide clear look the
/// same to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Inserted(Paste),
    Deleted,
}

impl ChangeEvent {
    /// Event topic, used as a log field.
    pub fn topic(&self) -> &'static str {
        match self {
            Self::Inserted(_) => "insert",
            Self::Deleted => "delete",
        }
    }
}
