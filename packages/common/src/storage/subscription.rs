use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::event::ChangeEvent;
use crate::paste::RoomCode;

/// A live change feed for one room.
///
/// Events arrive in commit order. The feed is at-least-once: a consumer may see
/// an insert it already fetched, and a lagging producer falls back to
/// [`ChangeEvent::Deleted`] so the consumer re-fetches.
///
/// Closing is idempotent, and dropping the subscription closes it.
pub struct Subscription {
    room: RoomCode,
    events: mpsc::Receiver<ChangeEvent>,
    producer: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Wrap a receiver fed by `producer`. The producer task is aborted on close.
    pub fn new(
        room: RoomCode,
        events: mpsc::Receiver<ChangeEvent>,
        producer: JoinHandle<()>,
    ) -> Self {
        Self {
            room,
            events,
            producer: Some(producer),
        }
    }

    pub fn room(&self) -> &RoomCode {
        &self.room
    }

    /// Next event, or `None` once the feed is closed or the producer ended.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        if self.producer.is_none() {
            return None;
        }
        self.events.recv().await
    }

    /// An event that is already queued, without waiting.
    pub fn try_recv(&mut self) -> Option<ChangeEvent> {
        if self.producer.is_none() {
            return None;
        }
        self.events.try_recv().ok()
    }

    pub fn is_closed(&self) -> bool {
        self.producer.is_none()
    }

    /// Tear down the feed. Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(producer) = self.producer.take() {
            producer.abort();
            self.events.close();
            debug!(room = %self.room, "Change feed closed");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("room", &self.room)
            .field("closed", &self.is_closed())
            .finish()
    }
}
