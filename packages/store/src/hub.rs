use common::ChangeEvent;
use common::RoomCode;
use common::storage::Subscription;
use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

/// In-process fan-out of change events, one broadcast channel per room.
///
/// Channels are created on first subscribe and dropped once a publish finds no
/// receivers left.
pub struct ChangeHub {
    channels: DashMap<RoomCode, broadcast::Sender<ChangeEvent>>,
    capacity: usize,
}

impl ChangeHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Deliver `event` to every current subscriber of `room`.
    pub fn publish(&self, room: &RoomCode, event: ChangeEvent) {
        let topic = event.topic();
        let delivered = match self.channels.get(room) {
            Some(tx) => tx.send(event).unwrap_or(0),
            None => 0,
        };

        if delivered == 0 {
            self.channels
                .remove_if(room, |_, tx| tx.receiver_count() == 0);
        }
        debug!(room = %room, topic, delivered, "Published change event");
    }

    /// Number of live subscribers for `room`.
    pub fn subscriber_count(&self, room: &RoomCode) -> usize {
        self.channels
            .get(room)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    /// Open a feed for `room`. Live as soon as this returns.
    pub fn subscribe(&self, room: &RoomCode) -> Subscription {
        let mut source = self
            .channels
            .entry(room.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();

        let (tx, rx) = mpsc::channel(self.capacity);
        let task_room = room.clone();
        let producer = tokio::spawn(async move {
            loop {
                let event = match source.recv().await {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(room = %task_room, skipped, "Change feed lagged, forcing re-fetch");
                        ChangeEvent::Deleted
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        });

        Subscription::new(room.clone(), rx, producer)
    }
}

impl Default for ChangeHub {
    fn default() -> Self {
        Self::new(64)
    }
}
