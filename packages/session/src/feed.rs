use std::sync::Arc;
use std::time::Duration;

use common::storage::{PasteStore, Subscription};
use common::{ChangeEvent, RoomCode};
use tracing::{debug, instrument, trace};

use crate::error::{RemoteError, bounded};

/// Opens change feeds for rooms.
#[derive(Clone)]
pub struct ChangeFeedSubscriber {
    store: Arc<dyn PasteStore>,
    timeout: Duration,
}

impl ChangeFeedSubscriber {
    pub fn new(store: Arc<dyn PasteStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Start listening to `room`. Mutations committed after this returns are
    /// delivered.
    #[instrument(skip(self), fields(room = %room))]
    pub async fn subscribe(&self, room: &RoomCode) -> Result<ChangeFeed, RemoteError> {
        let subscription = bounded(self.timeout, self.store.subscribe(room)).await?;
        debug!("Subscribed to change feed");
        Ok(ChangeFeed { subscription })
    }
}

/// A room's change feed, as seen by a session.
///
/// Inserts for other rooms are dropped. A delete swallows whatever else is
/// already queued: the re-fetch it triggers observes all of it.
#[derive(Debug)]
pub struct ChangeFeed {
    subscription: Subscription,
}

impl ChangeFeed {
    pub fn room(&self) -> &RoomCode {
        self.subscription.room()
    }

    /// Next event for this room, or `None` once the feed is closed.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.subscription.recv().await? {
                ChangeEvent::Inserted(paste) if &paste.room_code != self.room() => {
                    trace!(room = %paste.room_code, "Dropped event for another room");
                }
                ChangeEvent::Deleted => {
                    let mut coalesced = 0usize;
                    while self.subscription.try_recv().is_some() {
                        coalesced += 1;
                    }
                    if coalesced > 0 {
                        trace!(coalesced, "Coalesced queued events into one re-fetch");
                    }
                    return Some(ChangeEvent::Deleted);
                }
                event => return Some(event),
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.subscription.is_closed()
    }

    /// Stop listening. Safe to call more than once.
    pub fn close(&mut self) {
        self.subscription.close();
    }
}
