use std::collections::HashSet;

use common::{ChangeEvent, Paste};
use uuid::Uuid;

/// Ids seen by a polling change feed on its previous pass.
#[derive(Debug, Default)]
pub(crate) struct Snapshot {
    ids: HashSet<Uuid>,
}

impl Snapshot {
    pub(crate) fn new(pastes: &[Paste]) -> Self {
        Self {
            ids: pastes.iter().map(|p| p.id).collect(),
        }
    }

    /// Events that turn the previous pass into `current`, then remember `current`.
    ///
    /// `current` is newest first. New rows come out oldest first so a consumer
    /// that prepends ends up in the right order; vanished rows collapse into a
    /// single trailing [`ChangeEvent::Deleted`].
    pub(crate) fn advance(&mut self, current: &[Paste]) -> Vec<ChangeEvent> {
        let mut events: Vec<ChangeEvent> = current
            .iter()
            .rev()
            .filter(|p| !self.ids.contains(&p.id))
            .cloned()
            .map(ChangeEvent::Inserted)
            .collect();

        let next: HashSet<Uuid> = current.iter().map(|p| p.id).collect();
        if self.ids.iter().any(|id| !next.contains(id)) {
            events.push(ChangeEvent::Deleted);
        }

        self.ids = next;
        events
    }
}
