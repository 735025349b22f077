//! Transactional mutation service over the storage layer.
//!
//! All writes go through [`BetService`], which validates against the domain
//! rules, applies the change in a single database transaction, and publishes
//! a [`ChangeEvent`] so listeners know which collection to refetch.

mod bets;
mod events;
mod social;

pub use events::ChangeEvent;

use tokio::sync::broadcast;

use crate::storage::Database;

const FEED_CAPACITY: usize = 64;

/// The mutation service. Cheap to clone; clones share the pool and feed.
#[derive(Clone)]
pub struct BetService {
    db: Database,
    feed: broadcast::Sender<ChangeEvent>,
}

impl BetService {
    pub fn new(db: Database) -> Self {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Self { db, feed }
    }

    /// Subscribe to the change feed. Events carry no payload; a receiver
    /// refetches the named collection, so a lagged receiver only over-fetches.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.feed.subscribe()
    }

    pub const fn database(&self) -> &Database {
        &self.db
    }

    fn publish(&self, event: ChangeEvent) {
        // No subscribers is fine.
        let _ = self.feed.send(event);
    }
}
