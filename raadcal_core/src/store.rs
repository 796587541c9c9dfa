//! Holds the snapshot which is currently published.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::event::CalendarEvent;

/// An immutable list of events together with the moment it was produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub events: Vec<CalendarEvent>,
    pub as_of: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(events: Vec<CalendarEvent>, as_of: DateTime<Utc>) -> Self {
        Self { events, as_of }
    }
}

/// Readers share the current snapshot, a refresh swaps it as a whole.
///
/// The lock is only held to clone or swap the reference, so readers never wait for a
/// refresh and never see a partially written snapshot.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: RwLock<Arc<Snapshot>>,
}

impl SnapshotStore {
    /// A store with an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read())
    }

    /// Publish `snapshot` unless the current one was produced later.
    ///
    /// Returns whether the snapshot was published. Refreshes may overlap, this keeps a slow
    /// older refresh from replacing the result of a newer one.
    pub fn replace(&self, snapshot: Snapshot) -> bool {
        let snapshot = Arc::new(snapshot);
        let mut current = self.current.write();
        if snapshot.as_of < current.as_of {
            return false;
        }
        *current = snapshot;
        true
    }
}
