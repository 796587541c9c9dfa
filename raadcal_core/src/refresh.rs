//! The refresh invoked by the scheduler.

use std::{sync::Arc, time::Instant};

use chrono::{DateTime, Utc};
use tracing::{error, info, instrument, warn};

use crate::{
    fetcher::Fetcher,
    store::{Snapshot, SnapshotStore},
    Result,
};

pub struct Refresher {
    fetcher: Fetcher,
    store: Arc<SnapshotStore>,
}

impl Refresher {
    pub fn new(fetcher: Fetcher, store: Arc<SnapshotStore>) -> Self {
        Self { fetcher, store }
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// Fetch the calendar around `now` and publish it.
    ///
    /// The current snapshot stays published when anything fails. The outcome is logged, the
    /// returned value tells whether a new snapshot was published.
    #[instrument(skip(self))]
    pub async fn refresh(&self, now: DateTime<Utc>) -> Result<bool> {
        let started = Instant::now();
        let events = match self.fetcher.fetch_all(now).await {
            Ok(events) => events,
            Err(err) => {
                error!(error = %err, "Unable to fetch all calendar items, not updating the calendar");
                return Err(err);
            }
        };
        let count = events.len();
        let published = self.store.replace(Snapshot::new(events, now));
        if published {
            info!(
                events = count,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Published calendar"
            );
        } else {
            warn!("A newer calendar was published in the meantime, discarding this one");
        }
        Ok(published)
    }
}
