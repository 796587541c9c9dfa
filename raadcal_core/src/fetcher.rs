//! Fetches every month of the calendar concurrently and merges the results.

use std::{sync::Arc, time::Instant};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::{
    collector::Collector,
    config::Config,
    enricher::Enricher,
    error::FetchFailures,
    event::CalendarEvent,
    parser::SourceFormat,
    source::SourceClient,
    window::{months_around, MonthKey},
    Error, Result,
};

pub struct Fetcher {
    source: Arc<dyn SourceClient>,
    format: SourceFormat,
    enricher: Arc<Enricher>,
    timezone: Tz,
    months_before: u32,
    months_total: u32,
}

impl Fetcher {
    /// Fails when the configuration leaves no month to fetch.
    pub fn new(config: &Config, source: Arc<dyn SourceClient>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            source,
            format: config.format,
            enricher: Arc::new(Enricher::new(config)),
            timezone: config.timezone,
            months_before: config.months_before,
            months_total: config.months_total,
        })
    }

    /// The months fetched for a refresh at `anchor`, in chronological order.
    pub fn windows(&self, anchor: DateTime<Utc>) -> Vec<MonthKey> {
        let local = anchor.with_timezone(&self.timezone).date_naive();
        months_around(local, self.months_before, self.months_total)
    }

    /// Fetch all months around `anchor`.
    ///
    /// Either every month succeeds and all of their events are returned, in the order the
    /// months arrived, or nothing is returned and the error names every failed month.
    /// There is no overall timeout, a month which never finishes stalls the refresh.
    pub async fn fetch_all(&self, anchor: DateTime<Utc>) -> Result<Vec<CalendarEvent>> {
        let started = Instant::now();
        let windows = self.windows(anchor);
        let (collector, handle) = Collector::start();
        let mut tasks = JoinSet::new();
        for window in &windows {
            let reporter = handle.reporter(*window);
            let source = Arc::clone(&self.source);
            let enricher = Arc::clone(&self.enricher);
            let format = self.format;
            let window = *window;
            tasks.spawn(async move {
                let result = fetch_window(source.as_ref(), format, &enricher, window, anchor).await;
                reporter.accept(result);
            });
        }
        drop(handle);
        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                error!(error = %err, "Calendar fetch task crashed");
            }
        }
        let collected = collector.finalize().await?;
        if !collected.failures.is_empty() {
            return Err(Error::Fetch(FetchFailures::new(collected.failures)));
        }
        debug!(
            months = windows.len(),
            events = collected.items.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Fetched all calendar months"
        );
        Ok(collected.items)
    }
}

/// Fetch, parse and enrich a single month.
///
/// Items which can't be enriched are skipped, they don't fail the month.
async fn fetch_window(
    source: &dyn SourceClient,
    format: SourceFormat,
    enricher: &Enricher,
    window: MonthKey,
    refreshed_at: DateTime<Utc>,
) -> Result<Vec<CalendarEvent>> {
    let body = source.fetch_one(window).await?;
    let candidates = format.parse(&body)?;
    let mut events = Vec::with_capacity(candidates.len());
    for candidate in &candidates {
        if !enricher.should_include(candidate) {
            continue;
        }
        match enricher.enrich(candidate, refreshed_at) {
            Ok(event) if enricher.within_cutoff(&event) => events.push(event),
            Ok(_) => {}
            Err(err) => warn!(
                %window,
                description = %candidate.description,
                error = %err,
                "Unable to enrich item, skipping it"
            ),
        }
    }
    debug!(%window, candidates = candidates.len(), events = events.len(), "Fetched calendar month");
    Ok(events)
}
