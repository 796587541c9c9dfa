//! Runs the refresh on a cron schedule.

use std::sync::Arc;

use chrono::Utc;
use raadcal_core::refresh::Refresher;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tracing::debug;

/// Start a scheduler which refreshes the calendar whenever `cron` fires.
///
/// The outcome of every refresh is logged by the refresher itself.
pub async fn start(cron: &str, refresher: Arc<Refresher>) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    let job = Job::new_async(cron, move |_id, _lock| {
        let refresher = Arc::clone(&refresher);
        Box::pin(async move {
            debug!("Scheduled refresh started");
            let _ = refresher.refresh(Utc::now()).await;
        })
    })?;
    scheduler.add(job).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

#[cfg(test)]
mod tests {
    use raadcal_core::{
        config::Config, fetcher::Fetcher, source::HttpSourceClient, store::SnapshotStore,
    };

    use super::*;

    fn refresher() -> Arc<Refresher> {
        let config = Config::default();
        let source = HttpSourceClient::new(&config).unwrap();
        Arc::new(Refresher::new(
            Fetcher::new(&config, Arc::new(source)).unwrap(),
            Arc::new(SnapshotStore::new()),
        ))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_start() {
        let mut scheduler = start("1 1 */6 * * *", refresher()).await.unwrap();
        scheduler.shutdown().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_start_invalid_cron() {
        assert!(start("every six hours", refresher()).await.is_err());
    }
}
