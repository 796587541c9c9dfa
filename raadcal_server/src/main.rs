use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use raadcal_core::{
    config::ConfigArgs, fetcher::Fetcher, refresh::Refresher, source::HttpSourceClient,
    store::SnapshotStore,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::route::calendar::AppState;

mod route;
mod scheduler;

#[derive(Debug, Parser)]
#[command(version, about = "Serves the calendar of the Leiden municipal council")]
pub struct Arguments {
    #[command(flatten)]
    pub config: ConfigArgs,
    /// the address to listen on
    #[arg(long, env = "RAADCAL_LISTEN", default_value = "0.0.0.0:7070")]
    pub listen: SocketAddr,
    /// when to refresh the calendar, with seconds
    #[arg(long, env = "RAADCAL_CRON", default_value = "1 1 */6 * * *")]
    pub cron: String,
    /// the directory served for every path but the feed
    #[arg(long, env = "RAADCAL_STATIC_DIR", default_value = "html")]
    pub static_dir: PathBuf,
    /// the path the feed is served at
    #[arg(long, env = "RAADCAL_FEED_PATH", default_value = "/kalender/alles.ics")]
    pub feed_path: String,
    /// used when RUST_LOG is not set
    #[arg(long, env = "RAADCAL_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
    /// log as JSON lines
    #[arg(long, env = "RAADCAL_JSON_LOGS")]
    pub json_logs: bool,
}

fn init_logging(args: &Arguments) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let registry = tracing_subscriber::registry().with(filter);
    if args.json_logs {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry.with(fmt::layer().with_target(false)).init();
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Unable to listen for the shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Arguments::parse();
    init_logging(&args);
    let config = args.config.clone().into_config()?;
    let source = HttpSourceClient::new(&config)?;
    let store = Arc::new(SnapshotStore::new());
    let refresher = Arc::new(Refresher::new(
        Fetcher::new(&config, Arc::new(source))?,
        Arc::clone(&store),
    ));
    let mut scheduler = scheduler::start(&args.cron, Arc::clone(&refresher))
        .await
        .with_context(|| format!("could not schedule the refresh with {:?}", args.cron))?;
    let eager = Arc::clone(&refresher);
    tokio::spawn(async move {
        let _ = eager.refresh(Utc::now()).await;
    });

    let state = AppState {
        store,
        feed: Arc::new(config.feed),
    };
    let app = route::router(&args.feed_path, &args.static_dir, state);
    info!(listen = %args.listen, feed_path = %args.feed_path, "Serving the calendar");
    axum::Server::try_bind(&args.listen)
        .with_context(|| format!("could not listen on {}", args.listen))?
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    scheduler.shutdown().await?;
    Ok(())
}
