use std::{
    env::current_dir,
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
    sync::Arc,
};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use raadcal_core::{
    config::ConfigArgs, fetcher::Fetcher, render, source::HttpSourceClient, store::Snapshot,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(version, about = "Writes the calendar of the Leiden municipal council to a file")]
pub struct Arguments {
    #[command(flatten)]
    pub config: ConfigArgs,
    /// where to write the calendar, `calendar.ics` in the working directory by default
    #[arg(long, short)]
    pub output: Option<PathBuf>,
    /// used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Arguments::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();
    let config = args.config.into_config()?;
    let fetcher = Fetcher::new(&config, Arc::new(HttpSourceClient::new(&config)?))?;
    let now = Utc::now();
    let events = fetcher.fetch_all(now).await?;
    let path = match args.output {
        Some(path) => path,
        None => {
            let mut path = current_dir()?;
            path.push("calendar.ics");
            path
        }
    };
    let file = File::create(&path).with_context(|| format!("could not create {}", path.display()))?;
    let snapshot = Snapshot::new(events, now);
    let mut writer = BufWriter::new(file);
    render::render(&snapshot, &config.feed, &mut writer)?;
    writer.flush()?;
    info!(events = snapshot.events.len(), path = %path.display(), "Wrote the calendar");
    Ok(())
}
