//! Errors which can occur while fetching, parsing and publishing the calendar.

use std::fmt;

use thiserror::Error;

use crate::window::MonthKey;

pub type Result<T> = std::result::Result<T, Error>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
    /// The request for a month could not be sent or its body could not be read.
    #[error("could not fetch the calendar from [{url}]: {source}")]
    Transport {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("[{url}] answered with status {status}")]
    Status { url: String, status: u16 },

    /// The body of a month does not have the expected structure.
    #[error("unable to parse calendar items: {0}")]
    Parse(String),

    /// The date or time of a single item could not be interpreted.
    #[error("unable to parse event date {value:?}: {reason}")]
    Enrichment { value: String, reason: String },

    #[error(transparent)]
    Fetch(#[from] FetchFailures),

    #[error("the fetch task stopped without reporting a result")]
    Abandoned,

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("could not render the calendar: {0}")]
    Render(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

/// The failure of a single month during a refresh.
#[derive(Debug)]
pub struct WindowFailure {
    pub window: MonthKey,
    pub error: Error,
}

/// Every month which failed during one refresh.
///
/// The order follows the order in which the failures arrived and is not stable across runs.
#[derive(Debug)]
pub struct FetchFailures {
    failures: Vec<WindowFailure>,
}

impl FetchFailures {
    pub fn new(failures: Vec<WindowFailure>) -> Self {
        Self { failures }
    }

    pub fn failures(&self) -> &[WindowFailure] {
        &self.failures
    }

    pub fn windows(&self) -> impl Iterator<Item = MonthKey> + '_ {
        self.failures.iter().map(|failure| failure.window)
    }
}

impl fmt::Display for FetchFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "could not update items because the following error(s) occurred:"
        )?;
        for failure in &self.failures {
            write!(f, "\n[{}] {}", failure.window, failure.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for FetchFailures {}
