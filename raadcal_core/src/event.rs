//! The events published in the calendar.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// The layout the source uses for a date with a time of day.
pub static DATE_TIME_FORMAT: &str = "%d-%m-%Y %H:%M";

/// A fully enriched meeting.
///
/// Start and end are always in UTC. For all-day events they are equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub uid: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    pub location: String,
    /// An absolute URL or empty.
    pub link: String,
    pub documents: Vec<Document>,
    /// The moment of the refresh which produced this event.
    pub created: DateTime<Utc>,
}

/// A document attached to a meeting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub title: String,
    pub url: String,
}

/// Get a unique id for a meeting starting at a specific time.
///
/// Calendar clients correlate refreshed events by this id, so changing this function is a
/// breaking change!
pub fn uid(start: &DateTime<Utc>, title: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(start.format(DATE_TIME_FORMAT).to_string());
    hasher.update(title);
    hex::encode(hasher.finalize())
}
