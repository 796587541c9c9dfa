//! The enricher turns raw meetings into calendar events.
//!
//! It decides which meetings are published at all, resolves their dates in the right
//! timezone, derives the end of a meeting from its kind and canonicalizes links and
//! locations.

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde_json::Value;

use crate::{
    config::Config,
    event::{self, CalendarEvent, Document, DATE_TIME_FORMAT},
    parser::RawCandidate,
    Error, Result,
};

/// The time of day the source uses for meetings lasting all day.
static ALL_DAY_TIME: &str = "00:00";

/// Council meetings always end at this hour (UTC).
static COUNCIL_END_HOUR: u32 = 21;

#[derive(Debug, Clone)]
pub struct Enricher {
    timezone: Tz,
    base_url: String,
    excluded_categories: Vec<String>,
    venues: Vec<String>,
    venue_suffix: String,
    cutoff: Option<DateTime<Utc>>,
}

impl Enricher {
    pub fn new(config: &Config) -> Self {
        Self {
            timezone: config.timezone,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            excluded_categories: config
                .excluded_categories
                .iter()
                .map(|category| category.to_lowercase())
                .collect(),
            venues: config.venues.iter().map(|venue| venue.to_lowercase()).collect(),
            venue_suffix: config.venue_suffix.clone(),
            cutoff: config
                .cutoff
                .and_then(|cutoff| cutoff.and_hms_opt(0, 0, 0))
                .map(|cutoff| Utc.from_utc_datetime(&cutoff)),
        }
    }

    /// Whether the meeting is published at all.
    ///
    /// Cancelled meetings and meetings of an excluded category are not.
    pub fn should_include(&self, candidate: &RawCandidate) -> bool {
        if candidate.canceled {
            return false;
        }
        let category = candidate.category();
        !self
            .excluded_categories
            .iter()
            .any(|excluded| *excluded == category)
    }

    /// Whether the event starts on or after the configured cutoff date.
    pub fn within_cutoff(&self, event: &CalendarEvent) -> bool {
        self.cutoff.map_or(true, |cutoff| event.start >= cutoff)
    }

    pub fn enrich(
        &self,
        candidate: &RawCandidate,
        refreshed_at: DateTime<Utc>,
    ) -> Result<CalendarEvent> {
        let (start, all_day) = self.start(&candidate.date, &candidate.time)?;
        let title = upper_case_first_letter(&candidate.description);
        let end = end(&title, start, all_day);
        Ok(CalendarEvent {
            uid: event::uid(&start, &title),
            title,
            start,
            end,
            all_day,
            location: self.location(candidate.location.as_deref().unwrap_or_default()),
            link: self.link(candidate.link.as_deref().unwrap_or_default()),
            documents: self.documents(&candidate.documents),
            created: refreshed_at,
        })
    }

    /// Resolve the start of a meeting.
    ///
    /// All-day meetings are read as UTC, converting midnight from the local timezone would
    /// move them to the previous day.
    fn start(&self, date: &str, time: &str) -> Result<(DateTime<Utc>, bool)> {
        let time = time.trim();
        let all_day = time.is_empty() || time == ALL_DAY_TIME;
        let value = format!(
            "{} {}",
            date.trim(),
            if all_day { ALL_DAY_TIME } else { time }
        );
        let naive = NaiveDateTime::parse_from_str(&value, DATE_TIME_FORMAT).map_err(|err| {
            Error::Enrichment {
                value: value.clone(),
                reason: err.to_string(),
            }
        })?;
        if all_day {
            return Ok((Utc.from_utc_datetime(&naive), true));
        }
        let Some(local) = self.timezone.from_local_datetime(&naive).earliest() else {
            return Err(Error::Enrichment {
                reason: format!("the time does not exist in {}", self.timezone),
                value,
            });
        };
        Ok((local.with_timezone(&Utc), false))
    }

    /// Make a link absolute.
    fn link(&self, link: &str) -> String {
        let link = link.trim();
        if link.is_empty() {
            return String::new();
        }
        let mut canonical = String::new();
        if link.starts_with('/') {
            canonical.push_str(&self.base_url);
        } else if !link.contains("://") {
            canonical.push_str(&self.base_url);
            canonical.push('/');
        }
        canonical.push_str(&link.replace(' ', "%20"));
        canonical
    }

    /// Expand the short names of the rooms in the town hall.
    fn location(&self, location: &str) -> String {
        let lower = location.trim().to_lowercase();
        if self.venues.iter().any(|venue| *venue == lower) {
            return format!("{}{}", title_case(location.trim()), self.venue_suffix);
        }
        location.to_string()
    }

    fn documents(&self, documents: &[Value]) -> Vec<Document> {
        documents
            .iter()
            .filter_map(|document| {
                let title = document.get("title")?.as_str()?;
                let url = document.get("url")?.as_str()?;
                Some(Document {
                    title: title.to_string(),
                    url: self.link(url),
                })
            })
            .collect()
    }
}

/// Derive the end of a meeting from the first word of its title.
fn end(title: &str, start: DateTime<Utc>, all_day: bool) -> DateTime<Utc> {
    if all_day {
        return start;
    }
    let kind = title.split(' ').next().unwrap_or_default().to_lowercase();
    match kind.as_str() {
        "gemeenteraad" => start
            .date_naive()
            .and_hms_opt(COUNCIL_END_HOUR, 0, 0)
            .map(|end| Utc.from_utc_datetime(&end))
            .filter(|end| *end >= start)
            .unwrap_or(start),
        "raadscommissie" | "college" => start + Duration::hours(3),
        _ => start + Duration::hours(2),
    }
}

fn upper_case_first_letter(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn title_case(value: &str) -> String {
    value
        .split(' ')
        .map(upper_case_first_letter)
        .collect::<Vec<String>>()
        .join(" ")
}
