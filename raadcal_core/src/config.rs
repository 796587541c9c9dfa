//! The configuration is built once at startup and shared by every component.

use std::time::Duration;

use chrono::NaiveDate;
use chrono_tz::Tz;

use crate::{parser::SourceFormat, Error, Result};

pub static DEFAULT_SOURCE_URL: &str = "https://leiden.notubiz.nl/api/calendar/callback_function";
pub static DEFAULT_CALLBACK: &str = "raad071cal";
pub static DEFAULT_BASE_URL: &str = "https://leiden.notubiz.nl";
pub static DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Amsterdam;
pub static DEFAULT_EXCLUDED_CATEGORIES: [&str; 1] = ["fractievergadering"];
pub static DEFAULT_VENUES: [&str; 2] = ["raadzaal", "commissiekamer"];
pub static DEFAULT_VENUE_SUFFIX: &str = ", Stadhuis, Leiden";
pub static DEFAULT_USER_AGENT: &str = concat!("raadcal/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct Config {
    pub format: SourceFormat,
    pub source_url: String,
    /// Name of the JSONP callback the API wraps its answer in.
    pub callback: String,
    /// Relative links of the source are resolved against this URL.
    pub base_url: String,
    /// Civil timezone the source writes its dates and times in.
    pub timezone: Tz,
    pub months_before: u32,
    pub months_total: u32,
    /// Lower-cased descriptions of meetings which are never published.
    pub excluded_categories: Vec<String>,
    /// Lower-cased location names which are expanded with `venue_suffix`.
    pub venues: Vec<String>,
    pub venue_suffix: String,
    /// Events starting before this date are dropped.
    pub cutoff: Option<NaiveDate>,
    pub request_timeout: Duration,
    pub user_agent: String,
    pub feed: FeedMeta,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            format: SourceFormat::Notubiz,
            source_url: String::from(DEFAULT_SOURCE_URL),
            callback: String::from(DEFAULT_CALLBACK),
            base_url: String::from(DEFAULT_BASE_URL),
            timezone: DEFAULT_TIMEZONE,
            months_before: 5,
            months_total: 18,
            excluded_categories: DEFAULT_EXCLUDED_CATEGORIES.map(String::from).to_vec(),
            venues: DEFAULT_VENUES.map(String::from).to_vec(),
            venue_suffix: String::from(DEFAULT_VENUE_SUFFIX),
            cutoff: None,
            request_timeout: Duration::from_secs(30),
            user_agent: String::from(DEFAULT_USER_AGENT),
            feed: FeedMeta::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.months_total == 0 {
            return Err(Error::Config(String::from(
                "at least one month has to be fetched",
            )));
        }
        if self.months_before >= self.months_total {
            return Err(Error::Config(format!(
                "{} months before the current one leave no room in a total of {}",
                self.months_before, self.months_total
            )));
        }
        if self.source_url.is_empty() {
            return Err(Error::Config(String::from("the source URL is empty")));
        }
        Ok(())
    }
}

/// Describes the published feed itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedMeta {
    pub prod_id: String,
    pub url: String,
    pub name: String,
    pub description: String,
    /// How often clients should poll, as an iCalendar duration.
    pub ttl: String,
    /// Appended to every event id to make it globally unique.
    pub uid_domain: String,
}

impl Default for FeedMeta {
    fn default() -> Self {
        Self {
            prod_id: String::from("-//mdirkse/raad071cal//NONSGML v1.0//EN"),
            url: String::from("http://raad071.mdirkse.nl/kalender/alles.ics"),
            name: String::from("#raad071 kalender"),
            description: String::from("De politieke agenda van de Leidse gemeenteraad"),
            ttl: String::from("PT6H"),
            uid_domain: String::from("raad071.mdirkse.nl"),
        }
    }
}

/// Command line flags shared by the server and the command line tool.
#[cfg(feature = "clap")]
#[derive(Debug, Clone, clap::Args)]
pub struct ConfigArgs {
    /// the format the source serves its calendar in
    #[arg(long, env = "RAADCAL_FORMAT", value_enum, default_value_t = SourceFormat::Notubiz)]
    pub format: SourceFormat,
    /// the URL a month of the calendar is requested from
    #[arg(long, env = "RAADCAL_SOURCE_URL", default_value = DEFAULT_SOURCE_URL)]
    pub source_url: String,
    /// the JSONP callback name sent to the source
    #[arg(long, env = "RAADCAL_CALLBACK", default_value = DEFAULT_CALLBACK)]
    pub callback: String,
    /// relative links are resolved against this URL
    #[arg(long, env = "RAADCAL_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,
    /// the timezone of the dates served by the source
    #[arg(long, env = "RAADCAL_TIMEZONE", default_value = "Europe/Amsterdam")]
    pub timezone: String,
    /// months fetched before the current one
    #[arg(long, env = "RAADCAL_MONTHS_BEFORE", default_value_t = 5)]
    pub months_before: u32,
    /// months fetched in total, including the current one
    #[arg(long, env = "RAADCAL_MONTHS_TOTAL", default_value_t = 18)]
    pub months_total: u32,
    /// meeting descriptions which are never published
    #[arg(long = "exclude", env = "RAADCAL_EXCLUDE", value_delimiter = ',', default_values = DEFAULT_EXCLUDED_CATEGORIES)]
    pub excluded_categories: Vec<String>,
    /// location names which are expanded with the venue suffix
    #[arg(long = "venue", env = "RAADCAL_VENUES", value_delimiter = ',', default_values = DEFAULT_VENUES)]
    pub venues: Vec<String>,
    /// appended to expanded location names
    #[arg(long, env = "RAADCAL_VENUE_SUFFIX", default_value = DEFAULT_VENUE_SUFFIX)]
    pub venue_suffix: String,
    /// drop events starting before this date (YYYY-MM-DD)
    #[arg(long, env = "RAADCAL_CUTOFF")]
    pub cutoff: Option<NaiveDate>,
    /// timeout of a single request in seconds
    #[arg(long, env = "RAADCAL_TIMEOUT", default_value_t = 30)]
    pub timeout: u64,
    /// the user agent sent to the source
    #[arg(long, env = "RAADCAL_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,
    /// the public URL of the feed
    #[arg(long, env = "RAADCAL_FEED_URL")]
    pub feed_url: Option<String>,
    /// the name of the feed shown by calendar clients
    #[arg(long, env = "RAADCAL_FEED_NAME")]
    pub feed_name: Option<String>,
    /// the domain appended to event ids
    #[arg(long, env = "RAADCAL_UID_DOMAIN")]
    pub uid_domain: Option<String>,
}

#[cfg(feature = "clap")]
impl ConfigArgs {
    pub fn into_config(self) -> Result<Config> {
        let timezone: Tz = self
            .timezone
            .parse()
            .map_err(|err| Error::Config(format!("unknown timezone {}: {err}", self.timezone)))?;
        let defaults = FeedMeta::default();
        let config = Config {
            format: self.format,
            source_url: self.source_url,
            callback: self.callback,
            base_url: self.base_url,
            timezone,
            months_before: self.months_before,
            months_total: self.months_total,
            excluded_categories: lowercase(self.excluded_categories),
            venues: lowercase(self.venues),
            venue_suffix: self.venue_suffix,
            cutoff: self.cutoff,
            request_timeout: Duration::from_secs(self.timeout),
            user_agent: self.user_agent,
            feed: FeedMeta {
                url: self.feed_url.unwrap_or(defaults.url),
                name: self.feed_name.unwrap_or(defaults.name),
                uid_domain: self.uid_domain.unwrap_or(defaults.uid_domain),
                ..defaults
            },
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(feature = "clap")]
fn lowercase(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|value| value.trim().to_lowercase())
        .filter(|value| !value.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_window_counts() {
        let config = Config {
            months_total: 0,
            months_before: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
        let config = Config {
            months_total: 5,
            months_before: 5,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[cfg(feature = "clap")]
    #[test]
    fn test_config_args() {
        use clap::Parser;

        #[derive(Debug, Parser)]
        struct Arguments {
            #[command(flatten)]
            config: ConfigArgs,
        }

        let config = Arguments::parse_from(["raadcal"]).config.into_config().unwrap();
        assert_eq!(config.timezone, chrono_tz::Europe::Amsterdam);
        assert_eq!(config.excluded_categories, vec!["fractievergadering"]);
        assert_eq!(config.venues, vec!["raadzaal", "commissiekamer"]);
        assert_eq!(config.feed, FeedMeta::default());

        let config = Arguments::parse_from([
            "raadcal",
            "--timezone",
            "Europe/Berlin",
            "--exclude",
            "Fractievergadering,Presidium",
            "--cutoff",
            "2016-01-01",
        ])
        .config
        .into_config()
        .unwrap();
        assert_eq!(config.timezone, chrono_tz::Europe::Berlin);
        assert_eq!(config.excluded_categories, vec!["fractievergadering", "presidium"]);
        assert_eq!(config.cutoff, NaiveDate::from_ymd_opt(2016, 1, 1));

        let result = Arguments::parse_from(["raadcal", "--timezone", "Mars/Olympus"])
            .config
            .into_config();
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
