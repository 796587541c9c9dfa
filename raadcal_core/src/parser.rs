//! Parsers turning the body of one month into raw meeting records.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::{Error, Result};

/// Matches a JSONP answer like `callback_function({...})`.
static JSONP_ENVELOPE: &str = r"(?s)^\s*[A-Za-z_$][\w$.]*\s*\((?P<payload>.*)\)\s*;?\s*$";

/// The number of cells of a meeting row in the legacy calendar table.
static TABLE_FIELDS: usize = 4;

/// The way a source lays out its records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum SourceFormat {
    /// The JSON calendar API, wrapped in a JSONP callback.
    #[default]
    Notubiz,
    /// The legacy HTML calendar page.
    Notudoc,
}

impl SourceFormat {
    pub fn parse(self, body: &[u8]) -> Result<Vec<RawCandidate>> {
        match self {
            Self::Notubiz => {
                let text = std::str::from_utf8(body)
                    .map_err(|err| Error::Parse(format!("the body is not UTF-8: {err}")))?;
                parse_jsonp(text)
            }
            Self::Notudoc => parse_table(&String::from_utf8_lossy(body)),
        }
    }
}

/// A meeting as served by the source, before any interpretation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawCandidate {
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// The day in `DD-MM-YYYY` notation.
    #[serde(default, deserialize_with = "null_as_default")]
    pub date: String,
    /// The time of day in `HH:MM` notation, `00:00` for meetings lasting all day.
    #[serde(default, deserialize_with = "null_as_default")]
    pub time: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub documents: Vec<Value>,
    #[serde(default, alias = "cancelled", deserialize_with = "null_as_default")]
    pub canceled: bool,
}

impl RawCandidate {
    /// The normalized category a meeting is filtered by.
    pub fn category(&self) -> String {
        self.description.trim().to_lowercase()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Deserialize)]
struct CalendarMonth {
    meetings: Vec<RawCandidate>,
}

/// Parse the answer of the calendar API.
///
/// Bare JSON is accepted as well as JSON wrapped in a callback.
fn parse_jsonp(body: &str) -> Result<Vec<RawCandidate>> {
    let envelope = Regex::new(JSONP_ENVELOPE).map_err(|err| Error::Parse(err.to_string()))?;
    let json = match envelope.captures(body) {
        Some(captures) => captures.name("payload").map_or("", |payload| payload.as_str()),
        None if body.trim_start().starts_with('{') => body,
        None => {
            return Err(Error::Parse(String::from(
                "expected a JSONP callback or a JSON object",
            )))
        }
    };
    let month: CalendarMonth = serde_json::from_str(json)
        .map_err(|err| Error::Parse(format!("invalid calendar JSON: {err}")))?;
    Ok(month.meetings)
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|err| Error::Parse(format!("invalid selector {css}: {err}")))
}

fn text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<&str>>()
        .join(" ")
}

/// Parse the legacy calendar page.
///
/// Every meeting is a row of `table.calendar` with the cells date, time, description and
/// location. Rows without cells are headers; any other cell count fails the whole page.
fn parse_table(html: &str) -> Result<Vec<RawCandidate>> {
    let dom = Html::parse_document(html);
    let table_selector = selector("table.calendar")?;
    let row_selector = selector("tr")?;
    let cell_selector = selector("td")?;
    let link_selector = selector("a[href]")?;
    let Some(table) = dom.select(&table_selector).next() else {
        return Err(Error::Parse(String::from("no calendar table found")));
    };
    let mut candidates = vec![];
    for (index, row) in table.select(&row_selector).enumerate() {
        let cells: Vec<ElementRef> = row.select(&cell_selector).collect();
        if cells.is_empty() {
            continue;
        }
        let [date, time, description, location] = cells.as_slice() else {
            return Err(Error::Parse(format!(
                "row {index} has {} cells instead of {TABLE_FIELDS}",
                cells.len()
            )));
        };
        let link = description
            .select(&link_selector)
            .next()
            .and_then(|anchor| anchor.value().attr("href"))
            .map(String::from);
        let location = Some(text(location)).filter(|location| !location.is_empty());
        candidates.push(RawCandidate {
            description: text(description),
            date: text(date),
            time: text(time),
            link,
            location,
            documents: vec![],
            canceled: row
                .value()
                .classes()
                .any(|class| class.eq_ignore_ascii_case("canceled")),
        });
    }
    Ok(candidates)
}
