//! Renders a snapshot as an iCalendar feed.

use std::io::Write;

use chrono::{DateTime, Duration, Utc};
use ical::{
    generator::{Emitter, IcalCalendar, IcalCalendarBuilder, IcalEvent, Property},
    ical_param, ical_property,
};

use crate::{config::FeedMeta, event::CalendarEvent, store::Snapshot, Result};

static DATE_FORMAT: &str = "%Y%m%d";
static DATE_TIME_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Write the snapshot as an iCalendar file.
pub fn render<W: Write>(snapshot: &Snapshot, feed: &FeedMeta, writer: &mut W) -> Result<()> {
    writer.write_all(calendar(snapshot, feed).generate().as_bytes())?;
    Ok(())
}

/// Build the calendar from the snapshot.
pub fn calendar(snapshot: &Snapshot, feed: &FeedMeta) -> IcalCalendar {
    let mut calendar = IcalCalendarBuilder::version("2.0")
        .gregorian()
        .prodid(feed.prod_id.as_str())
        .build();
    for (name, value) in [
        ("URL", feed.url.as_str()),
        ("NAME", feed.name.as_str()),
        ("X-WR-CALNAME", feed.name.as_str()),
        ("DESCRIPTION", feed.description.as_str()),
        ("X-WR-CALDESC", feed.description.as_str()),
        ("X-PUBLISHED-TTL", feed.ttl.as_str()),
    ] {
        calendar.properties.push(Property {
            name: String::from(name),
            value: Some(escape(value)),
            params: None,
        });
    }
    for event in &snapshot.events {
        calendar.events.push(ical_event(event, &feed.uid_domain));
    }
    calendar
}

fn ical_event(event: &CalendarEvent, uid_domain: &str) -> IcalEvent {
    let mut ical_event = IcalEvent::new();
    let properties = &mut ical_event.properties;
    properties.push(ical_property!(
        "UID",
        format!("{}@{}", event.uid, uid_domain)
    ));
    properties.push(ical_property!("DTSTAMP", date_time(&event.created)));
    if event.all_day {
        // DTEND of a date is exclusive.
        let end = event.end + Duration::days(1);
        properties.push(ical_property!(
            "DTSTART",
            event.start.format(DATE_FORMAT).to_string(),
            ical_param!("VALUE", "DATE")
        ));
        properties.push(ical_property!(
            "DTEND",
            end.format(DATE_FORMAT).to_string(),
            ical_param!("VALUE", "DATE")
        ));
    } else {
        properties.push(ical_property!("DTSTART", date_time(&event.start)));
        properties.push(ical_property!("DTEND", date_time(&event.end)));
    }
    properties.push(ical_property!("SUMMARY", escape(&event.title)));
    properties.push(ical_property!("DESCRIPTION", escape(&description(event))));
    properties.push(ical_property!("LOCATION", escape(&event.location)));
    if !event.link.is_empty() {
        properties.push(ical_property!("URL", event.link.as_str()));
    }
    ical_event
}

fn date_time(value: &DateTime<Utc>) -> String {
    value.format(DATE_TIME_FORMAT).to_string()
}

/// The link to the meeting followed by its documents.
fn description(event: &CalendarEvent) -> String {
    let mut description = String::new();
    if !event.link.is_empty() {
        description.push_str(&format!("Notubiz link: {}\n", event.link));
    }
    if !event.documents.is_empty() {
        description.push_str("Documents:\n");
        for document in &event.documents {
            description.push_str(&format!("- {} {}\n", document.title, document.url));
        }
    }
    description
}

/// Escape a text value as required by RFC 5545.
fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            ';' => escaped.push_str("\\;"),
            ',' => escaped.push_str("\\,"),
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::event::Document;

    fn created() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2016, 6, 23, 14, 0, 0).unwrap()
    }

    fn snapshot() -> Snapshot {
        let all_day = CalendarEvent {
            uid: String::from("8fd9b587060331dd"),
            title: String::from("Einde zomerreces"),
            start: Utc.with_ymd_and_hms(2016, 6, 23, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2016, 6, 23, 0, 0, 0).unwrap(),
            all_day: true,
            location: String::new(),
            link: String::new(),
            documents: vec![],
            created: created(),
        };
        let meeting = CalendarEvent {
            uid: String::from("15668344f20e7d5d"),
            title: String::from("Instructiebijeenkomst Raad071Cal"),
            start: Utc.with_ymd_and_hms(2016, 6, 23, 17, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2016, 6, 23, 19, 0, 0).unwrap(),
            all_day: false,
            location: String::from("Raadzaal, Stadhuis, Leiden"),
            link: String::from("https://leiden.notubiz.nl/raad071cal.html"),
            documents: vec![Document {
                title: String::from("iCal spec"),
                url: String::from("https://www.ietf.org/rfc/rfc2445.txt"),
            }],
            created: created(),
        };
        Snapshot::new(vec![all_day, meeting], created())
    }

    /// Undo line folding so long lines can be compared as a whole.
    fn unfold(ics: &str) -> String {
        ics.replace("\r\n ", "").replace("\r\n\t", "")
    }

    fn render_to_string(snapshot: &Snapshot) -> String {
        let mut output = Vec::new();
        render(snapshot, &FeedMeta::default(), &mut output).unwrap();
        unfold(&String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_render() {
        let ics = render_to_string(&snapshot());
        let lines: Vec<&str> = ics.lines().collect();
        assert_eq!(lines.first(), Some(&"BEGIN:VCALENDAR"));
        assert_eq!(lines.last(), Some(&"END:VCALENDAR"));
        for expected in [
            "VERSION:2.0",
            "PRODID:-//mdirkse/raad071cal//NONSGML v1.0//EN",
            "X-WR-CALNAME:#raad071 kalender",
            "X-PUBLISHED-TTL:PT6H",
            "UID:8fd9b587060331dd@raad071.mdirkse.nl",
            "DTSTAMP:20160623T140000Z",
            "DTSTART;VALUE=DATE:20160623",
            "DTEND;VALUE=DATE:20160624",
            "SUMMARY:Einde zomerreces",
            "UID:15668344f20e7d5d@raad071.mdirkse.nl",
            "DTSTART:20160623T170000Z",
            "DTEND:20160623T190000Z",
            "LOCATION:Raadzaal\\, Stadhuis\\, Leiden",
            "DESCRIPTION:Notubiz link: https://leiden.notubiz.nl/raad071cal.html\\nDocuments:\\n- iCal spec https://www.ietf.org/rfc/rfc2445.txt\\n",
        ] {
            assert!(lines.contains(&expected), "missing {expected:?} in\n{ics}");
        }
        assert_eq!(lines.iter().filter(|line| **line == "BEGIN:VEVENT").count(), 2);
    }

    #[test]
    fn test_calendar_properties() {
        let feed = FeedMeta {
            name: String::from("Raad, commissies; college"),
            ..FeedMeta::default()
        };
        let calendar = calendar(&Snapshot::default(), &feed);
        let value = |name: &str| {
            calendar
                .properties
                .iter()
                .find(|property| property.name == name)
                .and_then(|property| property.value.clone())
        };
        assert_eq!(
            value("URL").as_deref(),
            Some("http://raad071.mdirkse.nl/kalender/alles.ics")
        );
        assert_eq!(value("NAME").as_deref(), Some("Raad\\, commissies\\; college"));
        assert_eq!(value("X-WR-CALNAME"), value("NAME"));
        assert_eq!(
            value("X-WR-CALDESC").as_deref(),
            Some("De politieke agenda van de Leidse gemeenteraad")
        );
        assert_eq!(value("X-PUBLISHED-TTL").as_deref(), Some("PT6H"));
    }

    #[test]
    fn test_render_empty_snapshot() {
        let ics = render_to_string(&Snapshot::default());
        assert!(ics.contains("BEGIN:VCALENDAR"));
        assert!(!ics.contains("BEGIN:VEVENT"));
    }

    #[test]
    fn test_render_write_error() {
        struct Broken;

        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let result = render(&snapshot(), &FeedMeta::default(), &mut Broken);
        assert!(matches!(result, Err(crate::Error::Render(_))));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("a, b; c\\d\r\ne"), "a\\, b\\; c\\\\d\\ne");
    }
}
