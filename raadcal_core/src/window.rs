//! The source serves its calendar one month at a time, so a refresh is split into months.

use std::fmt;

use chrono::{Datelike, NaiveDate};

/// One month of the remote calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// The month the date lies in.
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The month `months` months after this one, going backwards for negative values.
    pub fn offset(self, months: i64) -> Self {
        let index = i64::from(self.year) * 12 + i64::from(self.month) - 1 + months;
        Self {
            year: index.div_euclid(12) as i32,
            month: index.rem_euclid(12) as u32 + 1,
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

/// Get `total` contiguous months in chronological order, `before` of them preceding the
/// month of `anchor`.
pub fn months_around(anchor: NaiveDate, before: u32, total: u32) -> Vec<MonthKey> {
    let anchor = MonthKey::containing(anchor);
    let before = i64::from(before);
    (-before..i64::from(total) - before)
        .map(|offset| anchor.offset(offset))
        .collect()
}
