//! Time types for calendar events.
//!
//! This module provides [`EventTime`] for representing event start/end times
//! (either an instant with an explicit UTC offset or an all-day date), and
//! [`DateWindow`] for the date range a sync pass queries.

use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Represents the start or end of a calendar event.
///
/// - **DateTime**: an instant carrying the offset of the institution timezone
/// - **AllDay**: a calendar date without time of day; as an end bound it is
///   exclusive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum EventTime {
    /// A specific instant with its local offset preserved.
    DateTime(DateTime<FixedOffset>),
    /// An all-day date.
    AllDay(NaiveDate),
}

impl EventTime {
    /// Creates an `EventTime::DateTime` from a datetime in any timezone,
    /// keeping the offset that applied at that instant.
    pub fn from_local<Tz: TimeZone>(dt: DateTime<Tz>) -> Self {
        Self::DateTime(dt.fixed_offset())
    }

    /// Creates an `EventTime::AllDay` from a date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self::AllDay(date)
    }

    /// Returns `true` if this is an all-day date.
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay(_))
    }

    /// Returns the datetime if this is a `DateTime` variant.
    pub fn as_datetime(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            Self::DateTime(dt) => Some(dt),
            Self::AllDay(_) => None,
        }
    }

    /// Resolves this time to an instant.
    ///
    /// All-day dates resolve to local midnight in `tz`.
    pub fn instant_in<Tz: TimeZone>(&self, tz: &Tz) -> DateTime<Utc> {
        match self {
            Self::DateTime(dt) => dt.with_timezone(&Utc),
            Self::AllDay(date) => local_midnight(*date, tz),
        }
    }

    /// Returns the calendar date of this time as seen at its own offset.
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::DateTime(dt) => dt.date_naive(),
            Self::AllDay(date) => *date,
        }
    }

    fn sort_key(&self) -> DateTime<Utc> {
        match self {
            Self::DateTime(dt) => dt.with_timezone(&Utc),
            Self::AllDay(date) => date.and_time(NaiveTime::MIN).and_utc(),
        }
    }
}

impl PartialOrd for EventTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Instants compare by their UTC value; all-day dates compare at midnight UTC.
impl Ord for EventTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

/// Returns local midnight of `date` in `tz` as a UTC instant.
///
/// If midnight does not exist locally (a DST gap), the naive midnight is read as UTC.
pub fn local_midnight<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc())
}

/// The date range a sync pass asks the upstream API for.
///
/// Both bounds are inclusive, matching the `dateFrom`/`dateTo` query
/// parameters of the Iris endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    /// First day of the window (inclusive).
    pub from: NaiveDate,
    /// Last day of the window (inclusive).
    pub to: NaiveDate,
}

impl DateWindow {
    /// Creates a new date window.
    ///
    /// # Panics
    ///
    /// Panics if `from` is after `to`.
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        assert!(from <= to, "DateWindow from must be <= to");
        Self { from, to }
    }

    /// A window reaching `lookback_days` before and `lookahead_days` after `today`.
    ///
    /// Bounds past the representable range stop at [`NaiveDate::MIN`] and
    /// [`NaiveDate::MAX`].
    pub fn rolling(today: NaiveDate, lookback_days: u32, lookahead_days: u32) -> Self {
        Self {
            from: today
                .checked_sub_days(Days::new(u64::from(lookback_days)))
                .unwrap_or(NaiveDate::MIN),
            to: days_after(today, lookahead_days),
        }
    }

    /// A window from the start of the current school year (September 1st)
    /// through `lookahead_days` after `today`.
    pub fn school_year(today: NaiveDate, lookahead_days: u32) -> Self {
        let year = if today.month() >= 9 {
            today.year()
        } else {
            today.year() - 1
        };
        let from = NaiveDate::from_ymd_opt(year, 9, 1).unwrap_or(today);
        Self {
            from,
            to: days_after(today, lookahead_days),
        }
    }

    /// Number of days covered, counting both bounds.
    pub fn days(&self) -> i64 {
        (self.to - self.from).num_days() + 1
    }

}

fn days_after(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MAX)
}
