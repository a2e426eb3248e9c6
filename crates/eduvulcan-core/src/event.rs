//! Event types for the published calendars.
//!
//! - [`Feed`]: one of the three calendars synchronized from Iris
//! - [`CalendarEvent`]: the canonical event shape every feed is normalized into

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::time::EventTime;

/// One of the calendars exposed to the host.
///
/// Each feed has its own upstream endpoint, its own published event set and
/// its own calendar entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feed {
    /// Timetable entries.
    Lessons,
    /// Homework assignments, shown on their deadline.
    Homework,
    /// Tests and quizzes, shown on their date.
    Exams,
}

impl Feed {
    /// All feeds, in publication order.
    pub const ALL: [Feed; 3] = [Feed::Lessons, Feed::Homework, Feed::Exams];

    /// Returns the stable tag used in uids and entity ids.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lessons => "lessons",
            Self::Homework => "homework",
            Self::Exams => "exams",
        }
    }

    /// Builds the uid of an event from the upstream record id.
    ///
    /// The uid only depends on the feed and the record id, so an unchanged
    /// record keeps its uid across sync passes.
    pub fn uid_for(&self, record_id: &str) -> String {
        format!("{}:{}", self.as_str(), record_id)
    }
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown feed name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown feed: {0}")]
pub struct ParseFeedError(pub String);

impl FromStr for Feed {
    type Err = ParseFeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lessons" | "lesson" | "schedule" => Ok(Self::Lessons),
            "homework" => Ok(Self::Homework),
            "exams" | "exam" => Ok(Self::Exams),
            other => Err(ParseFeedError(other.to_string())),
        }
    }
}

/// A normalized calendar event.
///
/// This is the canonical representation of a lesson, homework or exam after
/// normalization. For all-day events `start` and `end` are dates and `end`
/// is exclusive; for timed events both carry an explicit offset and
/// `start < end`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Stable identifier derived from the feed and upstream record id.
    pub uid: String,
    /// The feed this event belongs to.
    pub feed: Feed,
    /// The event title.
    pub title: String,
    /// Longer details, one labelled line per known field.
    pub description: Option<String>,
    /// Where the event takes place (lesson room).
    pub location: Option<String>,
    /// When the event starts.
    pub start: EventTime,
    /// When the event ends (exclusive for all-day events).
    pub end: EventTime,
    /// Whether this is an all-day event.
    pub all_day: bool,
}

impl CalendarEvent {
    /// Creates a new event; `all_day` follows the kind of `start`.
    pub fn new(
        uid: impl Into<String>,
        feed: Feed,
        title: impl Into<String>,
        start: EventTime,
        end: EventTime,
    ) -> Self {
        let all_day = start.is_all_day();
        Self {
            uid: uid.into(),
            feed,
            title: title.into(),
            description: None,
            location: None,
            start,
            end,
            all_day,
        }
    }

    /// Builder method to set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Returns true if the event overlaps `[range_start, range_end)`.
    ///
    /// All-day bounds are resolved at local midnight in `tz`.
    pub fn overlaps<Tz: TimeZone>(
        &self,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
        tz: &Tz,
    ) -> bool {
        self.start.instant_in(tz) < range_end && self.end.instant_in(tz) > range_start
    }

    /// Returns true if the event has not ended at `now`.
    pub fn is_pending_at<Tz: TimeZone>(&self, now: DateTime<Utc>, tz: &Tz) -> bool {
        self.end.instant_in(tz) > now
    }
}
