//! Core types: feeds, calendar events, date windows, tracing

pub mod event;
pub mod time;
pub mod tracing;

pub use event::{CalendarEvent, Feed, ParseFeedError};
pub use time::{DateWindow, EventTime, local_midnight};
pub use tracing::{LogMode, TracingConfig, TracingError, init_tracing};
