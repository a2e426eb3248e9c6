//! Published event store.
//!
//! Holds the latest event set of each feed. A set is replaced wholesale
//! once a pass has fully normalized it, so readers always observe either
//! the previous or the new set, never a mix.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::debug;

use eduvulcan_core::{CalendarEvent, Feed};

/// The published events of one feed.
#[derive(Debug, Clone)]
pub struct FeedSnapshot {
    /// Events ordered by start.
    pub events: Arc<[CalendarEvent]>,
    /// When the set was published.
    pub updated_at: DateTime<Utc>,
}

/// Changes between two published sets, by uid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventDiff {
    /// Whether this was the first set published for the feed.
    pub initial: bool,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub changed: Vec<String>,
}

impl EventDiff {
    /// Computes the diff from `previous` to `next`.
    pub fn between(previous: &[CalendarEvent], next: &[CalendarEvent]) -> Self {
        let before: HashMap<&str, &CalendarEvent> =
            previous.iter().map(|e| (e.uid.as_str(), e)).collect();
        let after: BTreeMap<&str, &CalendarEvent> =
            next.iter().map(|e| (e.uid.as_str(), e)).collect();

        let mut diff = Self::default();
        for (uid, event) in &after {
            match before.get(uid) {
                None => diff.added.push(uid.to_string()),
                Some(old) if *old != *event => diff.changed.push(uid.to_string()),
                Some(_) => {}
            }
        }
        let mut removed: Vec<String> = before
            .keys()
            .filter(|uid| !after.contains_key(*uid))
            .map(|uid| uid.to_string())
            .collect();
        removed.sort();
        diff.removed = removed;
        diff
    }

    /// Returns true if no event was added, removed or changed.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }

    /// Returns true if the host should be told about this publication.
    pub fn should_notify(&self) -> bool {
        self.initial || !self.is_empty()
    }
}

/// Per-feed published event sets.
#[derive(Debug)]
pub struct EventStore {
    tz: Tz,
    feeds: HashMap<Feed, RwLock<Option<FeedSnapshot>>>,
}

impl EventStore {
    /// Creates an empty store; `tz` resolves all-day events in queries.
    pub fn new(tz: Tz) -> Self {
        let feeds = Feed::ALL
            .into_iter()
            .map(|feed| (feed, RwLock::new(None)))
            .collect();
        Self { tz, feeds }
    }

    fn slot(&self, feed: Feed) -> Option<&RwLock<Option<FeedSnapshot>>> {
        self.feeds.get(&feed)
    }

    /// Replaces the published set of `feed` and returns what changed.
    pub fn replace(&self, feed: Feed, events: Vec<CalendarEvent>) -> EventDiff {
        let Some(slot) = self.slot(feed) else {
            return EventDiff::default();
        };
        let next: Arc<[CalendarEvent]> = events.into();
        let mut guard = slot.write().unwrap_or_else(PoisonError::into_inner);

        let diff = match guard.as_ref() {
            Some(previous) => EventDiff::between(&previous.events, &next),
            None => EventDiff {
                initial: true,
                ..EventDiff::between(&[], &next)
            },
        };
        *guard = Some(FeedSnapshot {
            events: next,
            updated_at: Utc::now(),
        });

        debug!(
            feed = %feed,
            added = diff.added.len(),
            removed = diff.removed.len(),
            changed = diff.changed.len(),
            "replaced published events"
        );
        diff
    }

    /// Returns the latest snapshot of `feed`, if one was published.
    pub fn snapshot(&self, feed: Feed) -> Option<FeedSnapshot> {
        self.slot(feed)?
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the published events of `feed`; empty before the first publish.
    pub fn events(&self, feed: Feed) -> Arc<[CalendarEvent]> {
        self.snapshot(feed)
            .map(|s| s.events)
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }

    /// Events of `feed` overlapping `[start, end)`.
    pub fn events_between(
        &self,
        feed: Feed,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<CalendarEvent> {
        self.events(feed)
            .iter()
            .filter(|e| e.overlaps(start, end, &self.tz))
            .cloned()
            .collect()
    }

    /// The first event of `feed` that has not ended at `now`.
    pub fn next_event(&self, feed: Feed, now: DateTime<Utc>) -> Option<CalendarEvent> {
        self.events(feed)
            .iter()
            .find(|e| e.is_pending_at(now, &self.tz))
            .cloned()
    }

    /// When `feed` was last published.
    pub fn updated_at(&self, feed: Feed) -> Option<DateTime<Utc>> {
        self.snapshot(feed).map(|s| s.updated_at)
    }
}
