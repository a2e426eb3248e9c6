//! Calendar entities and the sink they are published to.

use std::fmt;

use serde::Serialize;

use eduvulcan_core::{CalendarEvent, Feed};

use crate::error::SinkError;

/// Prefix of every entity id.
const ENTITY_PREFIX: &str = "eduvulcan";

/// Identity of a published calendar: `eduvulcan_<pupil slug>_<feed>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Builds the entity id of `feed` for a pupil.
    pub fn new(owner_name: Option<&str>, feed: Feed) -> Self {
        let slug = owner_name.map(slugify).filter(|s| !s.is_empty());
        match slug {
            Some(slug) => Self(format!("{}_{}_{}", ENTITY_PREFIX, slug, feed.as_str())),
            None => Self(format!("{}_{}", ENTITY_PREFIX, feed.as_str())),
        }
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Folds a name into a lowercase ASCII slug.
///
/// Letters are reduced to their closest ASCII form; every other run of
/// characters becomes a single `_`.
pub fn slugify(name: &str) -> String {
    slug::slugify(name).replace('-', "_")
}

/// The host side of the published calendars.
///
/// `publish` is called with the full ordered set of a feed whenever it
/// changed, and once after the first successful pass.
pub trait CalendarSink: Send + Sync {
    /// Publishes the events of one calendar entity.
    ///
    /// # Errors
    ///
    /// Returns a [`SinkError`] if the host could not be updated.
    fn publish(&self, entity: &EntityId, events: &[CalendarEvent]) -> Result<(), SinkError>;
}
