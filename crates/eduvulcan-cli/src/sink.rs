//! Calendar sinks shipped with the binary.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use eduvulcan_core::CalendarEvent;
use eduvulcan_sync::{CalendarSink, EntityId, SinkError};

/// The document written for each calendar entity.
#[derive(Debug, Serialize)]
struct CalendarDocument<'a> {
    entity: &'a EntityId,
    updated_at: DateTime<Utc>,
    events: &'a [CalendarEvent],
}

/// Writes each entity to `<dir>/<entity>.json`.
///
/// Files are replaced atomically through a temporary file and a rename, so
/// readers never see a partially written calendar.
#[derive(Debug, Clone)]
pub struct JsonDirSink {
    dir: PathBuf,
    pretty: bool,
}

impl JsonDirSink {
    /// Creates the sink, creating `dir` if needed.
    pub fn create(dir: impl Into<PathBuf>, pretty: bool) -> Result<Self, SinkError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| SinkError::io(&dir, e))?;
        Ok(Self { dir, pretty })
    }

    /// Output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the document of `entity`.
    pub fn path_for(&self, entity: &EntityId) -> PathBuf {
        self.dir.join(format!("{}.json", entity))
    }
}

impl CalendarSink for JsonDirSink {
    fn publish(&self, entity: &EntityId, events: &[CalendarEvent]) -> Result<(), SinkError> {
        let document = CalendarDocument {
            entity,
            updated_at: Utc::now(),
            events,
        };
        let body = if self.pretty {
            serde_json::to_vec_pretty(&document)?
        } else {
            serde_json::to_vec(&document)?
        };

        let path = self.path_for(entity);
        let tmp = self.dir.join(format!(".{}.json.tmp", entity));
        fs::write(&tmp, body).map_err(|e| SinkError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| SinkError::io(&path, e))?;

        debug!(path = %path.display(), events = events.len(), "calendar written");
        Ok(())
    }
}

/// Logs publications without writing anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl CalendarSink for LogSink {
    fn publish(&self, entity: &EntityId, events: &[CalendarEvent]) -> Result<(), SinkError> {
        info!(entity = %entity, events = events.len(), "calendar updated");
        Ok(())
    }
}
