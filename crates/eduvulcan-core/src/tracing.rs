//! Logging setup for the eduvulcan binaries.
//!
//! Each command picks a [`LogMode`]; `RUST_LOG` replaces the mode's filter.
//! The daemon also logs when a `sync_feed` span closes, which gives the
//! duration of every feed of a pass.

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, fmt::format::FmtSpan, prelude::*};

/// Crate targets all start with this prefix.
const TARGET_PREFIX: &str = "eduvulcan";

#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),
}

/// Who is logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogMode {
    /// One-shot commands: warnings and errors only, stdout stays for output.
    #[default]
    Command,
    /// `--debug`: debug level with source locations, no timestamps.
    Debug,
    /// The sync daemon: info level, timestamps, feed span durations.
    Daemon,
}

/// Logging configuration.
#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    pub mode: LogMode,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
    /// Filter directive used instead of the mode's level.
    pub filter: Option<String>,
}

impl TracingConfig {
    pub fn new(mode: LogMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Level of the eduvulcan crates when no filter is given.
    pub fn level(&self) -> Level {
        match self.mode {
            LogMode::Command => Level::WARN,
            LogMode::Debug => Level::DEBUG,
            LogMode::Daemon => Level::INFO,
        }
    }

    /// Filter used when neither `filter` nor `RUST_LOG` is set.
    pub fn default_directive(&self) -> String {
        format!("{}={}", TARGET_PREFIX, self.level())
    }

    fn env_filter(&self) -> Result<EnvFilter, TracingError> {
        if let Some(filter) = &self.filter {
            return Ok(EnvFilter::try_new(filter)?);
        }
        Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.default_directive())))
    }

    fn span_events(&self) -> FmtSpan {
        match self.mode {
            LogMode::Daemon => FmtSpan::CLOSE,
            LogMode::Command | LogMode::Debug => FmtSpan::NONE,
        }
    }
}

/// Installs the global subscriber. Must be called once.
///
/// # Errors
///
/// Fails when a subscriber is already set or the filter does not parse.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let filter = config.env_filter()?;
    let debug = config.mode == LogMode::Debug;

    let layer = fmt::layer()
        .with_file(debug)
        .with_line_number(debug)
        .with_span_events(config.span_events());
    let layer = match (config.json, debug) {
        (true, _) => layer.json().boxed(),
        (false, true) => layer.compact().without_time().boxed(),
        (false, false) => layer.compact().boxed(),
    };

    tracing::subscriber::set_global_default(tracing_subscriber::registry().with(filter).with(layer))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_follow_mode() {
        assert_eq!(TracingConfig::default().default_directive(), "eduvulcan=WARN");
        assert_eq!(TracingConfig::new(LogMode::Debug).level(), Level::DEBUG);
        assert_eq!(
            TracingConfig::new(LogMode::Daemon).default_directive(),
            "eduvulcan=INFO"
        );
    }

    #[test]
    fn only_daemon_logs_span_close() {
        assert_eq!(TracingConfig::new(LogMode::Daemon).span_events(), FmtSpan::CLOSE);
        assert_eq!(TracingConfig::new(LogMode::Command).span_events(), FmtSpan::NONE);
    }

    #[test]
    fn explicit_filter_is_validated() {
        let config = TracingConfig::new(LogMode::Daemon).with_filter("eduvulcan_sync=trace");
        assert!(config.env_filter().is_ok());

        let bad = TracingConfig::default().with_filter("eduvulcan=notalevel");
        assert!(matches!(bad.env_filter(), Err(TracingError::Filter(_))));
    }
}
