//! Application configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/eduvulcan/config.toml` by default. Every section is optional.
//!
//! ```toml
//! token_path = "~/.config/eduvulcan/eduvulcan_token.json"
//! timezone = "Europe/Warsaw"
//!
//! [sync]
//! poll_interval_secs = 3600
//!
//! [window]
//! mode = "school_year"
//! lookahead_days = 30
//!
//! [output]
//! dir = "~/.local/share/eduvulcan/calendars"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use eduvulcan_iris::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_PAGE_SIZE};
use eduvulcan_sync::{CoordinatorConfig, RetryPolicy, SchedulerConfig, WindowConfig};

use crate::error::{CliError, CliResult};

/// Name of the token file written by the EduVulcan login flow.
pub const TOKEN_FILE_NAME: &str = "eduvulcan_token.json";

/// Configuration for the eduvulcan binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Path to the token file; next to the config file when unset.
    pub token_path: Option<PathBuf>,

    /// Institution timezone (IANA name).
    pub timezone: String,

    /// Debug mode.
    pub debug: bool,

    /// Iris API settings.
    pub api: ApiSettings,

    /// Polling and retry settings.
    pub sync: SyncSettings,

    /// Date range settings.
    pub window: WindowSettings,

    /// Calendar output settings.
    pub output: OutputSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            token_path: None,
            timezone: "Europe/Warsaw".to_string(),
            debug: false,
            api: ApiSettings::default(),
            sync: SyncSettings::default(),
            window: WindowSettings::default(),
            output: OutputSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Scheme and host of the Iris API.
    pub base_url: String,
    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,
    /// Records per page.
    pub page_size: usize,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Seconds between sync passes.
    pub poll_interval_secs: u64,
    /// Jitter fraction applied to the interval.
    pub jitter: f64,
    /// Fetch attempts per feed and pass.
    pub retry_attempts: u32,
    /// Delay before the first retry, in seconds.
    pub retry_initial_backoff_secs: u64,
    /// Upper bound of retry delays, in seconds.
    pub retry_max_backoff_secs: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 3600,
            jitter: 0.1,
            retry_attempts: 3,
            retry_initial_backoff_secs: 2,
            retry_max_backoff_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowMode {
    #[default]
    Rolling,
    SchoolYear,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub mode: WindowMode,
    /// Days before today; ignored in school-year mode.
    pub lookback_days: u32,
    pub lookahead_days: u32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            mode: WindowMode::Rolling,
            lookback_days: 1,
            lookahead_days: 14,
        }
    }
}

/// Longest look-back or look-ahead accepted, about ten years.
pub const MAX_WINDOW_DAYS: u32 = 3660;

impl WindowSettings {
    /// Converts to the coordinator window.
    ///
    /// # Errors
    ///
    /// Fails when a bound exceeds [`MAX_WINDOW_DAYS`].
    pub fn to_window_config(&self) -> CliResult<WindowConfig> {
        for (key, days) in [
            ("lookback_days", self.lookback_days),
            ("lookahead_days", self.lookahead_days),
        ] {
            if days > MAX_WINDOW_DAYS {
                return Err(CliError::Config(format!(
                    "window.{} = {} exceeds the maximum of {} days",
                    key, days, MAX_WINDOW_DAYS
                )));
            }
        }

        Ok(match self.mode {
            WindowMode::Rolling => WindowConfig::Rolling {
                lookback_days: self.lookback_days,
                lookahead_days: self.lookahead_days,
            },
            WindowMode::SchoolYear => WindowConfig::SchoolYear {
                lookahead_days: self.lookahead_days,
            },
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Directory of the published calendars.
    pub dir: Option<PathBuf>,
    /// Pretty-print the JSON documents.
    pub pretty: bool,
}

impl AppConfig {
    /// Loads configuration from the default path, if it exists.
    pub fn load() -> CliResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Parses configuration from TOML text.
    pub fn parse(content: &str) -> CliResult<Self> {
        toml::from_str(content).map_err(|e| CliError::Config(format!("failed to parse config: {}", e)))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("eduvulcan")
    }

    /// Returns the default data directory path.
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("eduvulcan")
    }

    /// Resolved token file path.
    pub fn token_path(&self) -> PathBuf {
        match &self.token_path {
            Some(path) => expand_home(path),
            None => Self::default_config_dir().join(TOKEN_FILE_NAME),
        }
    }

    /// Resolved output directory.
    pub fn output_dir(&self) -> PathBuf {
        match &self.output.dir {
            Some(dir) => expand_home(dir),
            None => Self::default_data_dir().join("calendars"),
        }
    }

    /// Parsed institution timezone.
    pub fn tz(&self) -> CliResult<Tz> {
        self.timezone
            .parse()
            .map_err(|_| CliError::Config(format!("unknown timezone {:?}", self.timezone)))
    }

    /// Iris client configuration.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::default()
            .with_base_url(self.api.base_url.clone())
            .with_timeout(Duration::from_secs(self.api.timeout_secs.max(1)))
            .with_page_size(self.api.page_size.max(1))
    }

    /// Coordinator configuration; `owner_name` names the calendar entities.
    pub fn coordinator_config(&self, owner_name: Option<&str>) -> CliResult<CoordinatorConfig> {
        let retry = RetryPolicy::default()
            .with_max_attempts(self.sync.retry_attempts)
            .with_backoff(
                Duration::from_secs(self.sync.retry_initial_backoff_secs),
                Duration::from_secs(self.sync.retry_max_backoff_secs),
            );

        Ok(CoordinatorConfig::default()
            .with_timezone(self.tz()?)
            .with_window(self.window.to_window_config()?)
            .with_retry(retry)
            .with_owner_name(owner_name.map(str::to_string)))
    }

    /// Scheduler configuration.
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig::new(Duration::from_secs(self.sync.poll_interval_secs.max(60)))
            .with_jitter(self.sync.jitter)
    }
}

/// Expands a leading `~/` to the home directory.
fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
