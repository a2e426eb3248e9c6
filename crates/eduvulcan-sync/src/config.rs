//! Coordinator configuration.

use std::time::Duration;

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use eduvulcan_core::DateWindow;
use eduvulcan_iris::DEFAULT_TIMEZONE;

/// Retry policy for transient fetch failures within one pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per feed and pass, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound of any delay.
    pub max_backoff: Duration,
    /// Backoff multiplier.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Builder: set the number of attempts.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Builder: set backoff parameters.
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Delay after the given failed attempt (1-based).
    pub fn backoff_delay(&self, failed_attempts: u32) -> Duration {
        if failed_attempts == 0 {
            return Duration::ZERO;
        }

        let base = self.initial_backoff.as_secs_f64();
        let multiplier = self.multiplier.powi(failed_attempts as i32 - 1);
        let max = self.max_backoff.as_secs_f64();

        Duration::from_secs_f64((base * multiplier).min(max))
    }
}

/// How the fetched date range is derived from "today".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum WindowConfig {
    /// A window moving with the current day.
    Rolling {
        lookback_days: u32,
        lookahead_days: u32,
    },
    /// The current school year so far, plus a lookahead.
    SchoolYear { lookahead_days: u32 },
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self::Rolling {
            lookback_days: 1,
            lookahead_days: 14,
        }
    }
}

impl WindowConfig {
    /// Resolves the window for `today`.
    pub fn window(&self, today: NaiveDate) -> DateWindow {
        match *self {
            Self::Rolling {
                lookback_days,
                lookahead_days,
            } => DateWindow::rolling(today, lookback_days, lookahead_days),
            Self::SchoolYear { lookahead_days } => DateWindow::school_year(today, lookahead_days),
        }
    }
}

/// Configuration of a [`Coordinator`](crate::Coordinator).
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Institution timezone; lesson times and "today" are taken in it.
    pub tz: Tz,
    /// Date range of every pass.
    pub window: WindowConfig,
    /// Retry policy for transient failures.
    pub retry: RetryPolicy,
    /// Pupil display name, used to build entity ids.
    pub owner_name: Option<String>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            tz: DEFAULT_TIMEZONE,
            window: WindowConfig::default(),
            retry: RetryPolicy::default(),
            owner_name: None,
        }
    }
}

impl CoordinatorConfig {
    /// Builder: set the timezone.
    pub fn with_timezone(mut self, tz: Tz) -> Self {
        self.tz = tz;
        self
    }

    /// Builder: set the window.
    pub fn with_window(mut self, window: WindowConfig) -> Self {
        self.window = window;
        self
    }

    /// Builder: set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Builder: set the pupil name.
    pub fn with_owner_name(mut self, name: Option<String>) -> Self {
        self.owner_name = name;
        self
    }
}
