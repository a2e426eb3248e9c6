//! Sync coordinator.
//!
//! Runs the periodic pass over the three feeds. Each feed is an independent
//! failure domain: a failing feed keeps its previously published set while
//! the others are refreshed.
//!
//! Per-feed lifecycle:
//!
//! ```text
//! Idle -> Fetching -> Normalizing -> Publishing -> Idle
//!            |
//!            +-> Failed   (transient or permanent; retried next tick)
//!            +-> Disabled (token rejected; until reload)
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{Instrument, debug, error, info, info_span, warn};

use eduvulcan_core::{DateWindow, Feed};
use eduvulcan_iris::{
    ApiError, ApiErrorKind, IrisApi, NormalizeContext, RawRecord, normalize_feed,
};

use crate::config::CoordinatorConfig;
use crate::publish::{CalendarSink, EntityId};
use crate::store::{EventDiff, EventStore};

/// Where a feed is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "reason", rename_all = "snake_case")]
pub enum FeedPhase {
    Idle,
    Fetching,
    Normalizing,
    Publishing,
    /// The last pass failed; the next tick tries again.
    Failed(String),
    /// The token was rejected; no requests until [`Coordinator::reload`].
    Disabled(String),
}

impl FeedPhase {
    /// Returns true if the feed is disabled.
    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled(_))
    }
}

/// What a pass did for one feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FeedOutcome {
    /// A new set was published.
    Published { events: usize, diff: EventDiff },
    /// Transient failures exhausted the retries; the previous set is kept.
    Stale { error: String },
    /// A permanent failure; the previous set is kept.
    Skipped { error: String },
    /// The token was rejected; the feed stays disabled.
    Disabled { error: String },
}

impl FeedOutcome {
    /// Returns true if the feed published a new set.
    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published { .. })
    }
}

/// Report of one feed within a pass.
#[derive(Debug, Clone, Serialize)]
pub struct FeedReport {
    pub feed: Feed,
    pub outcome: FeedOutcome,
    /// Fetch attempts made; zero for a disabled feed.
    pub attempts: u32,
    /// Records dropped during normalization.
    pub dropped: usize,
}

/// Report of one pass over all feeds.
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub started_at: DateTime<Utc>,
    pub window: DateWindow,
    pub feeds: Vec<FeedReport>,
}

impl TickReport {
    /// Returns the report of `feed`.
    pub fn feed(&self, feed: Feed) -> Option<&FeedReport> {
        self.feeds.iter().find(|r| r.feed == feed)
    }

    /// Returns true if every feed published.
    pub fn all_published(&self) -> bool {
        self.feeds.iter().all(|r| r.outcome.is_published())
    }
}

/// Queryable status of one feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedStatus {
    pub phase: FeedPhase,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
    /// Size of the published set.
    pub event_count: usize,
}

impl Default for FeedStatus {
    fn default() -> Self {
        Self {
            phase: FeedPhase::Idle,
            last_success: None,
            last_error: None,
            consecutive_failures: 0,
            event_count: 0,
        }
    }
}

/// What every feed of one pass shares.
struct Pass<'a> {
    api: Arc<dyn IrisApi>,
    /// Generation of `api` when the pass started.
    generation: u64,
    window: &'a DateWindow,
}

#[derive(Debug, Default)]
struct FeedState {
    status: FeedStatus,
    /// The last publication could not be delivered to the sink.
    pending_announce: bool,
}

/// The API client in use and how many reloads produced it.
struct ApiSlot {
    generation: u64,
    api: Arc<dyn IrisApi>,
}

/// Orchestrates fetch, normalization and publication of the feeds.
pub struct Coordinator {
    api: RwLock<ApiSlot>,
    sink: Arc<dyn CalendarSink>,
    store: Arc<EventStore>,
    config: CoordinatorConfig,
    entities: BTreeMap<Feed, EntityId>,
    states: Mutex<HashMap<Feed, FeedState>>,
    tick_guard: tokio::sync::Mutex<()>,
}

impl Coordinator {
    /// Creates a coordinator; no request is made until the first tick.
    pub fn new(
        api: Arc<dyn IrisApi>,
        sink: Arc<dyn CalendarSink>,
        config: CoordinatorConfig,
    ) -> Self {
        let entities = Feed::ALL
            .into_iter()
            .map(|feed| (feed, EntityId::new(config.owner_name.as_deref(), feed)))
            .collect();
        let states = Feed::ALL
            .into_iter()
            .map(|feed| (feed, FeedState::default()))
            .collect();

        Self {
            api: RwLock::new(ApiSlot { generation: 0, api }),
            sink,
            store: Arc::new(EventStore::new(config.tz)),
            config,
            entities,
            states: Mutex::new(states),
            tick_guard: tokio::sync::Mutex::new(()),
        }
    }

    /// Returns the published event store.
    pub fn store(&self) -> Arc<EventStore> {
        self.store.clone()
    }

    /// Returns the coordinator configuration.
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Returns the entity id of `feed`.
    pub fn entity(&self, feed: Feed) -> Option<&EntityId> {
        self.entities.get(&feed)
    }

    /// Returns the status of `feed`.
    pub fn status(&self, feed: Feed) -> FeedStatus {
        self.with_state(feed, |state| state.status.clone())
    }

    /// Returns the status of every feed, in publication order.
    pub fn statuses(&self) -> Vec<(Feed, FeedStatus)> {
        Feed::ALL
            .into_iter()
            .map(|feed| (feed, self.status(feed)))
            .collect()
    }

    /// Swaps in a new API client and re-enables disabled feeds.
    ///
    /// A pass already running keeps its client; a token rejection it reports
    /// afterwards no longer disables the feed.
    pub fn reload(&self, api: Arc<dyn IrisApi>) {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        {
            let mut slot = self.api.write().unwrap_or_else(PoisonError::into_inner);
            slot.generation += 1;
            slot.api = api;
            debug!(generation = slot.generation, "API client replaced");
        }

        for (feed, state) in states.iter_mut() {
            if state.status.phase.is_disabled() {
                info!(feed = %feed, "re-enabling feed after reload");
                state.status.phase = FeedPhase::Idle;
                state.status.consecutive_failures = 0;
            }
        }
    }

    /// Runs one pass for today in the institution timezone.
    ///
    /// Returns `None` when a pass is already running.
    pub async fn tick(&self) -> Option<TickReport> {
        let today = Utc::now().with_timezone(&self.config.tz).date_naive();
        self.tick_on(today).await
    }

    /// Runs one pass with `today` as the reference day of the window.
    ///
    /// Returns `None` when a pass is already running.
    pub async fn tick_on(&self, today: NaiveDate) -> Option<TickReport> {
        let Ok(_guard) = self.tick_guard.try_lock() else {
            debug!("sync pass already running, skipping tick");
            return None;
        };

        let started_at = Utc::now();
        let window = self.config.window.window(today);
        let (generation, api) = {
            let slot = self.api.read().unwrap_or_else(PoisonError::into_inner);
            (slot.generation, slot.api.clone())
        };
        info!(from = %window.from, to = %window.to, days = window.days(), "starting sync pass");

        let pass = Pass {
            api,
            generation,
            window: &window,
        };
        let (lessons, homework, exams) = tokio::join!(
            self.sync_feed(&pass, Feed::Lessons),
            self.sync_feed(&pass, Feed::Homework),
            self.sync_feed(&pass, Feed::Exams),
        );

        let report = TickReport {
            started_at,
            window,
            feeds: vec![lessons, homework, exams],
        };
        info!(
            published = report.feeds.iter().filter(|r| r.outcome.is_published()).count(),
            "sync pass finished"
        );
        Some(report)
    }

    async fn sync_feed(&self, pass: &Pass<'_>, feed: Feed) -> FeedReport {
        let span = info_span!("sync_feed", feed = %feed, generation = pass.generation);
        self.sync_feed_inner(pass, feed).instrument(span).await
    }

    async fn sync_feed_inner(&self, pass: &Pass<'_>, feed: Feed) -> FeedReport {
        let api = &pass.api;
        if let FeedPhase::Disabled(reason) = self.status(feed).phase {
            debug!(feed = %feed, "feed disabled, skipping");
            return FeedReport {
                feed,
                outcome: FeedOutcome::Disabled { error: reason },
                attempts: 0,
                dropped: 0,
            };
        }

        self.set_phase(feed, FeedPhase::Fetching);
        let (result, attempts) = self.fetch_with_retry(api.as_ref(), feed, pass.window).await;
        let records = match result {
            Ok(records) => records,
            Err(e) => return self.record_failure(feed, e, attempts, pass.generation),
        };

        self.set_phase(feed, FeedPhase::Normalizing);
        let account = match api.account().await {
            Ok(account) => account,
            Err(e) => {
                debug!(feed = %feed, error = %e, "account unavailable, descriptions without pupil");
                None
            }
        };
        let ctx = NormalizeContext::new(self.config.tz).with_account(account);
        let normalized = normalize_feed(feed, &records, &ctx);
        for warning in &normalized.warnings {
            warn!(
                feed = %feed,
                record = %warning.record_id,
                reason = %warning.reason,
                "dropping record"
            );
        }

        self.set_phase(feed, FeedPhase::Publishing);
        let count = normalized.events.len();
        let diff = self.store.replace(feed, normalized.events);
        self.announce(feed, &diff);

        self.with_state(feed, |state| {
            let status = &mut state.status;
            status.phase = FeedPhase::Idle;
            status.last_success = Some(Utc::now());
            status.last_error = None;
            status.consecutive_failures = 0;
            status.event_count = count;
        });
        info!(feed = %feed, events = count, attempts, "feed published");

        FeedReport {
            feed,
            outcome: FeedOutcome::Published {
                events: count,
                diff,
            },
            attempts,
            dropped: normalized.warnings.len(),
        }
    }

    /// Fetches `feed`, retrying transient failures with backoff.
    async fn fetch_with_retry(
        &self,
        api: &dyn IrisApi,
        feed: Feed,
        window: &DateWindow,
    ) -> (Result<Vec<RawRecord>, ApiError>, u32) {
        let policy = &self.config.retry;
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match api.fetch(feed, window).await {
                Ok(records) => return (Ok(records), attempt),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = policy.backoff_delay(attempt);
                    warn!(
                        feed = %feed,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return (Err(e), attempt),
            }
        }
    }

    fn announce(&self, feed: Feed, diff: &EventDiff) {
        let pending = self.with_state(feed, |state| state.pending_announce);
        if !diff.should_notify() && !pending {
            debug!(feed = %feed, "published set unchanged");
            return;
        }
        let Some(entity) = self.entities.get(&feed) else {
            return;
        };

        let events = self.store.events(feed);
        let delivered = match self.sink.publish(entity, &events) {
            Ok(()) => true,
            Err(e) => {
                error!(feed = %feed, entity = %entity, error = %e, "failed to publish calendar");
                false
            }
        };
        self.with_state(feed, |state| state.pending_announce = !delivered);
    }

    fn record_failure(
        &self,
        feed: Feed,
        err: ApiError,
        attempts: u32,
        generation: u64,
    ) -> FeedReport {
        let message = err.to_string();
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        let replaced = generation != self.generation();

        let (phase, outcome) = match err.kind() {
            ApiErrorKind::Unauthorized if replaced => {
                warn!(
                    feed = %feed,
                    error = %err,
                    "token rejected by a replaced client, keeping feed enabled"
                );
                (
                    FeedPhase::Failed(message.clone()),
                    FeedOutcome::Stale {
                        error: message.clone(),
                    },
                )
            }
            ApiErrorKind::Unauthorized => {
                error!(feed = %feed, error = %err, "token rejected, disabling feed until reload");
                (
                    FeedPhase::Disabled(message.clone()),
                    FeedOutcome::Disabled {
                        error: message.clone(),
                    },
                )
            }
            ApiErrorKind::Transient => {
                warn!(feed = %feed, attempts, error = %err, "retries exhausted, keeping previous events");
                (
                    FeedPhase::Failed(message.clone()),
                    FeedOutcome::Stale {
                        error: message.clone(),
                    },
                )
            }
            ApiErrorKind::Permanent => {
                warn!(feed = %feed, error = %err, "fetch failed, keeping previous events");
                (
                    FeedPhase::Failed(message.clone()),
                    FeedOutcome::Skipped {
                        error: message.clone(),
                    },
                )
            }
        };

        let status = &mut states.entry(feed).or_default().status;
        status.phase = phase;
        status.last_error = Some(message);
        status.consecutive_failures += 1;

        FeedReport {
            feed,
            outcome,
            attempts,
            dropped: 0,
        }
    }

    fn generation(&self) -> u64 {
        self.api
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .generation
    }

    fn set_phase(&self, feed: Feed, phase: FeedPhase) {
        self.with_state(feed, |state| state.status.phase = phase);
    }

    fn with_state<R>(&self, feed: Feed, f: impl FnOnce(&mut FeedState) -> R) -> R {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        f(states.entry(feed).or_default())
    }
}
