//! Background scheduler for sync passes.
//!
//! Runs a pass immediately, then every `sync_interval` with jitter. A `Stop`
//! command received during a pass drops it; the store is only swapped after
//! a feed is fully normalized, so a dropped pass publishes nothing partial.
//! A `SyncNow` received during a pass starts another one as soon as the
//! running pass finishes.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};

use crate::coordinator::TickReport;

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Base interval between passes.
    pub sync_interval: Duration,
    /// Maximum jitter added to the interval (as fraction 0.0-1.0).
    pub jitter_fraction: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_secs(3600),
            jitter_fraction: 0.1,
        }
    }
}

impl SchedulerConfig {
    /// Creates a new scheduler config with the given interval.
    pub fn new(sync_interval: Duration) -> Self {
        Self {
            sync_interval,
            ..Default::default()
        }
    }

    /// Builder: set jitter fraction.
    pub fn with_jitter(mut self, fraction: f64) -> Self {
        self.jitter_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    /// Calculates the next delay with jitter.
    pub fn next_sync_delay(&self) -> Duration {
        let base = self.sync_interval.as_secs_f64();
        let jitter = rand_jitter(base * self.jitter_fraction);
        Duration::from_secs_f64((base + jitter).max(0.0))
    }
}

/// Pseudo-random value in [-range, range] taken from the clock.
fn rand_jitter(range: f64) -> f64 {
    use std::time::SystemTime;

    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();

    let fraction = (nanos as f64) / 1_000_000_000.0;
    (fraction * 2.0 - 1.0) * range
}

/// Commands that can be sent to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerCommand {
    /// Run a pass now and restart the interval.
    SyncNow,
    /// Stop the scheduler, cancelling a running pass.
    Stop,
}

/// Scheduler counters.
#[derive(Debug, Clone, Default)]
pub struct SchedulerState {
    /// Passes that ran to completion.
    pub ticks: u64,
    /// Passes the coordinator skipped because one was already running.
    pub skipped: u64,
    /// When the last completed pass started.
    pub last_tick: Option<DateTime<Utc>>,
    /// Feeds published by the last completed pass.
    pub last_published: usize,
}

impl SchedulerState {
    fn record(&mut self, report: Option<&TickReport>) {
        match report {
            Some(report) => {
                self.ticks += 1;
                self.last_tick = Some(report.started_at);
                self.last_published = report
                    .feeds
                    .iter()
                    .filter(|r| r.outcome.is_published())
                    .count();
            }
            None => self.skipped += 1,
        }
    }
}

/// Shared scheduler state.
pub type SharedSchedulerState = Arc<RwLock<SchedulerState>>;

/// Drives sync passes on a timer.
pub struct Scheduler {
    config: SchedulerConfig,
    state: SharedSchedulerState,
    command_tx: mpsc::Sender<SchedulerCommand>,
    command_rx: mpsc::Receiver<SchedulerCommand>,
}

enum Step {
    Continue,
    /// A pass was requested while this one ran.
    Rerun,
    Stop,
}

impl Scheduler {
    /// Creates a new scheduler with the given configuration.
    pub fn new(config: SchedulerConfig) -> Self {
        let (command_tx, command_rx) = mpsc::channel(16);
        Self {
            config,
            state: Arc::new(RwLock::new(SchedulerState::default())),
            command_tx,
            command_rx,
        }
    }

    /// Returns a handle for sending commands to the scheduler.
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            command_tx: self.command_tx.clone(),
            state: self.state.clone(),
        }
    }

    /// Runs the scheduler loop until stopped or every handle is dropped.
    ///
    /// `sync_fn` runs one pass; `None` means the pass was skipped.
    pub async fn run<F, Fut>(self, sync_fn: F)
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Option<TickReport>> + Send,
    {
        let Self {
            config,
            state,
            command_tx,
            mut command_rx,
        } = self;
        // Keep only external handles alive
        drop(command_tx);

        info!(
            interval_secs = config.sync_interval.as_secs(),
            "scheduler started"
        );

        loop {
            match run_pass(&sync_fn, &state, &mut command_rx).await {
                Step::Continue => {}
                Step::Rerun => {
                    debug!("running pass requested during the previous one");
                    continue;
                }
                Step::Stop => break,
            }

            let delay = config.next_sync_delay();
            debug!(delay_secs = delay.as_secs(), "scheduling next sync");

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                cmd = command_rx.recv() => match cmd {
                    Some(SchedulerCommand::SyncNow) => debug!("received SyncNow"),
                    Some(SchedulerCommand::Stop) | None => break,
                },
            }
        }

        info!("scheduler stopped");
    }
}

async fn run_pass<F, Fut>(
    sync_fn: &F,
    state: &SharedSchedulerState,
    command_rx: &mut mpsc::Receiver<SchedulerCommand>,
) -> Step
where
    F: Fn() -> Fut,
    Fut: Future<Output = Option<TickReport>>,
{
    let pass = sync_fn();
    tokio::pin!(pass);
    let mut rerun = false;

    loop {
        tokio::select! {
            report = &mut pass => {
                if report.is_none() {
                    warn!("sync pass skipped, previous pass still running");
                }
                state.write().await.record(report.as_ref());
                return if rerun { Step::Rerun } else { Step::Continue };
            }
            cmd = command_rx.recv() => match cmd {
                Some(SchedulerCommand::SyncNow) => {
                    debug!("sync already running, queueing SyncNow");
                    rerun = true;
                }
                Some(SchedulerCommand::Stop) | None => {
                    info!("stopping during sync pass, cancelling it");
                    return Step::Stop;
                }
            },
        }
    }
}

/// Handle for sending commands to a running scheduler.
#[derive(Clone, Debug)]
pub struct SchedulerHandle {
    command_tx: mpsc::Sender<SchedulerCommand>,
    state: SharedSchedulerState,
}

impl SchedulerHandle {
    /// Triggers an immediate pass.
    pub async fn sync_now(&self) -> Result<(), mpsc::error::SendError<SchedulerCommand>> {
        self.command_tx.send(SchedulerCommand::SyncNow).await
    }

    /// Stops the scheduler.
    pub async fn stop(&self) -> Result<(), mpsc::error::SendError<SchedulerCommand>> {
        self.command_tx.send(SchedulerCommand::Stop).await
    }

    /// Returns the current scheduler state.
    pub async fn state(&self) -> SchedulerState {
        self.state.read().await.clone()
    }
}
