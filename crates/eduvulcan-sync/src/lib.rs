//! Sync coordinator for the EduVulcan calendars.
//!
//! This crate keeps the three published calendars (lessons, homework,
//! exams) up to date:
//! - Per-feed fetch with retry and independent failure domains
//! - The published event store and change detection
//! - Background scheduling of sync passes
//! - Signal handling for shutdown and token reload
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use eduvulcan_iris::{ClientConfig, CredentialBundle, IrisClient, validate};
//! use eduvulcan_sync::{CalendarSink, Coordinator, CoordinatorConfig};
//!
//! async fn once(sink: Arc<dyn CalendarSink>) -> Result<(), Box<dyn std::error::Error>> {
//!     let bundle = CredentialBundle::from_file("eduvulcan_token.json")?;
//!     let credential = validate(&bundle)?;
//!     let client = IrisClient::new(credential, ClientConfig::default())?;
//!
//!     let coordinator = Coordinator::new(Arc::new(client), sink, CoordinatorConfig::default());
//!     if let Some(report) = coordinator.tick().await {
//!         println!("{}", serde_json::to_string_pretty(&report)?);
//!     }
//!     Ok(())
//! }
//! ```

mod config;
mod coordinator;
mod error;
mod publish;
mod scheduler;
mod signals;
mod store;

pub use config::{CoordinatorConfig, RetryPolicy, WindowConfig};
pub use coordinator::{
    Coordinator, FeedOutcome, FeedPhase, FeedReport, FeedStatus, TickReport,
};
pub use error::{SinkError, SyncError, SyncResult};
pub use publish::{CalendarSink, EntityId, slugify};
pub use scheduler::{
    Scheduler, SchedulerCommand, SchedulerConfig, SchedulerHandle, SchedulerState,
    SharedSchedulerState,
};
pub use signals::{ReloadSignal, ShutdownSignal, SignalHandler};
pub use store::{EventDiff, EventStore, FeedSnapshot};
