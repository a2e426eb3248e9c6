//! One-shot sync command.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use eduvulcan_core::{CalendarEvent, Feed};
use eduvulcan_iris::IrisApi;
use eduvulcan_sync::{CalendarSink, Coordinator, TickReport};

use crate::config::AppConfig;
use crate::error::{CliError, CliResult};
use crate::sink::{JsonDirSink, LogSink};

use super::{build_client, load_credential};

/// What the command prints.
#[derive(Debug, Serialize)]
pub struct SyncOutput {
    pub report: TickReport,
    pub events: BTreeMap<Feed, Vec<CalendarEvent>>,
}

impl SyncOutput {
    /// Keeps only `feed` in the report and the events.
    pub fn only(mut self, feed: Feed) -> Self {
        self.report.feeds.retain(|r| r.feed == feed);
        self.events.retain(|f, _| *f == feed);
        self
    }
}

/// Runs one pass and prints the report and the published events.
///
/// The pass always covers every feed; `feed` only narrows what is printed
/// and checked. Fails with [`CliError::Incomplete`] after printing when a
/// feed was not published.
pub async fn run(config: &AppConfig, dry_run: bool, feed: Option<Feed>) -> CliResult<()> {
    let credential = load_credential(&config.token_path())?;
    let owner = credential.name().map(str::to_string);
    let api = build_client(config, credential)?;

    let sink: Arc<dyn CalendarSink> = if dry_run {
        Arc::new(LogSink)
    } else {
        let sink = JsonDirSink::create(config.output_dir(), config.output.pretty)?;
        info!(dir = %sink.dir().display(), "writing calendars");
        Arc::new(sink)
    };

    let mut output = sync_once(config, api, sink, owner.as_deref()).await?;
    if let Some(feed) = feed {
        output = output.only(feed);
    }
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| CliError::Output(format!("failed to serialize report: {}", e)))?;
    println!("{}", json);

    let failed = output
        .report
        .feeds
        .iter()
        .filter(|r| !r.outcome.is_published())
        .count();
    if failed > 0 {
        return Err(CliError::Incomplete { failed });
    }
    Ok(())
}

/// Runs one pass against `api` and collects the published events.
pub async fn sync_once(
    config: &AppConfig,
    api: Arc<dyn IrisApi>,
    sink: Arc<dyn CalendarSink>,
    owner: Option<&str>,
) -> CliResult<SyncOutput> {
    let coordinator = Coordinator::new(api, sink, config.coordinator_config(owner)?);
    let report = coordinator
        .tick()
        .await
        .ok_or_else(|| CliError::Output("sync pass did not run".to_string()))?;

    let store = coordinator.store();
    let events = Feed::ALL
        .into_iter()
        .map(|feed| (feed, store.events(feed).to_vec()))
        .collect();

    Ok(SyncOutput { report, events })
}
