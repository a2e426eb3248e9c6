//! Daemon command: keeps the calendars fresh in the foreground.
//!
//! - Signal handler (SIGTERM/SIGINT for shutdown, SIGHUP for token reload)
//! - Scheduler (periodic sync passes)
//! - JSON calendar output

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use eduvulcan_sync::{Coordinator, Scheduler, SchedulerHandle, SignalHandler};

use crate::config::AppConfig;
use crate::error::CliResult;
use crate::sink::JsonDirSink;

use super::{build_client, load_credential};

/// Runs until a shutdown signal is received.
///
/// The token is validated before anything else; an invalid token ends the
/// process before any network access.
pub async fn run(config: &AppConfig) -> CliResult<()> {
    let credential = load_credential(&config.token_path())?;
    let coordinator_config = config.coordinator_config(credential.name())?;
    let api = build_client(config, credential)?;
    let sink = JsonDirSink::create(config.output_dir(), config.output.pretty)?;
    info!(dir = %sink.dir().display(), "writing calendars");

    let coordinator = Arc::new(Coordinator::new(api, Arc::new(sink), coordinator_config));
    for feed in eduvulcan_core::Feed::ALL {
        if let Some(entity) = coordinator.entity(feed) {
            info!(feed = %feed, entity = %entity, "calendar registered");
        }
    }

    let signals = SignalHandler::new();
    signals.spawn_listener();

    let scheduler = Scheduler::new(config.scheduler_config());
    let handle = scheduler.handle();

    let sync_coordinator = coordinator.clone();
    let mut scheduler_task = tokio::spawn(scheduler.run(move || {
        let coordinator = sync_coordinator.clone();
        async move { coordinator.tick().await }
    }));

    let shutdown = signals.shutdown().wait();
    tokio::pin!(shutdown);
    let mut reloads = signals.reloads();

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            more = reloads.next() => {
                if !more {
                    break;
                }
                reload(config, &coordinator, &handle).await;
            }
            result = &mut scheduler_task => {
                if let Err(e) = result {
                    error!(error = %e, "scheduler task failed");
                }
                return Ok(());
            }
        }
    }

    info!("shutting down");
    if let Err(e) = handle.stop().await {
        warn!(error = %e, "failed to send stop command to scheduler");
    }
    if tokio::time::timeout(Duration::from_secs(5), scheduler_task)
        .await
        .is_err()
    {
        warn!("scheduler did not stop in time");
    }

    info!("stopped");
    Ok(())
}

/// Re-reads the token file and swaps in a new client.
///
/// A token that fails validation is reported and the running client kept.
async fn reload(config: &AppConfig, coordinator: &Coordinator, handle: &SchedulerHandle) {
    let path = config.token_path();
    let credential = match load_credential(&path) {
        Ok(credential) => credential,
        Err(e) => {
            error!(path = %path.display(), error = %e, "reload failed, keeping current token");
            return;
        }
    };
    let api = match build_client(config, credential) {
        Ok(api) => api,
        Err(e) => {
            error!(error = %e, "reload failed, keeping current client");
            return;
        }
    };

    coordinator.reload(api);
    info!("token reloaded");
    if let Err(e) = handle.sync_now().await {
        warn!(error = %e, "failed to trigger sync after reload");
    }
}
