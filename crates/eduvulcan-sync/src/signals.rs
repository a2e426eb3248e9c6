//! Unix signal handling for the daemon.
//!
//! - SIGTERM/SIGINT: graceful shutdown
//! - SIGHUP: reload the token file

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Listens for process signals and fans them out over watch channels.
pub struct SignalHandler {
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
    /// Incremented on every reload request.
    reload_tx: Arc<watch::Sender<u64>>,
    reload_rx: watch::Receiver<u64>,
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalHandler {
    /// Creates a new signal handler.
    pub fn new() -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (reload_tx, reload_rx) = watch::channel(0);

        Self {
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
            reload_tx: Arc::new(reload_tx),
            reload_rx,
        }
    }

    /// Spawns the signal listener task.
    #[cfg(unix)]
    pub fn spawn_listener(&self) {
        use tokio::signal::unix::{SignalKind, signal};

        let shutdown_tx = self.shutdown_tx.clone();
        let reload_tx = self.reload_tx.clone();

        tokio::spawn(async move {
            let handlers = (
                signal(SignalKind::terminate()),
                signal(SignalKind::interrupt()),
                signal(SignalKind::hangup()),
            );
            let (mut sigterm, mut sigint, mut sighup) = match handlers {
                (Ok(term), Ok(int), Ok(hup)) => (term, int, hup),
                (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
                    warn!(error = %e, "failed to install signal handlers, falling back to Ctrl+C");
                    if tokio::signal::ctrl_c().await.is_ok() {
                        info!("received Ctrl+C, initiating shutdown");
                        let _ = shutdown_tx.send(true);
                    }
                    return;
                }
            };

            loop {
                tokio::select! {
                    _ = sigterm.recv() => {
                        info!("received SIGTERM, initiating shutdown");
                        let _ = shutdown_tx.send(true);
                        break;
                    }
                    _ = sigint.recv() => {
                        info!("received SIGINT, initiating shutdown");
                        let _ = shutdown_tx.send(true);
                        break;
                    }
                    _ = sighup.recv() => {
                        info!("received SIGHUP, reloading token");
                        reload_tx.send_modify(|n| *n += 1);
                    }
                }
            }

            debug!("signal listener stopped");
        });
    }

    /// Spawns the signal listener task; only Ctrl+C is handled.
    #[cfg(not(unix))]
    pub fn spawn_listener(&self) {
        let shutdown_tx = self.shutdown_tx.clone();

        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("received Ctrl+C, initiating shutdown");
                let _ = shutdown_tx.send(true);
            }
        });
    }

    /// Returns a future that completes when shutdown is signaled.
    pub fn shutdown(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.shutdown_rx.clone(),
        }
    }

    /// Returns a receiver that changes on every reload request.
    pub fn reloads(&self) -> ReloadSignal {
        let mut rx = self.reload_rx.clone();
        rx.mark_unchanged();
        ReloadSignal { rx }
    }

    /// Returns true if shutdown has been signaled.
    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// Programmatically triggers a shutdown.
    pub fn trigger_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Programmatically triggers a reload.
    pub fn trigger_reload(&self) {
        self.reload_tx.send_modify(|n| *n += 1);
    }
}

/// A signal that completes when shutdown is signaled.
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Waits for the shutdown signal.
    pub async fn wait(mut self) {
        // An error means the handler is gone; treat it as shutdown
        let _ = self.rx.wait_for(|shutdown| *shutdown).await;
    }
}

/// Stream of reload requests.
pub struct ReloadSignal {
    rx: watch::Receiver<u64>,
}

impl ReloadSignal {
    /// Waits for the next reload request.
    ///
    /// Requests arriving while the previous one is handled are coalesced.
    /// Returns `false` once the handler is gone.
    pub async fn next(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Number of reload requests so far.
    pub fn count(&self) -> u64 {
        *self.rx.borrow()
    }
}
