use tokio::sync::watch;
use tokio::time::interval;
use tracing::{debug, info};

use crate::state::SharedState;

/// Connectivity as observed by the probe loop (or forced manually).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// The scoring backend is reachable.
    Online,
    /// The scoring backend is not reachable.
    Offline,
}

/// Connectivity observer backed by a watch channel.
///
/// Subscribers see the current value immediately and every transition after
/// that; `set_status` with an unchanged value does not wake them.
pub struct NetworkMonitor {
    status: watch::Sender<ConnectionStatus>,
}

impl NetworkMonitor {
    /// Build a monitor with the given initial status.
    pub fn new(initial: ConnectionStatus) -> Self {
        let (status, _rx) = watch::channel(initial);
        Self { status }
    }

    /// Current connectivity.
    pub fn current(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    /// Whether the backend is currently reachable.
    pub fn is_online(&self) -> bool {
        self.current() == ConnectionStatus::Online
    }

    /// Register a subscriber that observes subsequent transitions.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    /// Record an observed status, notifying subscribers only on transition.
    pub fn set_status(&self, status: ConnectionStatus) {
        let changed = self.status.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });

        if changed {
            info!(?status, "connectivity changed");
        }
    }
}

/// Periodically probe the remote API and keep the shared connectivity flag
/// in sync with what the probe observes.
pub async fn run_probe_loop(state: SharedState, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = interval(state.config().probe_interval);

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                info!("stopping connectivity probe");
                break;
            }
            _ = ticker.tick() => {
                let status = match state.api().ping().await {
                    Ok(()) => ConnectionStatus::Online,
                    Err(err) => {
                        debug!(error = %err, "connectivity probe failed");
                        ConnectionStatus::Offline
                    }
                };
                state.network().set_status(status);
            }
        }
    }
}
