//! Connectivity monitor for the remote source.

use crate::poller::{PollStats, Poller, PollerConfig};
use crate::source::TelemetrySource;
use crate::state_cell::{CellState, CellStatus};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

/// Binary connectivity of the remote source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    Online,
    Offline,
}

impl Connectivity {
    /// Online only after a successful probe; loading counts as offline.
    pub fn from_state(state: &CellState<()>) -> Self {
        match state.status {
            CellStatus::Ready => Connectivity::Online,
            CellStatus::Loading | CellStatus::Error => Connectivity::Offline,
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, Connectivity::Online)
    }
}

impl std::fmt::Display for Connectivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Connectivity::Online => write!(f, "online"),
            Connectivity::Offline => write!(f, "offline"),
        }
    }
}

/// Polls the liveness endpoint and reports online/offline.
///
/// Runs on its own schedule and timeout; its failures never touch the data
/// streams.
pub struct HealthMonitor {
    poller: Poller<()>,
}

impl HealthMonitor {
    pub fn new(source: Arc<dyn TelemetrySource>, config: PollerConfig) -> Self {
        Self {
            poller: Poller::for_health(source, config),
        }
    }

    pub fn start(&self) {
        self.poller.start();
    }

    pub fn stop(&self) {
        self.poller.stop();
    }

    pub fn is_running(&self) -> bool {
        self.poller.is_running()
    }

    /// Current connectivity.
    pub fn connectivity(&self) -> Connectivity {
        Connectivity::from_state(&self.poller.snapshot())
    }

    /// Full state of the underlying cell.
    pub fn snapshot(&self) -> CellState<()> {
        self.poller.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<CellState<()>> {
        self.poller.subscribe()
    }

    pub fn poll_stats(&self) -> PollStats {
        self.poller.poll_stats()
    }
}
