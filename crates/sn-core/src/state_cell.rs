//! Observable per-stream state.
//!
//! A [`StateCell`] holds the last known value of one stream together with its
//! load status, last error and timestamps. Only the owning poller writes to
//! it; views read snapshots or subscribe to changes.

use crate::source::FetchError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

/// Load status of a state cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CellStatus {
    /// No poll has completed yet.
    Loading,
    /// The last poll succeeded.
    Ready,
    /// The last poll failed. A previous value may still be present.
    Error,
}

impl std::fmt::Display for CellStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellStatus::Loading => write!(f, "loading"),
            CellStatus::Ready => write!(f, "ready"),
            CellStatus::Error => write!(f, "error"),
        }
    }
}

/// Snapshot of a state cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellState<T> {
    pub status: CellStatus,
    /// Last successfully fetched value, retained across failures.
    pub value: Option<T>,
    /// Error of the last poll, cleared on success.
    pub error: Option<FetchError>,
    /// When `value` was last replaced.
    pub last_updated: Option<DateTime<Utc>>,
    /// When the last poll (successful or not) completed.
    pub last_attempt: Option<DateTime<Utc>>,
}

impl<T> CellState<T> {
    fn loading() -> Self {
        Self {
            status: CellStatus::Loading,
            value: None,
            error: None,
            last_updated: None,
            last_attempt: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == CellStatus::Ready
    }

    /// True when the cell shows a value that failed to refresh.
    pub fn is_stale(&self) -> bool {
        self.status == CellStatus::Error && self.value.is_some()
    }
}

/// Observable state of one data stream.
pub struct StateCell<T> {
    tx: watch::Sender<CellState<T>>,
}

impl<T: Clone> StateCell<T> {
    /// Creates a cell in the loading state.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(CellState::loading());
        Self { tx }
    }

    /// Returns a copy of the current state.
    pub fn snapshot(&self) -> CellState<T> {
        self.tx.borrow().clone()
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<CellState<T>> {
        self.tx.subscribe()
    }

    /// Replaces the value and marks the cell ready.
    pub(crate) fn apply_success(&self, value: T) {
        let now = Utc::now();
        self.tx.send_modify(|state| {
            state.status = CellStatus::Ready;
            state.value = Some(value);
            state.error = None;
            state.last_updated = Some(now);
            state.last_attempt = Some(now);
        });
    }

    /// Records a failure, keeping the previous value.
    pub(crate) fn apply_failure(&self, error: FetchError) {
        let now = Utc::now();
        self.tx.send_modify(|state| {
            state.status = CellStatus::Error;
            state.error = Some(error);
            state.last_attempt = Some(now);
        });
    }
}

impl<T: Clone> Default for StateCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for StateCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateCell")
            .field("status", &self.tx.borrow().status)
            .finish()
    }
}
