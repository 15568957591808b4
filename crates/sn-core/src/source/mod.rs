//! The remote telemetry source seam.
//!
//! Everything the synchronization core pulls (health, stats, the threat feed,
//! the threat map) and the on-demand analysis goes through [`TelemetrySource`].
//! The HTTP implementation lives in `sn-connectors`; [`mock`] provides a
//! scripted implementation for tests.

pub mod mock;

use crate::telemetry::{AnalysisResult, StatsSnapshot, ThreatFeed, ThreatMap};
use async_trait::async_trait;
use thiserror::Error;

/// Classified failure of one fetch.
///
/// Every failure is recovered at the poller or session boundary; none of them
/// propagates to the view as a panic or an unhandled error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Connection failure or timeout.
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),

    /// The source answered with a non-2xx status.
    #[error("Server error: HTTP {status}")]
    ServerError { status: u16 },

    /// The payload did not match the expected schema or value ranges.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl FetchError {
    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::NetworkUnavailable(_) => "network_unavailable",
            FetchError::ServerError { .. } => "server_error",
            FetchError::MalformedResponse(_) => "malformed_response",
        }
    }

    /// Builds a timeout failure.
    pub fn timed_out(after: std::time::Duration) -> Self {
        FetchError::NetworkUnavailable(format!("request timed out after {:?}", after))
    }
}

/// Result type for fetches against a telemetry source.
pub type FetchResult<T> = Result<T, FetchError>;

/// A remote source of dashboard telemetry.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Returns the source name (for logging).
    fn name(&self) -> &str;

    /// Liveness probe. Any success means the source is online.
    async fn probe_health(&self) -> FetchResult<()>;

    /// Fetches the aggregate statistics snapshot.
    async fn fetch_stats(&self) -> FetchResult<StatsSnapshot>;

    /// Fetches the current threat feed.
    async fn fetch_threat_feed(&self) -> FetchResult<ThreatFeed>;

    /// Fetches the current set of geolocated threats.
    async fn fetch_threat_map(&self) -> FetchResult<ThreatMap>;

    /// Requests a risk analysis of an IP address or domain.
    async fn analyze(&self, target: &str) -> FetchResult<AnalysisResult>;
}
