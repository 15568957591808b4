//! # sn-core
//!
//! Real-time telemetry synchronization core for Sentinel Dash.
//!
//! This crate provides the telemetry data model, the shared severity palette,
//! the map projection, fixed-interval pollers feeding observable state cells,
//! the connectivity monitor and the single-flight analysis session.

pub mod dashboard;
pub mod geo;
pub mod health;
pub mod poller;
pub mod session;
pub mod severity;
pub mod source;
pub mod state_cell;
pub mod telemetry;

pub use dashboard::{Dashboard, SyncConfig, View};
pub use geo::{project, project_default, GeoSummary, Viewport};
pub use health::{Connectivity, HealthMonitor};
pub use poller::{FetchFn, PollStats, Poller, PollerConfig, StreamKind, MIN_POLL_INTERVAL};
pub use session::{
    AnalysisSession, Role, SessionLog, SubmitRejected, Turn, TurnContent,
    ANALYSIS_FAILED_MESSAGE, GREETING,
};
pub use severity::{severity_color, Severity, SeverityBreakdown, SeverityColor};
pub use source::{FetchError, FetchResult, TelemetrySource};
pub use state_cell::{CellState, CellStatus, StateCell};
pub use telemetry::{
    type_distribution, AnalysisResult, AnalyzeRequest, GeoThreatPoint, IndicatorKind,
    StatsSnapshot, ThreatEvent, ThreatFeed, ThreatMap,
};
