//! # sn-observability
//!
//! Logging and metrics infrastructure for Sentinel Dash.
//!
//! This crate provides structured logging with tracing and the counters the
//! synchronization core emits for every poll and analysis outcome.

pub mod logging;
pub mod metrics;

pub use logging::{init_logging_with_config, LoggingConfig};
pub use metrics::{record_analysis, record_poll, record_skipped_tick, register_metrics};
