//! # sn-connectors
//!
//! HTTP connector for the Sentinel Dash telemetry API.
//!
//! This crate provides the reqwest-based client and the [`HttpTelemetrySource`]
//! implementation of `sn_core::TelemetrySource`.

pub mod config;
pub mod error;
pub mod http;
pub mod source;
pub mod testing;

pub use config::{ConnectorConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
pub use error::{ConnectorError, ConnectorResult};
pub use http::HttpClient;
pub use source::HttpTelemetrySource;
