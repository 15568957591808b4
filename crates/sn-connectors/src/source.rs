//! [`TelemetrySource`] backed by the dashboard's REST API.

use crate::config::ConnectorConfig;
use crate::error::ConnectorResult;
use crate::http::HttpClient;
use async_trait::async_trait;
use sn_core::{
    AnalysisResult, AnalyzeRequest, FetchResult, StatsSnapshot, TelemetrySource, ThreatFeed,
    ThreatMap,
};
use tracing::{debug, instrument};

/// Liveness endpoint.
pub const HEALTH_PATH: &str = "/";
/// Aggregate statistics endpoint.
pub const STATS_PATH: &str = "/api/stats";
/// Threat feed endpoint.
pub const THREAT_FEED_PATH: &str = "/api/threat-feed";
/// Geolocated threats endpoint.
pub const THREAT_MAP_PATH: &str = "/api/threat-map";
/// Analysis endpoint.
pub const ANALYZE_PATH: &str = "/api/analyze";

/// Telemetry source talking to the REST API over HTTP.
pub struct HttpTelemetrySource {
    client: HttpClient,
}

impl HttpTelemetrySource {
    /// Creates a new source from connector configuration.
    pub fn new(config: ConnectorConfig) -> ConnectorResult<Self> {
        Ok(Self {
            client: HttpClient::new(config)?,
        })
    }

    /// Creates a source for `base_url` with default settings.
    pub fn from_base_url(base_url: &str) -> ConnectorResult<Self> {
        Self::new(ConnectorConfig::new("sentinel-api", base_url))
    }

    pub fn base_url(&self) -> &str {
        self.client.base_url()
    }
}

#[async_trait]
impl TelemetrySource for HttpTelemetrySource {
    fn name(&self) -> &str {
        self.client.name()
    }

    #[instrument(skip(self), fields(connector = %self.client.name()))]
    async fn probe_health(&self) -> FetchResult<()> {
        // Any 2xx means online; the body is not inspected.
        self.client.get(HEALTH_PATH).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(connector = %self.client.name()))]
    async fn fetch_stats(&self) -> FetchResult<StatsSnapshot> {
        Ok(self.client.get_json(STATS_PATH).await?)
    }

    #[instrument(skip(self), fields(connector = %self.client.name()))]
    async fn fetch_threat_feed(&self) -> FetchResult<ThreatFeed> {
        let feed: ThreatFeed = self.client.get_json(THREAT_FEED_PATH).await?;
        debug!(count = feed.threats.len(), "Fetched threat feed");
        Ok(feed)
    }

    #[instrument(skip(self), fields(connector = %self.client.name()))]
    async fn fetch_threat_map(&self) -> FetchResult<ThreatMap> {
        let map: ThreatMap = self.client.get_json(THREAT_MAP_PATH).await?;
        debug!(count = map.threats.len(), "Fetched threat map");
        Ok(map)
    }

    #[instrument(skip(self, target), fields(connector = %self.client.name(), indicator = %target))]
    async fn analyze(&self, target: &str) -> FetchResult<AnalysisResult> {
        let request = AnalyzeRequest {
            target: target.to_string(),
        };
        Ok(self.client.post_json(ANALYZE_PATH, &request).await?)
    }
}
