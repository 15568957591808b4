//! Integration tests for the HTTP telemetry source.
//!
//! These tests run the connector against a local canned-response server and
//! cover payload decoding, failure classification and the request shapes the
//! API expects.
//!
//! # Running these tests
//!
//! ```bash
//! cargo test --package sn-connectors --test http_source_tests
//! ```

use std::sync::Arc;
use std::time::Duration;

use sn_connectors::testing::{test_connector_config, CannedResponse, TestServer};
use sn_connectors::HttpTelemetrySource;
use sn_core::{CellStatus, FetchError, Poller, PollerConfig, Severity, TelemetrySource};

const STATS_JSON: &str = r#"{"total_alerts":1342,"active_ransomware":23,"system_health":96,"blocked_threats":3120,"monitored_endpoints":912}"#;

const FEED_JSON: &str = r#"{"threats":[
    {"id":"THR-48213","source":"AlienVault OTX","severity":"critical","timestamp":"2024-05-01T10:15:59.120000","threat_type":"Ransomware","description":"File encryption activity detected"},
    {"id":"THR-48212","source":"AbuseIPDB","severity":"informational","timestamp":"2024-05-01T10:15:58.004000","threat_type":"C2","description":"Command and control beacon identified"}
]}"#;

const MAP_JSON: &str = r#"{"threats":[
    {"id":"GEO-1","lat":55.75,"lng":37.62,"country":"Russia","severity":"high","threat_type":"C2","description":"Beacon","ip_address":"185.220.101.4","timestamp":"2024-05-01T10:15:00Z"}
]}"#;

const ANALYSIS_JSON: &str = r#"{"target":"8.8.8.8","risk_score":85,"threat_level":"Critical","findings":["IP 8.8.8.8 appears in 4 threat intelligence feeds"],"recommendations":["Block IP at network perimeter"]}"#;

fn source_for(server: &TestServer) -> HttpTelemetrySource {
    HttpTelemetrySource::new(test_connector_config("test", server.base_url())).unwrap()
}

// ============================================================================
// Decoding
// ============================================================================

#[tokio::test]
async fn test_fetch_stats() {
    let server = TestServer::start(vec![("/api/stats", CannedResponse::ok(STATS_JSON))])
        .await
        .unwrap();
    let source = source_for(&server);

    let stats = source.fetch_stats().await.unwrap();
    assert_eq!(stats.total_alerts, 1342);
    assert_eq!(stats.active_ransomware, 23);
    assert_eq!(stats.system_health, 96);
    assert_eq!(stats.monitored_endpoints, 912);
}

#[tokio::test]
async fn test_fetch_threat_feed_keeps_order_and_unknown_severity() {
    let server = TestServer::start(vec![("/api/threat-feed", CannedResponse::ok(FEED_JSON))])
        .await
        .unwrap();
    let source = source_for(&server);

    let feed = source.fetch_threat_feed().await.unwrap();
    assert_eq!(feed.threats.len(), 2);
    assert_eq!(feed.threats[0].id, "THR-48213");
    assert_eq!(feed.threats[0].severity, Severity::Critical);
    assert_eq!(feed.threats[1].severity, Severity::Unknown);
    assert!(feed.threats[0].occurred_at().is_some());
}

#[tokio::test]
async fn test_fetch_threat_map() {
    let server = TestServer::start(vec![("/api/threat-map", CannedResponse::ok(MAP_JSON))])
        .await
        .unwrap();
    let source = source_for(&server);

    let map = source.fetch_threat_map().await.unwrap();
    assert_eq!(map.threats.len(), 1);
    assert_eq!(map.threats[0].country, "Russia");
}

#[tokio::test]
async fn test_analyze_posts_target() {
    let server = TestServer::start(vec![("/api/analyze", CannedResponse::ok(ANALYSIS_JSON))])
        .await
        .unwrap();
    let source = source_for(&server);

    let result = source.analyze("8.8.8.8").await.unwrap();
    assert_eq!(result.risk_score, 85);
    assert_eq!(result.threat_level, Severity::Critical);

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path, "/api/analyze");
    let body: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
    assert_eq!(body["target"], "8.8.8.8");
}

#[tokio::test]
async fn test_health_accepts_any_success_body() {
    let server = TestServer::start(vec![(
        "/",
        CannedResponse::ok(r#"{"status":"online","service":"SentinelAI API"}"#),
    )])
    .await
    .unwrap();
    let source = source_for(&server);

    assert!(source.probe_health().await.is_ok());
    assert_eq!(server.requests()[0].method, "GET");
}

// ============================================================================
// Failure classification
// ============================================================================

#[tokio::test]
async fn test_missing_route_is_server_error() {
    let server = TestServer::start(vec![]).await.unwrap();
    let source = source_for(&server);

    assert_eq!(
        source.fetch_threat_map().await,
        Err(FetchError::ServerError { status: 404 })
    );
}

#[tokio::test]
async fn test_internal_error_is_server_error() {
    let server = TestServer::start(vec![(
        "/api/stats",
        CannedResponse::json(500, r#"{"detail":"boom"}"#),
    )])
    .await
    .unwrap();
    let source = source_for(&server);

    assert_eq!(
        source.fetch_stats().await,
        Err(FetchError::ServerError { status: 500 })
    );
}

#[tokio::test]
async fn test_schema_mismatch_is_malformed() {
    let server = TestServer::start(vec![
        ("/api/stats", CannedResponse::ok(r#"{"total_alerts":"many"}"#)),
        ("/api/threat-feed", CannedResponse::ok("<html>maintenance</html>")),
    ])
    .await
    .unwrap();
    let source = source_for(&server);

    assert!(matches!(
        source.fetch_stats().await,
        Err(FetchError::MalformedResponse(_))
    ));
    assert!(matches!(
        source.fetch_threat_feed().await,
        Err(FetchError::MalformedResponse(_))
    ));
}

#[tokio::test]
async fn test_connection_refused_is_network_unavailable() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let source =
        HttpTelemetrySource::new(test_connector_config("test", &format!("http://{}", addr)))
            .unwrap();

    assert!(matches!(
        source.probe_health().await,
        Err(FetchError::NetworkUnavailable(_))
    ));
}

#[tokio::test]
async fn test_transport_timeout_is_network_unavailable() {
    let server = TestServer::start(vec![(
        "/api/stats",
        CannedResponse::ok(STATS_JSON).after(Duration::from_secs(3)),
    )])
    .await
    .unwrap();
    let mut config = test_connector_config("test", server.base_url());
    config.timeout_secs = 1;
    let source = HttpTelemetrySource::new(config).unwrap();

    assert!(matches!(
        source.fetch_stats().await,
        Err(FetchError::NetworkUnavailable(_))
    ));
}

// ============================================================================
// Poller over HTTP
// ============================================================================

#[tokio::test]
async fn test_poller_over_http() {
    let server = TestServer::start(vec![("/api/stats", CannedResponse::ok(STATS_JSON))])
        .await
        .unwrap();
    let source: Arc<dyn TelemetrySource> = Arc::new(source_for(&server));
    let poller = Poller::for_stats(source, PollerConfig::from_secs(10, 5));

    let mut rx = poller.subscribe();
    poller.start();
    tokio::time::timeout(Duration::from_secs(5), rx.changed())
        .await
        .unwrap()
        .unwrap();

    let state = poller.snapshot();
    assert_eq!(state.status, CellStatus::Ready);
    assert_eq!(state.value.map(|s| s.total_alerts), Some(1342));
    poller.stop();
}
