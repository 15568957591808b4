//! Mock telemetry source for testing.
//!
//! Each endpoint has a queue of scripted replies consumed in order, and a
//! fallback reply used once the queue is empty. Replies can be delayed
//! (through `tokio::time::sleep`, so paused-clock tests stay deterministic),
//! and a source-wide [`MockBehavior`] allows failure injection.

use super::{FetchError, FetchResult, TelemetrySource};
use crate::severity::Severity;
use crate::telemetry::{
    AnalysisResult, GeoThreatPoint, StatsSnapshot, ThreatEvent, ThreatFeed, ThreatMap,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Source-wide behavior for failure injection.
#[derive(Debug, Clone, Default)]
pub enum MockBehavior {
    /// Serve scripted replies.
    #[default]
    Normal,
    /// Fail every call with the given error.
    AlwaysFail(FetchError),
    /// Add latency before every reply.
    WithLatency(Duration),
}

/// Endpoints of the mock, for call accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockEndpoint {
    Health,
    Stats,
    ThreatFeed,
    ThreatMap,
    Analyze,
}

/// One scripted reply.
#[derive(Debug, Clone)]
pub struct MockReply<T> {
    pub outcome: FetchResult<T>,
    pub delay: Duration,
}

impl<T> MockReply<T> {
    /// Immediate success.
    pub fn ok(value: T) -> Self {
        Self {
            outcome: Ok(value),
            delay: Duration::ZERO,
        }
    }

    /// Immediate failure.
    pub fn err(error: FetchError) -> Self {
        Self {
            outcome: Err(error),
            delay: Duration::ZERO,
        }
    }

    /// Delays this reply.
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Record of a call for test verification.
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub endpoint: MockEndpoint,
    /// The analysis target, for [`MockEndpoint::Analyze`].
    pub target: Option<String>,
    pub timestamp: DateTime<Utc>,
}

struct Script<T> {
    queue: VecDeque<MockReply<T>>,
    fallback: MockReply<T>,
}

impl<T: Clone> Script<T> {
    fn new(fallback: MockReply<T>) -> Self {
        Self {
            queue: VecDeque::new(),
            fallback,
        }
    }

    fn next(&mut self) -> MockReply<T> {
        self.queue
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

/// Mock telemetry source for testing.
pub struct MockTelemetrySource {
    name: String,
    health: RwLock<Script<()>>,
    stats: RwLock<Script<StatsSnapshot>>,
    feed: RwLock<Script<ThreatFeed>>,
    map: RwLock<Script<ThreatMap>>,
    /// Scripted analyses; when empty a result is derived from the target.
    analyses: RwLock<VecDeque<MockReply<AnalysisResult>>>,
    behavior: Arc<RwLock<MockBehavior>>,
    call_count: AtomicU64,
    call_counts: RwLock<HashMap<MockEndpoint, u64>>,
    history: Arc<RwLock<Vec<CallRecord>>>,
}

impl MockTelemetrySource {
    /// Creates a mock that answers every endpoint with sample data.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            health: RwLock::new(Script::new(MockReply::ok(()))),
            stats: RwLock::new(Script::new(MockReply::ok(sample_stats()))),
            feed: RwLock::new(Script::new(MockReply::ok(sample_feed()))),
            map: RwLock::new(Script::new(MockReply::ok(sample_map()))),
            analyses: RwLock::new(VecDeque::new()),
            behavior: Arc::new(RwLock::new(MockBehavior::Normal)),
            call_count: AtomicU64::new(0),
            call_counts: RwLock::new(HashMap::new()),
            history: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Queues a health probe reply.
    pub async fn push_health(&self, reply: MockReply<()>) {
        self.health.write().await.queue.push_back(reply);
    }

    /// Queues a stats reply.
    pub async fn push_stats(&self, reply: MockReply<StatsSnapshot>) {
        self.stats.write().await.queue.push_back(reply);
    }

    /// Queues a threat feed reply.
    pub async fn push_feed(&self, reply: MockReply<ThreatFeed>) {
        self.feed.write().await.queue.push_back(reply);
    }

    /// Queues a threat map reply.
    pub async fn push_map(&self, reply: MockReply<ThreatMap>) {
        self.map.write().await.queue.push_back(reply);
    }

    /// Queues an analysis reply.
    pub async fn push_analysis(&self, reply: MockReply<AnalysisResult>) {
        self.analyses.write().await.push_back(reply);
    }

    /// Sets the reply used once the health queue is empty.
    pub async fn set_health_fallback(&self, reply: MockReply<()>) {
        self.health.write().await.fallback = reply;
    }

    /// Sets the reply used once the stats queue is empty.
    pub async fn set_stats_fallback(&self, reply: MockReply<StatsSnapshot>) {
        self.stats.write().await.fallback = reply;
    }

    /// Sets the reply used once the feed queue is empty.
    pub async fn set_feed_fallback(&self, reply: MockReply<ThreatFeed>) {
        self.feed.write().await.fallback = reply;
    }

    /// Sets the reply used once the map queue is empty.
    pub async fn set_map_fallback(&self, reply: MockReply<ThreatMap>) {
        self.map.write().await.fallback = reply;
    }

    /// Sets the behavior for failure injection.
    pub async fn set_behavior(&self, behavior: MockBehavior) {
        let mut b = self.behavior.write().await;
        *b = behavior;
    }

    /// Gets the call history for test verification.
    pub async fn get_history(&self) -> Vec<CallRecord> {
        let history = self.history.read().await;
        history.clone()
    }

    /// Number of calls made to one endpoint.
    pub async fn calls_to(&self, endpoint: MockEndpoint) -> u64 {
        let counts = self.call_counts.read().await;
        counts.get(&endpoint).copied().unwrap_or(0)
    }

    /// Gets the total call count.
    pub fn get_call_count(&self) -> u64 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Records a call and applies the source-wide behavior.
    async fn record_and_check(
        &self,
        endpoint: MockEndpoint,
        target: Option<&str>,
    ) -> FetchResult<()> {
        {
            let mut history = self.history.write().await;
            history.push(CallRecord {
                endpoint,
                target: target.map(str::to_string),
                timestamp: Utc::now(),
            });
        }
        {
            let mut counts = self.call_counts.write().await;
            *counts.entry(endpoint).or_insert(0) += 1;
        }
        self.call_count.fetch_add(1, Ordering::SeqCst);

        let behavior = self.behavior.read().await.clone();
        match behavior {
            MockBehavior::Normal => Ok(()),
            MockBehavior::AlwaysFail(error) => Err(error),
            MockBehavior::WithLatency(duration) => {
                tokio::time::sleep(duration).await;
                Ok(())
            }
        }
    }
}

async fn deliver<T>(reply: MockReply<T>) -> FetchResult<T> {
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }
    reply.outcome
}

#[async_trait]
impl TelemetrySource for MockTelemetrySource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn probe_health(&self) -> FetchResult<()> {
        self.record_and_check(MockEndpoint::Health, None).await?;
        let reply = self.health.write().await.next();
        deliver(reply).await
    }

    async fn fetch_stats(&self) -> FetchResult<StatsSnapshot> {
        self.record_and_check(MockEndpoint::Stats, None).await?;
        let reply = self.stats.write().await.next();
        deliver(reply).await
    }

    async fn fetch_threat_feed(&self) -> FetchResult<ThreatFeed> {
        self.record_and_check(MockEndpoint::ThreatFeed, None).await?;
        let reply = self.feed.write().await.next();
        deliver(reply).await
    }

    async fn fetch_threat_map(&self) -> FetchResult<ThreatMap> {
        self.record_and_check(MockEndpoint::ThreatMap, None).await?;
        let reply = self.map.write().await.next();
        deliver(reply).await
    }

    async fn analyze(&self, target: &str) -> FetchResult<AnalysisResult> {
        self.record_and_check(MockEndpoint::Analyze, Some(target))
            .await?;
        let reply = self
            .analyses
            .write()
            .await
            .pop_front()
            .unwrap_or_else(|| MockReply::ok(sample_analysis(target)));
        deliver(reply).await
    }
}

/// Sample statistics snapshot.
pub fn sample_stats() -> StatsSnapshot {
    StatsSnapshot {
        total_alerts: 1342,
        active_ransomware: 23,
        system_health: 96,
        blocked_threats: 3120,
        monitored_endpoints: 912,
    }
}

/// Sample threat feed, most recent first.
pub fn sample_feed() -> ThreatFeed {
    let events = [
        ("THR-48213", "AlienVault OTX", Severity::Critical, "Ransomware", "File encryption activity detected"),
        ("THR-48212", "AbuseIPDB", Severity::High, "C2", "Command and control beacon identified"),
        ("THR-48211", "VirusTotal", Severity::Medium, "Phishing", "Credential harvesting page reported"),
        ("THR-48210", "URLhaus", Severity::Low, "Malware", "Suspicious download observed"),
    ];
    ThreatFeed {
        threats: events
            .iter()
            .enumerate()
            .map(|(i, (id, source, severity, threat_type, description))| ThreatEvent {
                id: id.to_string(),
                source: source.to_string(),
                severity: *severity,
                timestamp: format!("2024-05-01T10:15:{:02}", 59 - i),
                threat_type: threat_type.to_string(),
                description: description.to_string(),
            })
            .collect(),
    }
}

/// Sample geolocated threats.
pub fn sample_map() -> ThreatMap {
    let points = [
        ("GEO-1", 55.75, 37.62, "Russia", Severity::Critical, "Ransomware", "185.220.101.4"),
        ("GEO-2", 39.90, 116.40, "China", Severity::High, "C2", "61.177.172.13"),
        ("GEO-3", -23.55, -46.63, "Brazil", Severity::Medium, "Phishing", "177.54.144.10"),
        ("GEO-4", 40.71, -74.01, "United States", Severity::Low, "DDoS", "198.51.100.23"),
    ];
    ThreatMap {
        threats: points
            .iter()
            .map(|(id, lat, lng, country, severity, threat_type, ip)| GeoThreatPoint {
                id: id.to_string(),
                lat: *lat,
                lng: *lng,
                country: country.to_string(),
                severity: *severity,
                threat_type: threat_type.to_string(),
                description: format!("{} activity from {}", threat_type, country),
                ip_address: ip.to_string(),
                timestamp: "2024-05-01T10:15:00Z".to_string(),
            })
            .collect(),
    }
}

/// Deterministic analysis for a target.
pub fn sample_analysis(target: &str) -> AnalysisResult {
    let risk_score = (target.bytes().map(u32::from).sum::<u32>() % 101) as u8;
    let threat_level = match risk_score {
        80..=100 => Severity::Critical,
        60..=79 => Severity::High,
        40..=59 => Severity::Medium,
        _ => Severity::Low,
    };
    AnalysisResult {
        target: target.to_string(),
        risk_score,
        threat_level,
        findings: vec![
            format!("{} appears in 2 threat intelligence feeds", target),
            "No associated malware families".to_string(),
        ],
        recommendations: vec![
            "Monitor for additional suspicious activity".to_string(),
            "Review related network logs".to_string(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_replies() {
        let mock = MockTelemetrySource::new("test");
        assert!(mock.probe_health().await.is_ok());
        assert_eq!(mock.fetch_stats().await.unwrap(), sample_stats());
        assert_eq!(mock.fetch_threat_feed().await.unwrap().threats.len(), 4);
        assert!(mock.fetch_threat_map().await.unwrap().validate().is_ok());

        let result = mock.analyze("8.8.8.8").await.unwrap();
        assert_eq!(result.target, "8.8.8.8");
        assert!(result.validate().is_ok());
    }

    #[tokio::test]
    async fn test_queue_then_fallback() {
        let mock = MockTelemetrySource::new("test");
        mock.push_stats(MockReply::err(FetchError::ServerError { status: 502 }))
            .await;

        assert_eq!(
            mock.fetch_stats().await,
            Err(FetchError::ServerError { status: 502 })
        );
        assert_eq!(mock.fetch_stats().await, Ok(sample_stats()));
        assert_eq!(mock.calls_to(MockEndpoint::Stats).await, 2);
        assert_eq!(mock.calls_to(MockEndpoint::ThreatFeed).await, 0);
    }

    #[tokio::test]
    async fn test_always_fail() {
        let mock = MockTelemetrySource::new("test");
        let error = FetchError::NetworkUnavailable("connection refused".into());
        mock.set_behavior(MockBehavior::AlwaysFail(error.clone())).await;

        assert_eq!(mock.probe_health().await, Err(error.clone()));
        assert_eq!(mock.analyze("x").await, Err(error));
        assert_eq!(mock.get_call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_reply() {
        let mock = MockTelemetrySource::new("test");
        mock.push_health(MockReply::ok(()).after(Duration::from_secs(30)))
            .await;

        let started = tokio::time::Instant::now();
        assert!(mock.probe_health().await.is_ok());
        assert!(started.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_history_records_targets() {
        let mock = MockTelemetrySource::new("test");
        mock.analyze("evil.example.com").await.unwrap();

        let history = mock.get_history().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].endpoint, MockEndpoint::Analyze);
        assert_eq!(history[0].target.as_deref(), Some("evil.example.com"));
    }

    #[test]
    fn test_sample_analysis_levels() {
        let result = sample_analysis("203.0.113.100");
        assert!(result.risk_score <= 100);
        let expected = match result.risk_score {
            80..=100 => Severity::Critical,
            60..=79 => Severity::High,
            40..=59 => Severity::Medium,
            _ => Severity::Low,
        };
        assert_eq!(result.threat_level, expected);
    }
}
