//! Telemetry payloads exchanged with the remote source.

use crate::severity::{Severity, SeverityBreakdown};
use crate::source::FetchError;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;

/// Aggregate counters shown on the overview tiles.
///
/// Replaced wholesale on every successful poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Total alerts raised.
    pub total_alerts: u64,
    /// Currently active high-severity (ransomware) incidents.
    pub active_ransomware: u64,
    /// Overall system health, in percent.
    pub system_health: u8,
    /// Threats blocked. Optional on the wire.
    #[serde(default)]
    pub blocked_threats: u64,
    /// Number of monitored endpoints.
    pub monitored_endpoints: u64,
}

impl StatsSnapshot {
    /// Checks value ranges the schema cannot express.
    pub fn validate(&self) -> Result<(), FetchError> {
        if self.system_health > 100 {
            return Err(FetchError::MalformedResponse(format!(
                "system_health {} is not a percentage",
                self.system_health
            )));
        }
        Ok(())
    }
}

/// One entry of the live threat feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatEvent {
    /// Source-assigned unique identifier.
    pub id: String,
    /// Intelligence source that reported the event.
    pub source: String,
    pub severity: Severity,
    /// Timestamp as sent by the source (ISO 8601).
    pub timestamp: String,
    pub threat_type: String,
    pub description: String,
}

impl ThreatEvent {
    /// Parsed timestamp, if the source sent a recognisable one.
    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }
}

/// The threat feed: most-recent-first, replaced as a whole on each poll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatFeed {
    pub threats: Vec<ThreatEvent>,
}

impl ThreatFeed {
    /// Per-severity counts of the feed.
    pub fn severity_breakdown(&self) -> SeverityBreakdown {
        SeverityBreakdown::from_severities(self.threats.iter().map(|t| t.severity))
    }

    /// Counts per threat type, for the distribution chart.
    pub fn type_distribution(&self) -> Vec<(String, usize)> {
        type_distribution(self.threats.iter().map(|t| t.threat_type.as_str()))
    }
}

/// A geolocated threat shown on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoThreatPoint {
    pub id: String,
    /// Latitude in degrees, [-90, 90].
    pub lat: f64,
    /// Longitude in degrees, [-180, 180].
    pub lng: f64,
    pub country: String,
    pub severity: Severity,
    pub threat_type: String,
    pub description: String,
    pub ip_address: String,
    pub timestamp: String,
}

impl GeoThreatPoint {
    /// Rejects coordinates outside the valid lat/lng ranges.
    pub fn validate(&self) -> Result<(), FetchError> {
        if !(-90.0..=90.0).contains(&self.lat) || !(-180.0..=180.0).contains(&self.lng) {
            return Err(FetchError::MalformedResponse(format!(
                "threat {} has out-of-range coordinates ({}, {})",
                self.id, self.lat, self.lng
            )));
        }
        Ok(())
    }

    /// Parsed timestamp, if the source sent a recognisable one.
    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }
}

/// The geolocated threat set, replaced as a whole on each poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreatMap {
    pub threats: Vec<GeoThreatPoint>,
}

impl ThreatMap {
    /// Validates every point of the payload.
    pub fn validate(&self) -> Result<(), FetchError> {
        self.threats.iter().try_for_each(GeoThreatPoint::validate)
    }

    /// Per-severity counts of the map.
    pub fn severity_breakdown(&self) -> SeverityBreakdown {
        SeverityBreakdown::from_severities(self.threats.iter().map(|t| t.severity))
    }
}

/// Request body for an analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub target: String,
}

/// Risk analysis of one submitted indicator. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// The analysed indicator. The remote side may omit the echo.
    #[serde(default)]
    pub target: String,
    /// Risk score, 0..=100.
    pub risk_score: u8,
    pub threat_level: Severity,
    pub findings: Vec<String>,
    pub recommendations: Vec<String>,
}

impl AnalysisResult {
    /// Checks value ranges the schema cannot express.
    pub fn validate(&self) -> Result<(), FetchError> {
        if self.risk_score > 100 {
            return Err(FetchError::MalformedResponse(format!(
                "risk_score {} exceeds 100",
                self.risk_score
            )));
        }
        Ok(())
    }

    /// Plain-text report with numbered findings and recommendations.
    pub fn report(&self) -> String {
        let mut out = format!(
            "Target Analysis: {}\n\nRisk Score: {}/100\nThreat Level: {}\n\nFindings:\n",
            self.target, self.risk_score, self.threat_level
        );
        for (i, finding) in self.findings.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, finding));
        }
        out.push_str("\nRecommendations:\n");
        for (i, recommendation) in self.recommendations.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, recommendation));
        }
        out.trim_end().to_string()
    }
}

/// What kind of indicator an operator submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    /// IPv4 or IPv6 address.
    Ip,
    /// Domain name or URL.
    Domain,
}

impl IndicatorKind {
    /// Classifies a (trimmed) target string.
    pub fn classify(target: &str) -> Self {
        if target.trim().parse::<IpAddr>().is_ok() {
            IndicatorKind::Ip
        } else {
            IndicatorKind::Domain
        }
    }
}

impl std::fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndicatorKind::Ip => write!(f, "ip"),
            IndicatorKind::Domain => write!(f, "domain"),
        }
    }
}

/// Counts occurrences per threat type, most frequent first, ties by name.
pub fn type_distribution<'a>(types: impl IntoIterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for threat_type in types {
        *counts.entry(threat_type).or_insert(0) += 1;
    }
    let mut distribution: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(name, count)| (name.to_string(), count))
        .collect();
    distribution.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    distribution
}

/// Parses RFC 3339, or a naive ISO 8601 timestamp taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_stats_blocked_threats_optional() {
        let json = r#"{"total_alerts":1300,"active_ransomware":20,"system_health":97,"monitored_endpoints":900}"#;
        let stats: StatsSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(stats.total_alerts, 1300);
        assert_eq!(stats.blocked_threats, 0);
        assert!(stats.validate().is_ok());
    }

    #[test]
    fn test_stats_health_over_100_is_malformed() {
        let stats = StatsSnapshot {
            total_alerts: 1,
            active_ransomware: 0,
            system_health: 140,
            blocked_threats: 0,
            monitored_endpoints: 1,
        };
        assert!(matches!(
            stats.validate(),
            Err(FetchError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_feed_parses_backend_payload() {
        let json = r#"{"threats":[
            {"id":"THR-10001","source":"URLhaus","severity":"critical","timestamp":"2024-05-01T10:15:30.123456","threat_type":"Ransomware","description":"File encryption activity detected"},
            {"id":"THR-10002","source":"Shodan","severity":"low","timestamp":"2024-05-01T10:15:29","threat_type":"DDoS","description":"Botnet activity detected"}
        ]}"#;
        let feed: ThreatFeed = serde_json::from_str(json).unwrap();
        assert_eq!(feed.threats.len(), 2);
        assert_eq!(feed.threats[0].severity, Severity::Critical);
        let at = feed.threats[0].occurred_at().unwrap();
        assert_eq!(at.hour(), 10);
        assert_eq!(at.minute(), 15);
    }

    #[test]
    fn test_feed_breakdown_and_distribution() {
        let event = |id: &str, severity: Severity, threat_type: &str| ThreatEvent {
            id: id.to_string(),
            source: "AbuseIPDB".to_string(),
            severity,
            timestamp: "2024-05-01T10:00:00Z".to_string(),
            threat_type: threat_type.to_string(),
            description: String::new(),
        };
        let feed = ThreatFeed {
            threats: vec![
                event("a", Severity::High, "Phishing"),
                event("b", Severity::High, "C2"),
                event("c", Severity::Low, "Phishing"),
            ],
        };
        assert_eq!(feed.severity_breakdown().count(Severity::High), 2);
        assert_eq!(
            feed.type_distribution(),
            vec![("Phishing".to_string(), 2), ("C2".to_string(), 1)]
        );
    }

    #[test]
    fn test_map_rejects_out_of_range_point() {
        let point = GeoThreatPoint {
            id: "GEO-1".to_string(),
            lat: 91.0,
            lng: 0.0,
            country: "Nowhere".to_string(),
            severity: Severity::High,
            threat_type: "C2".to_string(),
            description: String::new(),
            ip_address: "198.51.100.7".to_string(),
            timestamp: String::new(),
        };
        let map = ThreatMap {
            threats: vec![point],
        };
        assert!(matches!(map.validate(), Err(FetchError::MalformedResponse(_))));
    }

    #[test]
    fn test_analysis_without_target_echo() {
        let json = r#"{"risk_score":72,"threat_level":"High","findings":["a"],"recommendations":["b"]}"#;
        let result: AnalysisResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.target, "");
        assert_eq!(result.threat_level, Severity::High);
        assert!(result.validate().is_ok());
    }

    #[test]
    fn test_analysis_score_over_100_is_malformed() {
        let json = r#"{"target":"x","risk_score":180,"threat_level":"Critical","findings":[],"recommendations":[]}"#;
        let result: AnalysisResult = serde_json::from_str(json).unwrap();
        assert!(result.validate().is_err());
    }

    #[test]
    fn test_analysis_report_numbers_items() {
        let result = AnalysisResult {
            target: "8.8.8.8".to_string(),
            risk_score: 85,
            threat_level: Severity::Critical,
            findings: vec![
                "IP 8.8.8.8 appears in 4 threat intelligence feeds".to_string(),
                "Associated with 2 malware families".to_string(),
            ],
            recommendations: vec!["Block IP at network perimeter".to_string()],
        };
        let report = result.report();
        assert!(report.starts_with("Target Analysis: 8.8.8.8"));
        assert!(report.contains("Risk Score: 85/100"));
        assert!(report.contains("Threat Level: Critical"));
        assert!(report.contains("2. Associated with 2 malware families"));
        assert!(report.ends_with("1. Block IP at network perimeter"));
    }

    #[test]
    fn test_indicator_classification() {
        assert_eq!(IndicatorKind::classify("8.8.8.8"), IndicatorKind::Ip);
        assert_eq!(IndicatorKind::classify("2001:db8::1"), IndicatorKind::Ip);
        assert_eq!(IndicatorKind::classify("evil.example.com"), IndicatorKind::Domain);
        assert_eq!(IndicatorKind::classify("999.1.1.1"), IndicatorKind::Domain);
    }

    #[test]
    fn test_parse_timestamp_variants() {
        assert!(parse_timestamp("2024-05-01T10:00:00Z").is_some());
        assert!(parse_timestamp("2024-05-01T10:00:00+02:00").is_some());
        assert!(parse_timestamp("2024-05-01T10:00:00").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
