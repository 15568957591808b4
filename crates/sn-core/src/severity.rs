//! Severity levels and the presentation palette shared by every view.
//!
//! The feed, the threat map and the analysis report all map severities through
//! [`Severity::color`]; there is exactly one table.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Severity of a threat event, map point or analysis verdict.
///
/// Parsing is case-insensitive and total: anything that is not one of the four
/// named levels becomes [`Severity::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    /// Not a recognised level
    Unknown,
    /// Low severity
    Low,
    /// Medium severity
    Medium,
    /// High severity - requires attention
    High,
    /// Critical - immediate response required
    Critical,
}

impl Severity {
    /// The four named levels, most severe first.
    pub const NAMED: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    /// Parses a severity string, case-insensitively.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "critical" => Severity::Critical,
            "high" => Severity::High,
            "medium" => Severity::Medium,
            "low" => Severity::Low,
            _ => Severity::Unknown,
        }
    }

    /// Wire representation (lowercase).
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Unknown => "unknown",
        }
    }

    /// Presentation color for this severity.
    pub fn color(&self) -> SeverityColor {
        match self {
            Severity::Critical => SeverityColor::Red,
            Severity::High => SeverityColor::Orange,
            Severity::Medium => SeverityColor::Yellow,
            Severity::Low => SeverityColor::Blue,
            Severity::Unknown => SeverityColor::Gray,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "Critical"),
            Severity::High => write!(f, "High"),
            Severity::Medium => write!(f, "Medium"),
            Severity::Low => write!(f, "Low"),
            Severity::Unknown => write!(f, "Unknown"),
        }
    }
}

impl FromStr for Severity {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Severity::parse(s))
    }
}

impl From<String> for Severity {
    fn from(value: String) -> Self {
        Severity::parse(&value)
    }
}

impl From<Severity> for String {
    fn from(value: Severity) -> Self {
        value.as_str().to_string()
    }
}

/// Presentation color a view uses for a severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityColor {
    Red,
    Orange,
    Yellow,
    Blue,
    Gray,
}

impl SeverityColor {
    /// Color name.
    pub fn name(&self) -> &'static str {
        match self {
            SeverityColor::Red => "red",
            SeverityColor::Orange => "orange",
            SeverityColor::Yellow => "yellow",
            SeverityColor::Blue => "blue",
            SeverityColor::Gray => "gray",
        }
    }

    /// Hex code of the color.
    pub fn hex(&self) -> &'static str {
        match self {
            SeverityColor::Red => "#ef4444",
            SeverityColor::Orange => "#f97316",
            SeverityColor::Yellow => "#eab308",
            SeverityColor::Blue => "#3b82f6",
            SeverityColor::Gray => "#6b7280",
        }
    }
}

/// Maps a raw severity string straight to its color.
pub fn severity_color(severity: &str) -> SeverityColor {
    Severity::parse(severity).color()
}

/// Per-severity counts over a set of events or map points.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeverityBreakdown {
    counts: BTreeMap<Severity, usize>,
}

impl SeverityBreakdown {
    /// Counts the given severities.
    pub fn from_severities(severities: impl IntoIterator<Item = Severity>) -> Self {
        let mut counts = BTreeMap::new();
        for severity in severities {
            *counts.entry(severity).or_insert(0) += 1;
        }
        Self { counts }
    }

    /// Count for one severity (0 if absent).
    pub fn count(&self, severity: Severity) -> usize {
        self.counts.get(&severity).copied().unwrap_or(0)
    }

    /// Total number of counted items.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}
