//! Terminal rendering of dashboard state.
//!
//! Every severity is painted through [`paint_severity`], which maps the shared
//! palette onto terminal colors.

use colored::{Color, ColoredString, Colorize};
use serde::Serialize;
use sn_core::{
    geo, CellState, CellStatus, Connectivity, Dashboard, GeoSummary, Role, SessionLog, Severity,
    SeverityBreakdown, SeverityColor, StatsSnapshot, ThreatFeed, ThreatMap, TurnContent, View,
};

const RULE: &str = "─────────────────────────────────────────────────────────────";

/// Terminal color for a palette entry.
pub fn terminal_color(color: SeverityColor) -> Color {
    match color {
        SeverityColor::Red => Color::Red,
        SeverityColor::Orange => Color::TrueColor {
            r: 0xf9,
            g: 0x73,
            b: 0x16,
        },
        SeverityColor::Yellow => Color::Yellow,
        SeverityColor::Blue => Color::Blue,
        SeverityColor::Gray => Color::BrightBlack,
    }
}

/// Severity label in its palette color.
pub fn paint_severity(severity: Severity) -> ColoredString {
    severity
        .to_string()
        .to_uppercase()
        .color(terminal_color(severity.color()))
}

/// Status line for a cell that has no value to show, or a stale marker.
fn cell_notice<T>(state: &CellState<T>) -> Option<String> {
    match (state.status, &state.value, &state.error) {
        (CellStatus::Loading, _, _) => Some("Loading...".dimmed().to_string()),
        (CellStatus::Error, None, Some(error)) => {
            Some(format!("{} {}", "Unavailable:".red(), error))
        }
        (CellStatus::Error, Some(_), Some(error)) => {
            Some(format!("{} {}", "Stale, last refresh failed:".yellow(), error))
        }
        _ => None,
    }
}

/// Per-severity counts, most severe first, zero counts omitted.
pub fn render_breakdown(breakdown: &SeverityBreakdown) -> String {
    let parts: Vec<String> = Severity::NAMED
        .iter()
        .chain(std::iter::once(&Severity::Unknown))
        .filter(|severity| breakdown.count(**severity) > 0)
        .map(|severity| format!("{} {}", paint_severity(*severity), breakdown.count(*severity)))
        .collect();
    if parts.is_empty() {
        "none".dimmed().to_string()
    } else {
        parts.join("  ")
    }
}

pub fn render_header(connectivity: Connectivity, view: View) -> String {
    let status = match connectivity {
        Connectivity::Online => "● ONLINE".green().bold(),
        Connectivity::Offline => "● OFFLINE".red().bold(),
    };
    let tabs: Vec<String> = View::ALL
        .iter()
        .map(|v| {
            if *v == view {
                format!("[{}]", v).bold().to_string()
            } else {
                v.to_string().dimmed().to_string()
            }
        })
        .collect();
    format!(
        "{}  {}\n{}\n{}",
        "SentinelAI Threat Dashboard".bold(),
        status,
        tabs.join("  "),
        RULE
    )
}

pub fn render_stats(state: &CellState<StatsSnapshot>) -> String {
    let mut out = format!("{}\n", "Statistics".bold());
    if let Some(notice) = cell_notice(state) {
        out.push_str(&format!("  {}\n", notice));
    }
    if let Some(stats) = &state.value {
        out.push_str(&format!(
            "  Total Alerts: {}   Active Ransomware: {}   Blocked: {}\n",
            stats.total_alerts.to_string().bold(),
            stats.active_ransomware.to_string().red().bold(),
            stats.blocked_threats
        ));
        out.push_str(&format!(
            "  System Health: {}%   Monitored Endpoints: {}\n",
            stats.system_health, stats.monitored_endpoints
        ));
    }
    out
}

pub fn render_feed(state: &CellState<ThreatFeed>, limit: usize) -> String {
    let mut out = format!("{}\n", "Live Threat Feed".bold());
    if let Some(notice) = cell_notice(state) {
        out.push_str(&format!("  {}\n", notice));
    }
    if let Some(feed) = &state.value {
        if feed.threats.is_empty() {
            out.push_str("  No threats reported\n");
        }
        for event in feed.threats.iter().take(limit) {
            let time = event
                .occurred_at()
                .map(|t| t.format("%H:%M:%S").to_string())
                .unwrap_or_else(|| event.timestamp.clone());
            out.push_str(&format!(
                "  {} {:<9} {:<10} {:<16} {}\n",
                time.dimmed(),
                paint_severity(event.severity),
                event.threat_type,
                event.source,
                event.description
            ));
        }
        out.push_str(&format!(
            "  By severity: {}\n",
            render_breakdown(&feed.severity_breakdown())
        ));
        let distribution: Vec<String> = feed
            .type_distribution()
            .into_iter()
            .map(|(name, count)| format!("{} {}", name, count))
            .collect();
        if !distribution.is_empty() {
            out.push_str(&format!("  By type: {}\n", distribution.join(" | ")));
        }
    }
    out
}

/// ASCII world map of the given size with one marker per threat.
///
/// Markers are the severity initial; when points collide the more severe one
/// wins.
pub fn minimap(map: &ThreatMap, width: usize, height: usize) -> Vec<String> {
    let mut grid = vec![vec![('.', Severity::Unknown, false); width]; height];
    let viewport = geo::Viewport::new(width as f64, height as f64);
    for point in &map.threats {
        let (x, y) = geo::project(point.lat, point.lng, viewport);
        let col = (x.floor() as usize).min(width.saturating_sub(1));
        let row = (y.floor() as usize).min(height.saturating_sub(1));
        let cell = &mut grid[row][col];
        if !cell.2 || point.severity > cell.1 {
            let marker = match point.severity {
                Severity::Critical => 'C',
                Severity::High => 'H',
                Severity::Medium => 'M',
                Severity::Low => 'L',
                Severity::Unknown => '?',
            };
            *cell = (marker, point.severity, true);
        }
    }
    grid.into_iter()
        .map(|row| {
            row.into_iter()
                .map(|(marker, severity, occupied)| {
                    if occupied {
                        marker
                            .to_string()
                            .color(terminal_color(severity.color()))
                            .bold()
                            .to_string()
                    } else {
                        marker.to_string().dimmed().to_string()
                    }
                })
                .collect::<String>()
        })
        .collect()
}

pub fn render_map(state: &CellState<ThreatMap>) -> String {
    let mut out = format!("{}\n", "Global Threat Map".bold());
    if let Some(notice) = cell_notice(state) {
        out.push_str(&format!("  {}\n", notice));
    }
    if let Some(map) = &state.value {
        for line in minimap(map, 60, 15) {
            out.push_str(&format!("  {}\n", line));
        }
        let summary = GeoSummary::from_points(&map.threats);
        out.push_str(&format!(
            "  Active Threats: {}   Critical: {}   High: {}   Countries: {}\n",
            summary.active_threats,
            summary.critical.to_string().red(),
            summary.high.to_string().color(terminal_color(SeverityColor::Orange)),
            summary.countries
        ));
        out.push_str(&format!(
            "  By severity: {}\n",
            render_breakdown(&map.severity_breakdown())
        ));
        for point in map.threats.iter().take(5) {
            out.push_str(&format!(
                "  {} {} {} ({}) {}\n",
                paint_severity(point.severity),
                point.country,
                point.ip_address,
                point.threat_type,
                point.description.dimmed()
            ));
        }
    }
    out
}

pub fn render_session(log: &SessionLog, limit: usize) -> String {
    let mut out = format!("{}\n", "Co-Pilot".bold());
    let skip = log.turns.len().saturating_sub(limit);
    for turn in log.turns.iter().skip(skip) {
        match (&turn.role, &turn.content) {
            (Role::User, _) => {
                out.push_str(&format!("  {} {}\n", ">".cyan().bold(), turn.text()));
            }
            (Role::Assistant, TurnContent::Result(result)) => {
                out.push_str(&format!(
                    "  {} risk {}/100 {}\n",
                    result.target.bold(),
                    result.risk_score,
                    paint_severity(result.threat_level)
                ));
                for finding in &result.findings {
                    out.push_str(&format!("    - {}\n", finding));
                }
                for recommendation in &result.recommendations {
                    out.push_str(&format!("    → {}\n", recommendation.dimmed()));
                }
            }
            (Role::Assistant, TurnContent::Failure { message }) => {
                out.push_str(&format!("  {}\n", message.red()));
            }
            (Role::Assistant, _) => {
                out.push_str(&format!("  {}\n", turn.text().dimmed()));
            }
        }
    }
    if log.in_flight {
        out.push_str(&format!("  {}\n", "Analyzing...".yellow()));
    }
    out
}

/// Full-screen frame for the active view.
pub fn render_frame(dashboard: &Dashboard) -> String {
    let view = dashboard.view();
    let mut sections = vec![render_header(dashboard.connectivity(), view)];
    match view {
        View::Overview => {
            sections.push(render_stats(&dashboard.stats()));
            sections.push(render_feed(&dashboard.threat_feed(), 8));
            sections.push(render_session(&dashboard.session().snapshot(), 6));
        }
        View::LiveFeed => sections.push(render_feed(&dashboard.threat_feed(), 20)),
        View::ThreatMap => sections.push(render_map(&dashboard.threat_map())),
        View::Settings => sections.push(format!(
            "{}\n  Polling paused for data streams. Connectivity is still monitored.\n",
            "Settings".bold()
        )),
    }
    sections.push(
        "Type an IP or domain to analyze, :overview :feed :map :settings to switch, Ctrl+C to quit"
            .dimmed()
            .to_string(),
    );
    sections.join("\n")
}

/// Machine-readable snapshot of the dashboard.
#[derive(Debug, Serialize)]
pub struct DashboardFrame {
    pub view: View,
    pub connectivity: Connectivity,
    pub stats: CellSummary<StatsSnapshot>,
    pub threat_feed: CellSummary<ThreatFeed>,
    pub threat_map: CellSummary<ThreatMap>,
    pub session: SessionLog,
}

/// Serializable view of a state cell.
#[derive(Debug, Serialize)]
pub struct CellSummary<T> {
    pub status: CellStatus,
    pub value: Option<T>,
    pub error: Option<String>,
    pub last_updated: Option<String>,
}

impl<T> From<CellState<T>> for CellSummary<T> {
    fn from(state: CellState<T>) -> Self {
        Self {
            status: state.status,
            value: state.value,
            error: state.error.map(|e| e.to_string()),
            last_updated: state.last_updated.map(|t| t.to_rfc3339()),
        }
    }
}

impl DashboardFrame {
    pub fn capture(dashboard: &Dashboard) -> Self {
        Self {
            view: dashboard.view(),
            connectivity: dashboard.connectivity(),
            stats: dashboard.stats().into(),
            threat_feed: dashboard.threat_feed().into(),
            threat_map: dashboard.threat_map().into(),
            session: dashboard.session().snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sn_core::source::mock::{sample_feed, sample_map};
    use sn_core::{FetchError, GeoThreatPoint, StateCell};

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn test_palette_to_terminal() {
        assert_eq!(terminal_color(Severity::Critical.color()), Color::Red);
        assert_eq!(terminal_color(Severity::Unknown.color()), Color::BrightBlack);
    }

    #[test]
    fn test_minimap_places_corners() {
        plain();
        let point = |id: &str, lat: f64, lng: f64, severity: Severity| GeoThreatPoint {
            id: id.to_string(),
            lat,
            lng,
            country: "X".to_string(),
            severity,
            threat_type: "C2".to_string(),
            description: String::new(),
            ip_address: String::new(),
            timestamp: String::new(),
        };
        let map = ThreatMap {
            threats: vec![
                point("a", 90.0, -180.0, Severity::Critical),
                point("b", -90.0, 180.0, Severity::Low),
            ],
        };
        let lines = minimap(&map, 10, 4);
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with('C'));
        assert!(lines[3].ends_with('L'));
    }

    #[test]
    fn test_minimap_more_severe_wins() {
        plain();
        let mut map = sample_map();
        map.threats.truncate(1);
        let mut other = map.threats[0].clone();
        other.severity = Severity::Low;
        map.threats.insert(0, other);
        let rendered = minimap(&map, 60, 15).join("");
        assert!(rendered.contains('C'));
        assert!(!rendered.contains('L'));
    }

    #[test]
    fn test_stats_states() {
        plain();
        let cell = StateCell::<StatsSnapshot>::new();
        assert!(render_stats(&cell.snapshot()).contains("Loading..."));

        let state = CellState {
            status: CellStatus::Error,
            value: None,
            error: Some(FetchError::ServerError { status: 502 }),
            last_updated: None,
            last_attempt: None,
        };
        assert!(render_stats(&state).contains("Unavailable: Server error: HTTP 502"));
    }

    #[test]
    fn test_feed_rendering_marks_stale() {
        plain();
        let state = CellState {
            status: CellStatus::Error,
            value: Some(sample_feed()),
            error: Some(FetchError::NetworkUnavailable("timed out".into())),
            last_updated: None,
            last_attempt: None,
        };
        let text = render_feed(&state, 10);
        assert!(text.contains("Stale"));
        assert!(text.contains("CRITICAL"));
        assert!(text.contains("10:15:59"));
    }

    #[test]
    fn test_breakdown_lists_present_levels_in_order() {
        plain();
        let text = render_feed(
            &CellState {
                status: CellStatus::Ready,
                value: Some(sample_feed()),
                error: None,
                last_updated: None,
                last_attempt: None,
            },
            10,
        );
        assert!(text.contains("By severity: CRITICAL 1  HIGH 1  MEDIUM 1  LOW 1"));

        let breakdown =
            SeverityBreakdown::from_severities([Severity::Unknown, Severity::High, Severity::High]);
        assert_eq!(render_breakdown(&breakdown), "HIGH 2  UNKNOWN 1");
        assert_eq!(render_breakdown(&SeverityBreakdown::default()), "none");
    }

    #[test]
    fn test_map_shows_severity_tiles() {
        plain();
        let text = render_map(&CellState {
            status: CellStatus::Ready,
            value: Some(sample_map()),
            error: None,
            last_updated: None,
            last_attempt: None,
        });
        assert!(text.contains("Countries: 4"));
        assert!(text.contains("By severity: CRITICAL 1  HIGH 1  MEDIUM 1  LOW 1"));
    }

    #[test]
    fn test_cell_summary_serializes() {
        let state = CellState {
            status: CellStatus::Ready,
            value: Some(1u32),
            error: None,
            last_updated: None,
            last_attempt: None,
        };
        let json = serde_json::to_value(CellSummary::from(state)).unwrap();
        assert_eq!(json["status"], "ready");
        assert_eq!(json["value"], 1);
    }
}
