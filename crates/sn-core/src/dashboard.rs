//! View-facing composition of the pollers, the health monitor and the session.

use crate::health::{Connectivity, HealthMonitor};
use crate::poller::{PollStats, Poller, PollerConfig, StreamKind};
use crate::session::AnalysisSession;
use crate::source::TelemetrySource;
use crate::state_cell::CellState;
use crate::telemetry::{StatsSnapshot, ThreatFeed, ThreatMap};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

/// Polling schedule of every stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub health: PollerConfig,
    pub stats: PollerConfig,
    pub threat_feed: PollerConfig,
    pub threat_map: PollerConfig,
    /// Open the session log with the greeting notice.
    pub greeting: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        let poll_timeout = Duration::from_secs(4);
        Self {
            health: PollerConfig::new(Duration::from_secs(5), Duration::from_secs(3)),
            stats: PollerConfig::new(Duration::from_secs(10), poll_timeout),
            threat_feed: PollerConfig::new(Duration::from_secs(5), poll_timeout),
            threat_map: PollerConfig::new(Duration::from_secs(10), poll_timeout),
            greeting: true,
        }
    }
}

/// A navigable dashboard screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Overview,
    LiveFeed,
    ThreatMap,
    Settings,
}

impl View {
    pub const ALL: [View; 4] = [View::Overview, View::LiveFeed, View::ThreatMap, View::Settings];

    /// Data streams rendered by this view. Health is polled for every view.
    pub fn streams(&self) -> &'static [StreamKind] {
        match self {
            View::Overview => &[StreamKind::Stats, StreamKind::ThreatFeed],
            View::LiveFeed => &[StreamKind::ThreatFeed],
            View::ThreatMap => &[StreamKind::ThreatMap],
            View::Settings => &[],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            View::Overview => "overview",
            View::LiveFeed => "livefeed",
            View::ThreatMap => "threatmap",
            View::Settings => "settings",
        }
    }
}

impl std::fmt::Display for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "overview" => Ok(View::Overview),
            "livefeed" | "feed" => Ok(View::LiveFeed),
            "threatmap" | "map" => Ok(View::ThreatMap),
            "settings" => Ok(View::Settings),
            _ => Err(format!(
                "Unknown view: {}. Use overview, livefeed, threatmap or settings",
                s
            )),
        }
    }
}

struct NavState {
    view: View,
    mounted: bool,
}

/// The dashboard's synchronization core.
///
/// Owns one poller per stream, the health monitor and the analysis session.
/// Data pollers run only while mounted and only for the active view; the
/// session and every state cell live as long as the dashboard.
pub struct Dashboard {
    health: HealthMonitor,
    stats: Poller<StatsSnapshot>,
    threat_feed: Poller<ThreatFeed>,
    threat_map: Poller<ThreatMap>,
    session: AnalysisSession,
    nav: Mutex<NavState>,
}

impl Dashboard {
    /// Builds an unmounted dashboard on the overview.
    pub fn new(source: Arc<dyn TelemetrySource>, config: SyncConfig) -> Self {
        let session = if config.greeting {
            AnalysisSession::with_greeting(Arc::clone(&source))
        } else {
            AnalysisSession::new(Arc::clone(&source))
        };
        Self {
            health: HealthMonitor::new(Arc::clone(&source), config.health),
            stats: Poller::for_stats(Arc::clone(&source), config.stats),
            threat_feed: Poller::for_threat_feed(Arc::clone(&source), config.threat_feed),
            threat_map: Poller::for_threat_map(source, config.threat_map),
            session,
            nav: Mutex::new(NavState {
                view: View::default(),
                mounted: false,
            }),
        }
    }

    /// Starts the health monitor and the pollers of the active view.
    pub fn mount(&self) {
        let mut nav = self.lock_nav();
        nav.mounted = true;
        self.health.start();
        self.sync_pollers(&nav);
        info!(view = %nav.view, "Dashboard mounted");
    }

    /// Stops every poller. State cells and the session are kept.
    pub fn unmount(&self) {
        let mut nav = self.lock_nav();
        nav.mounted = false;
        self.health.stop();
        self.sync_pollers(&nav);
        info!("Dashboard unmounted");
    }

    /// Switches the active view, polling exactly the streams it renders.
    pub fn navigate(&self, view: View) {
        let mut nav = self.lock_nav();
        if nav.view == view {
            return;
        }
        info!(from = %nav.view, to = %view, "Navigating");
        nav.view = view;
        self.sync_pollers(&nav);
    }

    pub fn view(&self) -> View {
        self.lock_nav().view
    }

    pub fn is_mounted(&self) -> bool {
        self.lock_nav().mounted
    }

    /// Streams currently being polled, health included.
    pub fn active_streams(&self) -> Vec<StreamKind> {
        let mut active = Vec::new();
        if self.health.is_running() {
            active.push(StreamKind::Health);
        }
        if self.stats.is_running() {
            active.push(StreamKind::Stats);
        }
        if self.threat_feed.is_running() {
            active.push(StreamKind::ThreatFeed);
        }
        if self.threat_map.is_running() {
            active.push(StreamKind::ThreatMap);
        }
        active
    }

    pub fn connectivity(&self) -> Connectivity {
        self.health.connectivity()
    }

    pub fn subscribe_health(&self) -> watch::Receiver<CellState<()>> {
        self.health.subscribe()
    }

    pub fn subscribe_stats(&self) -> watch::Receiver<CellState<StatsSnapshot>> {
        self.stats.subscribe()
    }

    pub fn subscribe_threat_feed(&self) -> watch::Receiver<CellState<ThreatFeed>> {
        self.threat_feed.subscribe()
    }

    pub fn subscribe_threat_map(&self) -> watch::Receiver<CellState<ThreatMap>> {
        self.threat_map.subscribe()
    }

    pub fn stats(&self) -> CellState<StatsSnapshot> {
        self.stats.snapshot()
    }

    pub fn threat_feed(&self) -> CellState<ThreatFeed> {
        self.threat_feed.snapshot()
    }

    pub fn threat_map(&self) -> CellState<ThreatMap> {
        self.threat_map.snapshot()
    }

    /// The analysis session.
    pub fn session(&self) -> &AnalysisSession {
        &self.session
    }

    /// Activity counters of one stream.
    pub fn poll_stats(&self, stream: StreamKind) -> PollStats {
        match stream {
            StreamKind::Health => self.health.poll_stats(),
            StreamKind::Stats => self.stats.poll_stats(),
            StreamKind::ThreatFeed => self.threat_feed.poll_stats(),
            StreamKind::ThreatMap => self.threat_map.poll_stats(),
        }
    }

    fn sync_pollers(&self, nav: &NavState) {
        let wanted = |stream: StreamKind| nav.mounted && nav.view.streams().contains(&stream);
        toggle(&self.stats, wanted(StreamKind::Stats));
        toggle(&self.threat_feed, wanted(StreamKind::ThreatFeed));
        toggle(&self.threat_map, wanted(StreamKind::ThreatMap));
    }

    fn lock_nav(&self) -> MutexGuard<'_, NavState> {
        self.nav.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn toggle<T: Clone + Send + Sync + 'static>(poller: &Poller<T>, run: bool) {
    if run {
        poller.start();
    } else {
        poller.stop();
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::mock::MockTelemetrySource;

    #[test]
    fn test_view_streams() {
        assert_eq!(
            View::Overview.streams(),
            &[StreamKind::Stats, StreamKind::ThreatFeed]
        );
        assert_eq!(View::LiveFeed.streams(), &[StreamKind::ThreatFeed]);
        assert_eq!(View::ThreatMap.streams(), &[StreamKind::ThreatMap]);
        assert!(View::Settings.streams().is_empty());
    }

    #[test]
    fn test_view_from_str() {
        assert_eq!("overview".parse::<View>().unwrap(), View::Overview);
        assert_eq!("live-feed".parse::<View>().unwrap(), View::LiveFeed);
        assert_eq!("ThreatMap".parse::<View>().unwrap(), View::ThreatMap);
        assert!("reports".parse::<View>().is_err());
    }

    #[test]
    fn test_default_sync_config() {
        let config = SyncConfig::default();
        assert_eq!(config.health.interval, Duration::from_secs(5));
        assert_eq!(config.health.timeout, Duration::from_secs(3));
        assert_eq!(config.threat_feed.interval, Duration::from_secs(5));
        assert_eq!(config.stats.interval, Duration::from_secs(10));
        assert_eq!(config.threat_map.interval, Duration::from_secs(10));
        assert_eq!(config.stats.timeout, Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mount_starts_view_streams() {
        let mock = Arc::new(MockTelemetrySource::new("mock"));
        let dashboard = Dashboard::new(mock, SyncConfig::default());
        assert!(dashboard.active_streams().is_empty());

        dashboard.mount();
        assert_eq!(
            dashboard.active_streams(),
            vec![StreamKind::Health, StreamKind::Stats, StreamKind::ThreatFeed]
        );

        dashboard.unmount();
        assert!(dashboard.active_streams().is_empty());
        assert!(!dashboard.is_mounted());
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigate_while_unmounted_starts_nothing() {
        let mock = Arc::new(MockTelemetrySource::new("mock"));
        let dashboard = Dashboard::new(mock, SyncConfig::default());

        dashboard.navigate(View::ThreatMap);
        assert_eq!(dashboard.view(), View::ThreatMap);
        assert!(dashboard.active_streams().is_empty());
    }
}
