//! Fixed-interval pollers that keep a [`StateCell`] in sync with the source.
//!
//! A poller fires immediately on [`Poller::start`] and then once per interval.
//! Every tick issues at most one fetch, bounded by the configured timeout; a
//! tick that fires while the previous fetch is still outstanding is skipped.
//!
//! Cancellation is deterministic. [`Poller::stop`] bumps a generation counter
//! under the same lock every cell write takes, and a fetch only writes if the
//! generation it started under is still current. `stop()` also aborts the
//! outstanding fetch, so a request that resolves after it returned is
//! discarded and a restarted poller fires at once.

use crate::source::{FetchError, FetchResult, TelemetrySource};
use crate::state_cell::{CellState, StateCell};
use crate::telemetry::{StatsSnapshot, ThreatFeed, ThreatMap};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use sn_observability::{poll_span, record_poll, record_skipped_tick};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn, Instrument};

/// The data streams the dashboard polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Health,
    Stats,
    ThreatFeed,
    ThreatMap,
}

impl StreamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Health => "health",
            StreamKind::Stats => "stats",
            StreamKind::ThreatFeed => "threat_feed",
            StreamKind::ThreatMap => "threat_map",
        }
    }
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shortest tick period; shorter configured intervals, zero included, are
/// raised to it.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Scheduling parameters of one poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Time between ticks.
    pub interval: Duration,
    /// Deadline of each fetch.
    pub timeout: Duration,
}

impl PollerConfig {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// Interval and timeout in whole seconds.
    pub fn from_secs(interval_secs: u64, timeout_secs: u64) -> Self {
        Self::new(
            Duration::from_secs(interval_secs),
            Duration::from_secs(timeout_secs),
        )
    }

    /// The period the poll loop actually ticks at.
    pub fn effective_interval(&self) -> Duration {
        self.interval.max(MIN_POLL_INTERVAL)
    }
}

/// Counters of a poller's activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PollStats {
    /// Ticks that issued a fetch.
    pub ticks: u64,
    /// Fetches applied as successes.
    pub successes: u64,
    /// Fetches applied as failures.
    pub failures: u64,
    /// Ticks skipped because a fetch was outstanding.
    pub skipped: u64,
}

#[derive(Debug, Default)]
struct PollCounters {
    ticks: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    skipped: AtomicU64,
}

/// Produces the fetch future of one tick.
pub type FetchFn<T> =
    Arc<dyn Fn(Arc<dyn TelemetrySource>) -> BoxFuture<'static, FetchResult<T>> + Send + Sync>;

struct Lifecycle {
    generation: u64,
    shutdown: Option<watch::Sender<bool>>,
    ticker: Option<JoinHandle<()>>,
    /// Outstanding fetch of the current generation.
    fetch: Option<JoinHandle<()>>,
}

impl Lifecycle {
    /// Invalidates the running generation and cancels its tasks.
    fn retire(&mut self) -> bool {
        self.generation += 1;
        self.shutdown.take();
        if let Some(fetch) = self.fetch.take() {
            fetch.abort();
        }
        match self.ticker.take() {
            Some(ticker) => {
                ticker.abort();
                true
            }
            None => false,
        }
    }
}

struct Shared<T> {
    stream: StreamKind,
    config: PollerConfig,
    source: Arc<dyn TelemetrySource>,
    fetch: FetchFn<T>,
    cell: Arc<StateCell<T>>,
    lifecycle: Mutex<Lifecycle>,
    counters: PollCounters,
}

/// Periodic fetcher for one stream.
pub struct Poller<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Poller<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a stopped poller with a fresh state cell.
    pub fn new(
        stream: StreamKind,
        source: Arc<dyn TelemetrySource>,
        config: PollerConfig,
        fetch: FetchFn<T>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                stream,
                config,
                source,
                fetch,
                cell: Arc::new(StateCell::new()),
                lifecycle: Mutex::new(Lifecycle {
                    generation: 0,
                    shutdown: None,
                    ticker: None,
                    fetch: None,
                }),
                counters: PollCounters::default(),
            }),
        }
    }

    /// Starts polling. No-op if already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        let mut lifecycle = self.shared.lock_lifecycle();
        if lifecycle.ticker.is_some() {
            return;
        }

        let generation = lifecycle.generation;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let shared = Arc::clone(&self.shared);
        let span = poll_span!(self.shared.stream, generation);
        lifecycle.shutdown = Some(shutdown_tx);
        lifecycle.ticker = Some(tokio::spawn(
            Shared::run(shared, generation, shutdown_rx).instrument(span),
        ));

        info!(
            stream = %self.shared.stream,
            interval_secs = self.shared.config.interval.as_secs_f64(),
            timeout_secs = self.shared.config.timeout.as_secs_f64(),
            "Poller started"
        );
    }

    /// Stops polling. Idempotent; the poller can be started again.
    ///
    /// An outstanding fetch is aborted, so the state cell is not written
    /// again until the next `start()` and that start fires immediately.
    pub fn stop(&self) {
        let mut lifecycle = self.shared.lock_lifecycle();
        if let Some(shutdown) = lifecycle.shutdown.as_ref() {
            let _ = shutdown.send(true);
        }
        if lifecycle.retire() {
            info!(stream = %self.shared.stream, "Poller stopped");
        }
    }

    /// Returns true while the poller is started.
    pub fn is_running(&self) -> bool {
        self.shared.lock_lifecycle().ticker.is_some()
    }

    /// Returns true while a fetch is outstanding.
    pub fn is_fetching(&self) -> bool {
        self.shared.lock_lifecycle().fetch.is_some()
    }

    pub fn stream(&self) -> StreamKind {
        self.shared.stream
    }

    pub fn config(&self) -> PollerConfig {
        self.shared.config
    }

    /// The state cell this poller writes.
    pub fn cell(&self) -> Arc<StateCell<T>> {
        Arc::clone(&self.shared.cell)
    }

    /// Current state of the cell.
    pub fn snapshot(&self) -> CellState<T> {
        self.shared.cell.snapshot()
    }

    /// Subscribes to cell changes.
    pub fn subscribe(&self) -> watch::Receiver<CellState<T>> {
        self.shared.cell.subscribe()
    }

    /// Activity counters.
    pub fn poll_stats(&self) -> PollStats {
        let counters = &self.shared.counters;
        PollStats {
            ticks: counters.ticks.load(Ordering::SeqCst),
            successes: counters.successes.load(Ordering::SeqCst),
            failures: counters.failures.load(Ordering::SeqCst),
            skipped: counters.skipped.load(Ordering::SeqCst),
        }
    }
}

impl Poller<StatsSnapshot> {
    /// Poller for the aggregate statistics.
    pub fn for_stats(source: Arc<dyn TelemetrySource>, config: PollerConfig) -> Self {
        Self::new(StreamKind::Stats, source, config, Arc::new(fetch_stats))
    }
}

impl Poller<ThreatFeed> {
    /// Poller for the threat feed.
    pub fn for_threat_feed(source: Arc<dyn TelemetrySource>, config: PollerConfig) -> Self {
        Self::new(StreamKind::ThreatFeed, source, config, Arc::new(fetch_feed))
    }
}

impl Poller<ThreatMap> {
    /// Poller for the geolocated threats.
    pub fn for_threat_map(source: Arc<dyn TelemetrySource>, config: PollerConfig) -> Self {
        Self::new(StreamKind::ThreatMap, source, config, Arc::new(fetch_map))
    }
}

impl Poller<()> {
    /// Poller for the liveness probe.
    pub fn for_health(source: Arc<dyn TelemetrySource>, config: PollerConfig) -> Self {
        Self::new(StreamKind::Health, source, config, Arc::new(probe_health))
    }
}

impl<T> Drop for Poller<T> {
    fn drop(&mut self) {
        self.shared.lock_lifecycle().retire();
    }
}

impl<T> Shared<T> {
    fn lock_lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Shared<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn run(self: Arc<Self>, generation: u64, mut shutdown_rx: watch::Receiver<bool>) {
        let period = self.config.effective_interval();
        if period != self.config.interval {
            warn!(
                stream = %self.stream,
                configured_ms = self.config.interval.as_millis() as u64,
                period_ms = period.as_millis() as u64,
                "Poll interval too short, using the minimum"
            );
        }
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick(generation);
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        debug!(stream = %self.stream, "Poll loop shutting down");
                        break;
                    }
                }
            }
        }
    }

    fn tick(self: &Arc<Self>, generation: u64) {
        // The handle is stored before `complete` can take the lock, so a fast
        // fetch cannot clear the slot ahead of its own registration.
        let mut lifecycle = self.lock_lifecycle();
        if lifecycle.generation != generation {
            return;
        }
        if lifecycle.fetch.is_some() {
            self.counters.skipped.fetch_add(1, Ordering::SeqCst);
            record_skipped_tick(self.stream.as_str());
            debug!(stream = %self.stream, skipped = true, "Previous fetch outstanding, skipping tick");
            return;
        }
        self.counters.ticks.fetch_add(1, Ordering::SeqCst);

        let shared = Arc::clone(self);
        let fetch = (self.fetch)(Arc::clone(&self.source));
        lifecycle.fetch = Some(tokio::spawn(
            async move {
                let started = Instant::now();
                let outcome = match tokio::time::timeout(shared.config.timeout, fetch).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(FetchError::timed_out(shared.config.timeout)),
                };
                shared.complete(generation, outcome, started.elapsed());
            }
            .in_current_span(),
        ));
    }

    fn complete(&self, generation: u64, outcome: FetchResult<T>, latency: Duration) {
        let mut lifecycle = self.lock_lifecycle();
        if lifecycle.generation != generation {
            debug!(
                stream = %self.stream,
                generation,
                "Discarding result of a stopped poller"
            );
            return;
        }
        lifecycle.fetch = None;
        match outcome {
            Ok(value) => {
                self.cell.apply_success(value);
                self.counters.successes.fetch_add(1, Ordering::SeqCst);
                record_poll(self.stream.as_str(), true, latency);
                debug!(
                    stream = %self.stream,
                    latency_ms = latency.as_millis() as u64,
                    "Poll succeeded"
                );
            }
            Err(e) => {
                self.counters.failures.fetch_add(1, Ordering::SeqCst);
                record_poll(self.stream.as_str(), false, latency);
                warn!(
                    stream = %self.stream,
                    error = %e,
                    kind = e.kind(),
                    "Poll failed"
                );
                self.cell.apply_failure(e);
            }
        }
    }
}

fn probe_health(source: Arc<dyn TelemetrySource>) -> BoxFuture<'static, FetchResult<()>> {
    async move { source.probe_health().await }.boxed()
}

fn fetch_stats(source: Arc<dyn TelemetrySource>) -> BoxFuture<'static, FetchResult<StatsSnapshot>> {
    async move {
        let stats = source.fetch_stats().await?;
        stats.validate()?;
        Ok(stats)
    }
    .boxed()
}

fn fetch_feed(source: Arc<dyn TelemetrySource>) -> BoxFuture<'static, FetchResult<ThreatFeed>> {
    async move { source.fetch_threat_feed().await }.boxed()
}

fn fetch_map(source: Arc<dyn TelemetrySource>) -> BoxFuture<'static, FetchResult<ThreatMap>> {
    async move {
        let map = source.fetch_threat_map().await?;
        map.validate()?;
        Ok(map)
    }
    .boxed()
}
