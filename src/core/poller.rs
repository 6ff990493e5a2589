use crate::config::{DashboardConfig, OverlapPolicy};
use crate::core::dashboard::update_counts;
use crate::core::{ConnectionState, CountDisplay, CountSource, FetchOutcome, Visibility};
use crate::utils::error::{DashboardError, Result};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollStats {
    pub attempts: u64,
    pub successes: u64,
    pub timeouts: u64,
    pub failures: u64,
    /// Ticks dropped because a fetch was still pending.
    pub skipped: u64,
    pub last_success: Option<DateTime<Utc>>,
}

struct PollContext<S, D> {
    source: S,
    display: D,
    dimmed: ConnectionState,
    stats: Mutex<PollStats>,
}

impl<S: CountSource, D: CountDisplay> PollContext<S, D> {
    fn record(&self, f: impl FnOnce(&mut PollStats)) {
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut stats);
    }

    async fn refresh(&self) -> FetchOutcome {
        self.record(|s| s.attempts += 1);
        let outcome = self.source.fetch_counts().await;

        match &outcome {
            FetchOutcome::Updated(snapshot) => {
                tracing::debug!("Data from backend: {:?}", snapshot);
                update_counts(&self.display, Some(snapshot));
                self.display.set_connection(ConnectionState::Connected);
                tracing::debug!(
                    "Updated display - IN: {:?}, OUT: {:?}, PRESENT: {:?}",
                    snapshot.count_in,
                    snapshot.count_out,
                    snapshot.present()
                );
                self.record(|s| {
                    s.successes += 1;
                    s.last_success = Some(Utc::now());
                });
            }
            FetchOutcome::TimedOut => {
                tracing::debug!("Backend request timed out");
                self.display.set_connection(self.dimmed);
                self.record(|s| s.timeouts += 1);
            }
            FetchOutcome::Failed(e) => {
                tracing::error!("Failed to fetch from backend: {}", e);
                self.display.set_connection(self.dimmed);
                self.record(|s| s.failures += 1);
            }
        }

        outcome
    }
}

struct PollerTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Periodically pulls a snapshot from `S` and renders it on `D`.
///
/// The poller owns its timer task: [`start`](Self::start) spawns it onto the
/// current tokio runtime and [`stop`](Self::stop) cancels it along with any
/// fetch still in flight. Dropping a running poller aborts the task.
pub struct DashboardPoller<S, D> {
    ctx: Arc<PollContext<S, D>>,
    interval: Duration,
    overlap: OverlapPolicy,
    task: Option<PollerTask>,
}

impl<S: CountSource, D: CountDisplay> DashboardPoller<S, D> {
    pub fn new(source: S, display: D, config: &DashboardConfig) -> Self {
        Self {
            ctx: Arc::new(PollContext {
                source,
                display,
                dimmed: ConnectionState::Disconnected {
                    opacity: config.dimmed_opacity,
                },
                stats: Mutex::new(PollStats::default()),
            }),
            interval: config.poll_interval(),
            overlap: config.overlap,
            task: None,
        }
    }

    pub fn source(&self) -> &S {
        &self.ctx.source
    }

    pub fn display(&self) -> &D {
        &self.ctx.display
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn stats(&self) -> PollStats {
        self.ctx
            .stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_running(&self) -> bool {
        self.task
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    /// Fetch once and render the result, outside the timer schedule.
    pub async fn refresh(&self) -> FetchOutcome {
        self.ctx.refresh().await
    }

    /// Wait for the display to become ready, fetch immediately, then keep
    /// fetching every interval. Each `Visible` event on `visibility`
    /// triggers an extra fetch.
    pub fn start(&mut self, visibility: Option<mpsc::Receiver<Visibility>>) -> Result<()> {
        if self.is_running() {
            return Err(DashboardError::AlreadyRunning);
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_loop(
            Arc::clone(&self.ctx),
            self.interval,
            self.overlap,
            shutdown_rx,
            visibility,
        ));

        self.task = Some(PollerTask { shutdown, handle });
        Ok(())
    }

    pub async fn stop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };

        let _ = task.shutdown.send(true);
        if let Err(e) = task.handle.await {
            if e.is_panic() {
                tracing::error!("Poller task panicked: {}", e);
            }
        }
        tracing::debug!("Poller stopped");
    }
}

impl<S, D> Drop for DashboardPoller<S, D> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.handle.abort();
        }
    }
}

async fn run_loop<S: CountSource, D: CountDisplay>(
    ctx: Arc<PollContext<S, D>>,
    period: Duration,
    overlap: OverlapPolicy,
    mut shutdown: watch::Receiver<bool>,
    mut visibility: Option<mpsc::Receiver<Visibility>>,
) {
    tokio::select! {
        ready = ctx.display.ready() => {
            if let Err(e) = ready {
                tracing::error!("Display never became ready: {}", e);
                return;
            }
        }
        _ = shutdown.changed() => return,
    }

    tracing::debug!("Polling every {:?} (overlap: {:?})", period, overlap);

    // The first tick completes immediately.
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut in_flight = JoinSet::new();

    loop {
        let mut visibility_closed = false;

        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => dispatch(&ctx, overlap, Trigger::Tick, &mut in_flight),
            change = next_visibility(&mut visibility) => match change {
                Some(Visibility::Visible) => {
                    tracing::debug!("Display visible again, refreshing");
                    dispatch(&ctx, overlap, Trigger::Visible, &mut in_flight);
                }
                Some(Visibility::Hidden) => {}
                None => visibility_closed = true,
            },
        }

        if visibility_closed {
            visibility = None;
        }
    }

    in_flight.shutdown().await;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Tick,
    /// Always fetches; only ticks are ever skipped.
    Visible,
}

fn dispatch<S: CountSource, D: CountDisplay>(
    ctx: &Arc<PollContext<S, D>>,
    overlap: OverlapPolicy,
    trigger: Trigger,
    in_flight: &mut JoinSet<()>,
) {
    reap(in_flight);

    if !in_flight.is_empty() {
        match (overlap, trigger) {
            (OverlapPolicy::Skip, Trigger::Tick) => {
                tracing::debug!("Previous fetch still pending, skipping tick");
                ctx.record(|s| s.skipped += 1);
                return;
            }
            (OverlapPolicy::Supersede, _) => {
                tracing::debug!("Aborting pending fetch");
                in_flight.abort_all();
            }
            (OverlapPolicy::Skip, Trigger::Visible) | (OverlapPolicy::Concurrent, _) => {}
        }
    }

    let ctx = Arc::clone(ctx);
    in_flight.spawn(async move {
        ctx.refresh().await;
    });
}

fn reap(in_flight: &mut JoinSet<()>) {
    while let Some(result) = in_flight.try_join_next() {
        if let Err(e) = result {
            if e.is_panic() {
                tracing::error!("Fetch task panicked: {}", e);
            }
        }
    }
}

async fn next_visibility(rx: &mut Option<mpsc::Receiver<Visibility>>) -> Option<Visibility> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
