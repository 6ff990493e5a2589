use async_trait::async_trait;
use occupancy_dashboard::{
    ConnectionState, CountDisplay, CountSnapshot, CountSource, DashboardConfig, DashboardError,
    DashboardPoller, DisplayTarget, FetchOutcome, MemoryDisplay, OverlapPolicy, Visibility,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::time::sleep;

/// Answers call `n` (1-based) with `in = n, out = 0` after `latency`,
/// failing the first `fail_first` calls with HTTP 500.
struct ScriptedSource {
    calls: Arc<AtomicUsize>,
    latency: Duration,
    fail_first: usize,
}

impl ScriptedSource {
    fn new(latency: Duration) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = Self {
            calls: Arc::clone(&calls),
            latency,
            fail_first: 0,
        };
        (source, calls)
    }

    fn failing_first(mut self, n: usize) -> Self {
        self.fail_first = n;
        self
    }
}

#[async_trait]
impl CountSource for ScriptedSource {
    async fn fetch_counts(&self) -> FetchOutcome {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        sleep(self.latency).await;
        if call <= self.fail_first {
            return FetchOutcome::Failed(DashboardError::Http {
                status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            });
        }
        FetchOutcome::Updated(CountSnapshot::new(call as u64, 0))
    }
}

fn config(interval_ms: u64, overlap: OverlapPolicy) -> DashboardConfig {
    DashboardConfig {
        poll_interval_ms: interval_ms,
        overlap,
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_start_fetches_immediately() {
    let (source, calls) = ScriptedSource::new(Duration::ZERO);
    let mut poller = DashboardPoller::new(
        source,
        MemoryDisplay::new(),
        &config(300, OverlapPolicy::Skip),
    );

    poller.start(None).unwrap();
    sleep(Duration::from_millis(10)).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let state = poller.display().state();
    assert_eq!(state.count(DisplayTarget::InCount), Some(1));
    assert_eq!(state.connection, Some(ConnectionState::Connected));

    poller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_fetches_on_fixed_interval() {
    let (source, calls) = ScriptedSource::new(Duration::ZERO);
    let mut poller = DashboardPoller::new(
        source,
        MemoryDisplay::new(),
        &config(300, OverlapPolicy::Skip),
    );

    poller.start(None).unwrap();
    sleep(Duration::from_millis(1000)).await;
    poller.stop().await;

    // t = 0, 300, 600, 900
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(poller.stats().successes, 4);
    assert!(poller.stats().last_success.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_skip_policy_drops_ticks_while_fetch_pending() {
    let (source, calls) = ScriptedSource::new(Duration::from_millis(1000));
    let mut poller = DashboardPoller::new(
        source,
        MemoryDisplay::new(),
        &config(300, OverlapPolicy::Skip),
    );

    poller.start(None).unwrap();
    sleep(Duration::from_millis(2500)).await;
    poller.stop().await;

    // Fetches start at 0, 1200 and 2400; the six ticks in between are dropped.
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    let stats = poller.stats();
    assert_eq!(stats.skipped, 6);
    assert_eq!(stats.successes, 2);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_policy_overlaps_fetches() {
    let (source, calls) = ScriptedSource::new(Duration::from_millis(1000));
    let mut poller = DashboardPoller::new(
        source,
        MemoryDisplay::new(),
        &config(300, OverlapPolicy::Concurrent),
    );

    poller.start(None).unwrap();
    sleep(Duration::from_millis(2450)).await;
    poller.stop().await;

    // One fetch per tick from 0 to 2400.
    assert_eq!(calls.load(Ordering::SeqCst), 9);
    assert_eq!(poller.stats().skipped, 0);
    // Fetches started up to 1200 have resolved; the latest one wins.
    assert_eq!(
        poller.display().state().count(DisplayTarget::InCount),
        Some(5)
    );
}

#[tokio::test(start_paused = true)]
async fn test_supersede_policy_aborts_pending_fetch() {
    let (source, calls) = ScriptedSource::new(Duration::from_millis(1000));
    let mut poller = DashboardPoller::new(
        source,
        MemoryDisplay::new(),
        &config(300, OverlapPolicy::Supersede),
    );

    poller.start(None).unwrap();
    sleep(Duration::from_millis(2500)).await;
    poller.stop().await;

    assert_eq!(calls.load(Ordering::SeqCst), 9);
    let stats = poller.stats();
    assert_eq!(stats.attempts, 9);
    assert_eq!(stats.successes, 0);
    assert!(poller.display().writes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failures_dim_display_without_halting_polling() {
    let (source, calls) = ScriptedSource::new(Duration::ZERO);
    let source = source.failing_first(2);
    let mut poller = DashboardPoller::new(
        source,
        MemoryDisplay::new(),
        &config(300, OverlapPolicy::Skip),
    );

    poller.start(None).unwrap();
    sleep(Duration::from_millis(1000)).await;
    poller.stop().await;

    assert_eq!(calls.load(Ordering::SeqCst), 4);
    let history = poller.display().connection_history();
    assert_eq!(
        history,
        vec![
            ConnectionState::disconnected(),
            ConnectionState::disconnected(),
            ConnectionState::Connected,
            ConnectionState::Connected,
        ]
    );
    assert_eq!(poller.stats().failures, 2);
    assert_eq!(
        poller.display().state().count(DisplayTarget::InCount),
        Some(4)
    );
}

#[tokio::test(start_paused = true)]
async fn test_visible_event_triggers_extra_fetch() {
    let (source, calls) = ScriptedSource::new(Duration::ZERO);
    let mut poller = DashboardPoller::new(
        source,
        MemoryDisplay::new(),
        &config(10_000, OverlapPolicy::Skip),
    );
    let (tx, rx) = mpsc::channel(4);

    poller.start(Some(rx)).unwrap();
    sleep(Duration::from_millis(10)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    tx.send(Visibility::Visible).await.unwrap();
    sleep(Duration::from_millis(10)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    tx.send(Visibility::Hidden).await.unwrap();
    sleep(Duration::from_millis(10)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // A closed visibility channel leaves the timer running.
    drop(tx);
    sleep(Duration::from_millis(10)).await;
    assert!(poller.is_running());

    poller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_visible_event_fetches_while_tick_fetch_pending() {
    let (source, calls) = ScriptedSource::new(Duration::from_millis(1000));
    let mut poller = DashboardPoller::new(
        source,
        MemoryDisplay::new(),
        &config(10_000, OverlapPolicy::Skip),
    );
    let (tx, rx) = mpsc::channel(4);

    poller.start(Some(rx)).unwrap();
    sleep(Duration::from_millis(10)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    tx.send(Visibility::Visible).await.unwrap();
    sleep(Duration::from_millis(10)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(poller.stats().skipped, 0);

    sleep(Duration::from_millis(1100)).await;
    poller.stop().await;
    assert_eq!(poller.stats().successes, 2);
    assert_eq!(
        poller.display().state().count(DisplayTarget::InCount),
        Some(2)
    );
}

#[tokio::test(start_paused = true)]
async fn test_start_twice_fails_and_stop_halts_polling() {
    let (source, calls) = ScriptedSource::new(Duration::ZERO);
    let mut poller = DashboardPoller::new(
        source,
        MemoryDisplay::new(),
        &config(300, OverlapPolicy::Skip),
    );

    poller.start(None).unwrap();
    assert!(matches!(
        poller.start(None),
        Err(DashboardError::AlreadyRunning)
    ));

    sleep(Duration::from_millis(10)).await;
    poller.stop().await;
    assert!(!poller.is_running());

    let after_stop = calls.load(Ordering::SeqCst);
    sleep(Duration::from_millis(1000)).await;
    assert_eq!(calls.load(Ordering::SeqCst), after_stop);

    // Restart after stop.
    poller.start(None).unwrap();
    sleep(Duration::from_millis(10)).await;
    assert_eq!(calls.load(Ordering::SeqCst), after_stop + 1);
    poller.stop().await;
}

/// Display that is not ready until the gate is opened.
struct GatedDisplay {
    gate: Arc<Notify>,
    inner: MemoryDisplay,
}

impl CountDisplay for GatedDisplay {
    fn ready(&self) -> impl std::future::Future<Output = occupancy_dashboard::Result<()>> + Send {
        let gate = Arc::clone(&self.gate);
        async move {
            gate.notified().await;
            Ok(())
        }
    }

    fn write_count(&self, target: DisplayTarget, value: u64) {
        self.inner.write_count(target, value);
    }

    fn set_connection(&self, state: ConnectionState) {
        self.inner.set_connection(state);
    }
}

#[tokio::test(start_paused = true)]
async fn test_polling_waits_for_display_ready() {
    let (source, calls) = ScriptedSource::new(Duration::ZERO);
    let gate = Arc::new(Notify::new());
    let display = GatedDisplay {
        gate: Arc::clone(&gate),
        inner: MemoryDisplay::new(),
    };
    let mut poller = DashboardPoller::new(source, display, &config(300, OverlapPolicy::Skip));

    poller.start(None).unwrap();
    sleep(Duration::from_millis(1000)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    gate.notify_one();
    sleep(Duration::from_millis(10)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    poller.stop().await;
}

#[tokio::test]
async fn test_refresh_without_start() {
    let (source, _calls) = ScriptedSource::new(Duration::ZERO);
    let poller = DashboardPoller::new(source, MemoryDisplay::new(), &DashboardConfig::default());

    let outcome = poller.refresh().await;
    assert_eq!(outcome.snapshot(), Some(&CountSnapshot::new(1, 0)));
    assert!(!poller.is_running());
    assert_eq!(
        poller.display().state().count(DisplayTarget::PresentCount),
        Some(1)
    );
}
