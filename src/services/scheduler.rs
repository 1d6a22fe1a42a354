//! Refresh scheduler - fetch now, then again every interval until cancelled
//!
//! Cycles are chained: the next sleep starts only after the current fetch has
//! settled and its result has been handed to the sink. At most one fetch is
//! ever in flight, however slow the endpoint is.
//!
//! States cycle `Scheduled -> Fetching -> Scheduled -> ...`, with `Cancelled`
//! reachable from any of them. Activation skips the first wait: the initial
//! fetch runs at once, so `Idle` moves straight to `Fetching`.

use crate::io::{FetchResult, MetricsSource};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Production refresh interval (5 minutes)
pub const REFRESH_INTERVAL: Duration = Duration::from_millis(300_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Scheduled,
    Fetching,
    Cancelled,
}

/// State visible to the owner while the cycle task runs
struct Shared {
    state: Mutex<SchedulerState>,
    cycles: AtomicU64,
}

impl Shared {
    fn set(&self, next: SchedulerState) {
        let mut state = self.state.lock();
        // Cancelled is terminal
        if *state != SchedulerState::Cancelled {
            *state = next;
        }
    }
}

/// One scheduler per dashboard mount. Never shared between mounts.
pub struct RefreshScheduler {
    interval: Duration,
    started: bool,
    shutdown_tx: watch::Sender<bool>,
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl RefreshScheduler {
    pub fn new() -> Self {
        Self::with_interval(REFRESH_INTERVAL)
    }

    pub fn with_interval(interval: Duration) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            interval,
            started: false,
            shutdown_tx,
            shared: Arc::new(Shared {
                state: Mutex::new(SchedulerState::Idle),
                cycles: AtomicU64::new(0),
            }),
            handle: None,
        }
    }

    /// Start the cycle chain. Returns false (and does nothing) if this
    /// scheduler was already activated or has been cancelled.
    ///
    /// Must be called within a tokio runtime.
    pub fn activate<F>(&mut self, source: Arc<dyn MetricsSource>, sink: F) -> bool
    where
        F: FnMut(FetchResult) + Send + 'static,
    {
        if self.started {
            debug!("refresh_scheduler_already_active");
            return false;
        }
        if self.is_cancelled() {
            debug!("refresh_scheduler_activate_after_cancel");
            return false;
        }
        self.started = true;

        info!(interval_ms = %self.interval.as_millis(), "refresh_scheduler_started");

        let shutdown = self.shutdown_tx.subscribe();
        let shared = self.shared.clone();
        let interval = self.interval;
        self.handle = Some(tokio::spawn(run_cycles(source, sink, interval, shared, shutdown)));
        true
    }

    /// Stop scheduling. Idempotent. A fetch still in flight is abandoned.
    pub fn cancel(&mut self) {
        if self.is_cancelled() {
            return;
        }
        *self.shared.state.lock() = SchedulerState::Cancelled;
        self.shutdown_tx.send_replace(true);
        info!(cycles = %self.cycles(), "refresh_scheduler_cancelled");
    }

    pub fn state(&self) -> SchedulerState {
        *self.shared.state.lock()
    }

    pub fn is_active(&self) -> bool {
        self.started && !self.is_cancelled()
    }

    pub fn is_cancelled(&self) -> bool {
        self.state() == SchedulerState::Cancelled
    }

    /// Completed cycles (results handed to the sink)
    pub fn cycles(&self) -> u64 {
        self.shared.cycles.load(Ordering::Relaxed)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait for the cycle task to exit after `cancel()`
    pub async fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Default for RefreshScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn run_cycles<F>(
    source: Arc<dyn MetricsSource>,
    mut sink: F,
    interval: Duration,
    shared: Arc<Shared>,
    mut shutdown: watch::Receiver<bool>,
) where
    F: FnMut(FetchResult) + Send + 'static,
{
    loop {
        shared.set(SchedulerState::Fetching);

        let result = tokio::select! {
            result = source.fetch() => result,
            _ = cancelled(&mut shutdown) => {
                debug!("refresh_fetch_abandoned");
                break;
            }
        };

        sink(result);
        let cycle = shared.cycles.fetch_add(1, Ordering::Relaxed) + 1;
        shared.set(SchedulerState::Scheduled);
        debug!(cycle = %cycle, next_in_ms = %interval.as_millis(), "refresh_cycle_scheduled");

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = cancelled(&mut shutdown) => break,
        }
    }

    shared.set(SchedulerState::Cancelled);
    debug!("refresh_scheduler_stopped");
}

/// Resolves once the shutdown flag is set or the scheduler is gone
async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
