//! Integration tests for the mounted dashboard lifecycle
//!
//! Timing tests run on a paused clock; the concurrency test runs on the
//! multi-thread runtime the binaries use.

use async_trait::async_trait;
use inflation_dashboard::domain::{ErrorKind, MetricsEnvelope, METRICS_CATEGORY};
use inflation_dashboard::infra::Metrics;
use inflation_dashboard::io::{FetchError, FetchResult, MetricsSource};
use inflation_dashboard::services::{Dashboard, RefreshScheduler, SchedulerState};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const INTERVAL: Duration = Duration::from_secs(10);

fn envelope(cpi: f64) -> MetricsEnvelope {
    MetricsEnvelope::from_value(json!({
        "status": "Success",
        "last_updated": "2024-06-01",
        "metrics": { "cpi": { "current_value": cpi, "units": "Index" } }
    }))
    .unwrap()
}

/// Replays scripted results, then keeps succeeding
struct ScriptedSource {
    script: Mutex<VecDeque<FetchResult>>,
    calls: AtomicUsize,
    delay: Duration,
}

impl ScriptedSource {
    fn new(script: Vec<FetchResult>, delay: Duration) -> Arc<Self> {
        Arc::new(Self { script: Mutex::new(script.into()), calls: AtomicUsize::new(0), delay })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricsSource for ScriptedSource {
    async fn fetch(&self) -> FetchResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.script.lock().pop_front().unwrap_or_else(|| Ok(envelope(3.0)))
    }
}

fn mount(source: Arc<ScriptedSource>) -> Dashboard {
    mount_with_interval(source, INTERVAL)
}

fn mount_with_interval(source: Arc<ScriptedSource>, interval: Duration) -> Dashboard {
    let metrics = Arc::new(Metrics::new());
    Dashboard::with_scheduler(source, metrics, RefreshScheduler::with_interval(interval))
}

fn cpi(state: &inflation_dashboard::domain::DashboardState) -> Option<f64> {
    state.categories.get(METRICS_CATEGORY).and_then(|m| m[0].current_value)
}

#[tokio::test(start_paused = true)]
async fn test_first_load_failure_then_recovery() {
    let source =
        ScriptedSource::new(vec![Err(FetchError::RateLimited), Ok(envelope(3.1))], Duration::ZERO);
    let mut dashboard = mount(source.clone());
    let mut rx = dashboard.subscribe();
    assert!(rx.borrow().loading);

    assert!(dashboard.start());

    rx.changed().await.unwrap();
    let failed = rx.borrow_and_update().clone();
    assert!(!failed.loading);
    assert!(failed.categories.is_empty());
    assert_eq!(failed.error, Some(ErrorKind::RateLimited));
    assert_eq!(
        failed.error_message(),
        Some("Too many requests. Data will refresh automatically shortly.")
    );

    rx.changed().await.unwrap();
    let recovered = rx.borrow_and_update().clone();
    assert_eq!(recovered.error, None);
    assert_eq!(recovered.selected_category.as_deref(), Some(METRICS_CATEGORY));
    assert_eq!(cpi(&recovered), Some(3.1));
    assert_eq!(recovered.data_as_of.as_deref(), Some("2024-06-01"));
    assert_eq!(source.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_failure_keeps_stale_data() {
    let source = ScriptedSource::new(
        vec![Ok(envelope(3.1)), Err(FetchError::Transport("HTTP 502".to_string()))],
        Duration::ZERO,
    );
    let mut dashboard = mount(source);
    let mut rx = dashboard.subscribe();
    dashboard.start();

    rx.changed().await.unwrap();
    let loaded = rx.borrow_and_update().clone();
    assert_eq!(cpi(&loaded), Some(3.1));

    rx.changed().await.unwrap();
    let stale = rx.borrow_and_update().clone();
    assert_eq!(stale.error, Some(ErrorKind::TransportError));
    assert_eq!(stale.error_message(), Some("Failed to fetch inflation data"));
    assert_eq!(stale.categories, loaded.categories);
    assert_eq!(stale.last_refreshed, loaded.last_refreshed);
    assert!(!stale.loading);
}

#[tokio::test(start_paused = true)]
async fn test_selection_during_fetch_is_kept() {
    let source = ScriptedSource::new(vec![], Duration::from_secs(2));
    let mut dashboard = mount(source);
    let mut rx = dashboard.subscribe();
    let selector = dashboard.category_selector();
    dashboard.start();

    tokio::time::sleep(Duration::from_secs(1)).await;
    selector.select("Housing Watch");
    let selected = rx.borrow_and_update().clone();
    assert!(selected.loading);
    assert_eq!(selected.selected_category.as_deref(), Some("Housing Watch"));

    rx.changed().await.unwrap();
    let loaded = rx.borrow_and_update().clone();
    assert!(!loaded.loading);
    assert!(loaded.categories.contains(METRICS_CATEGORY));
    assert_eq!(loaded.selected_category.as_deref(), Some("Housing Watch"));
    assert!(loaded.selected_metrics().is_empty());

    dashboard.select_category(METRICS_CATEGORY);
    assert_eq!(dashboard.snapshot().selected_metrics().len(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_start_twice_keeps_single_chain() {
    let source = ScriptedSource::new(vec![], Duration::ZERO);
    let mut dashboard = mount(source.clone());

    assert!(dashboard.start());
    assert!(!dashboard.start());

    tokio::time::sleep(INTERVAL * 2 + Duration::from_millis(1)).await;
    assert_eq!(source.calls(), 3);
    assert_eq!(dashboard.scheduler().cycles(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_unmount_stops_fetching() {
    let source = ScriptedSource::new(vec![], Duration::ZERO);
    let mut dashboard = mount(source.clone());
    let mut rx = dashboard.subscribe();
    dashboard.start();
    rx.changed().await.unwrap();

    dashboard.unmount();
    assert!(!dashboard.is_mounted());
    assert_eq!(dashboard.scheduler().state(), SchedulerState::Cancelled);

    tokio::time::sleep(INTERVAL * 5).await;
    assert_eq!(source.calls(), 1);
    assert!(!dashboard.start());

    // Idempotent
    dashboard.unmount();
}

#[tokio::test(start_paused = true)]
async fn test_unmount_during_fetch_publishes_nothing() {
    let source = ScriptedSource::new(vec![], Duration::from_secs(5));
    let mut dashboard = mount(source.clone());
    let rx = dashboard.subscribe();
    dashboard.start();

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(source.calls(), 1);
    dashboard.unmount();

    tokio::time::sleep(INTERVAL * 2).await;
    assert!(!rx.has_changed().unwrap_or(false));
    assert!(dashboard.snapshot().loading);
    assert_eq!(source.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_mounts_do_not_share_timers() {
    let first_source = ScriptedSource::new(vec![], Duration::ZERO);
    let second_source = ScriptedSource::new(vec![], Duration::ZERO);
    let mut first = mount(first_source.clone());
    let mut second = mount(second_source.clone());
    assert_ne!(first.mount_id(), second.mount_id());

    first.start();
    second.start();
    tokio::time::sleep(Duration::from_millis(1)).await;
    first.unmount();

    tokio::time::sleep(INTERVAL * 3).await;
    assert_eq!(first_source.calls(), 1);
    assert_eq!(second_source.calls(), 4);
    assert!(second.is_mounted());
    assert_eq!(second.scheduler().state(), SchedulerState::Scheduled);
}

#[tokio::test(start_paused = true)]
async fn test_drop_stops_fetching() {
    let source = ScriptedSource::new(vec![], Duration::ZERO);
    let mut dashboard = mount(source.clone());
    dashboard.start();
    tokio::time::sleep(Duration::from_millis(1)).await;

    drop(dashboard);
    tokio::time::sleep(INTERVAL * 3).await;
    assert_eq!(source.calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_published_snapshot_matches_state_under_concurrent_selection() {
    for _ in 0..20 {
        let source = ScriptedSource::new(vec![], Duration::ZERO);
        let mut dashboard = mount_with_interval(source, Duration::from_micros(50));
        let mut rx = dashboard.subscribe();
        let selector = dashboard.category_selector();
        dashboard.start();
        rx.changed().await.unwrap();

        tokio::task::spawn_blocking(move || {
            for i in 0..2000 {
                selector.select(if i % 2 == 0 { "Energy" } else { METRICS_CATEGORY });
                if i % 50 == 0 {
                    std::thread::sleep(Duration::from_micros(200));
                }
            }
        })
        .await
        .unwrap();

        dashboard.unmount();
        assert!(!dashboard.snapshot().loading);
        assert_eq!(*rx.borrow(), dashboard.snapshot());
    }
}
