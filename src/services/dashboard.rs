//! Dashboard state machine and per-mount lifecycle
//!
//! `DashboardStateMachine` holds the pure transitions:
//! - first result: `loading` clears; success fills categories, failure leaves
//!   them empty with an error
//! - later success: categories replaced wholesale, error cleared
//! - later failure: error set, last good categories kept
//! - selection: only `selected_category` changes, accepted in any state
//!
//! `Dashboard` owns one state machine and one `RefreshScheduler` per mount and
//! publishes snapshots to renderers through a watch channel.

use crate::domain::{normalize, CategoryMap, DashboardState, ErrorKind, METRICS_CATEGORY};
use crate::infra::Metrics;
use crate::io::{FetchResult, MetricsSource};
use crate::services::scheduler::RefreshScheduler;
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What a refresh result did to the state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// First result was a success
    Loaded,
    /// First result was a failure; nothing to show
    LoadFailed(ErrorKind),
    /// Later success replaced the data
    Refreshed,
    /// Later failure; stale data kept
    RefreshFailed(ErrorKind),
}

#[derive(Debug, Default)]
pub struct DashboardStateMachine {
    state: DashboardState,
}

impl DashboardStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn is_initializing(&self) -> bool {
        self.state.loading
    }

    /// Apply one refresh result
    pub fn apply(&mut self, result: FetchResult) -> Transition {
        let first = self.state.loading;
        self.state.loading = false;

        match result {
            Ok(envelope) => {
                let metrics = normalize(&envelope.metrics, envelope.analysis.as_deref());
                self.state.categories = CategoryMap::from_metrics(metrics);
                self.state.error = None;
                self.state.last_refreshed = Some(Utc::now());
                self.state.data_as_of = envelope.last_updated;

                if self.state.selected_category.is_none()
                    && self.state.categories.contains(METRICS_CATEGORY)
                {
                    self.state.selected_category = Some(METRICS_CATEGORY.to_string());
                }

                if first {
                    Transition::Loaded
                } else {
                    Transition::Refreshed
                }
            }
            Err(e) => {
                let kind = e.kind();
                self.state.error = Some(kind);
                if first {
                    Transition::LoadFailed(kind)
                } else {
                    Transition::RefreshFailed(kind)
                }
            }
        }
    }

    pub fn select_category(&mut self, label: &str) {
        self.state.selected_category = Some(label.to_string());
    }
}

struct MountShared {
    machine: Mutex<DashboardStateMachine>,
    /// Checked under the `machine` lock before applying a result
    mounted: AtomicBool,
    snapshot_tx: watch::Sender<DashboardState>,
}

impl MountShared {
    fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }

    /// Publish under the `machine` guard so snapshots go out in apply order
    fn publish(&self, machine: &DashboardStateMachine) {
        self.snapshot_tx.send_replace(machine.state().clone());
    }
}

/// Handle the presentation layer calls on user interaction
#[derive(Clone)]
pub struct CategorySelector {
    mount_id: Uuid,
    shared: Arc<MountShared>,
}

impl CategorySelector {
    /// Ignored once the dashboard is unmounted
    pub fn select(&self, label: &str) {
        let mut machine = self.shared.machine.lock();
        if !self.shared.is_mounted() {
            debug!(mount_id = %self.mount_id, category = %label, "category_select_after_unmount");
            return;
        }
        machine.select_category(label);
        self.shared.publish(&machine);
        info!(mount_id = %self.mount_id, category = %label, "category_selected");
    }
}

/// One mounted dashboard
pub struct Dashboard {
    mount_id: Uuid,
    shared: Arc<MountShared>,
    scheduler: RefreshScheduler,
    source: Arc<dyn MetricsSource>,
    metrics: Arc<Metrics>,
}

impl Dashboard {
    /// Mount a dashboard with the production refresh interval
    pub fn mount(source: Arc<dyn MetricsSource>, metrics: Arc<Metrics>) -> Self {
        Self::with_scheduler(source, metrics, RefreshScheduler::new())
    }

    pub fn with_scheduler(
        source: Arc<dyn MetricsSource>,
        metrics: Arc<Metrics>,
        scheduler: RefreshScheduler,
    ) -> Self {
        let machine = DashboardStateMachine::new();
        let (snapshot_tx, _) = watch::channel(machine.state().clone());
        let mount_id = Uuid::now_v7();
        info!(
            mount_id = %mount_id,
            interval_ms = %scheduler.interval().as_millis(),
            "dashboard_mounted"
        );

        Self {
            mount_id,
            shared: Arc::new(MountShared {
                machine: Mutex::new(machine),
                mounted: AtomicBool::new(true),
                snapshot_tx,
            }),
            scheduler,
            source,
            metrics,
        }
    }

    pub fn mount_id(&self) -> Uuid {
        self.mount_id
    }

    /// Kick off the refresh chain. Safe to call more than once.
    ///
    /// Must be called within a tokio runtime.
    pub fn start(&mut self) -> bool {
        if !self.shared.is_mounted() {
            warn!(mount_id = %self.mount_id, "dashboard_start_after_unmount");
            return false;
        }

        let shared = self.shared.clone();
        let metrics = self.metrics.clone();
        let mount_id = self.mount_id;
        self.scheduler.activate(self.source.clone(), move |result| {
            apply_refresh(&shared, &metrics, mount_id, result);
        })
    }

    pub fn snapshot(&self) -> DashboardState {
        self.shared.machine.lock().state().clone()
    }

    /// Receiver that sees every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.shared.snapshot_tx.subscribe()
    }

    pub fn category_selector(&self) -> CategorySelector {
        CategorySelector { mount_id: self.mount_id, shared: self.shared.clone() }
    }

    pub fn select_category(&self, label: &str) {
        self.category_selector().select(label);
    }

    pub fn is_mounted(&self) -> bool {
        self.shared.is_mounted()
    }

    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    /// Tear down: stop refreshing and ignore any result still on its way
    pub fn unmount(&mut self) {
        {
            let _machine = self.shared.machine.lock();
            if !self.shared.is_mounted() {
                return;
            }
            self.shared.mounted.store(false, Ordering::Release);
        }
        self.scheduler.cancel();
        info!(mount_id = %self.mount_id, cycles = %self.scheduler.cycles(), "dashboard_unmounted");
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn apply_refresh(shared: &MountShared, metrics: &Metrics, mount_id: Uuid, result: FetchResult) {
    let mut machine = shared.machine.lock();
    if !shared.is_mounted() {
        metrics.record_result_discarded();
        debug!(mount_id = %mount_id, ok = %result.is_ok(), "refresh_result_discarded");
        return;
    }

    let transition = machine.apply(result);
    shared.publish(&machine);

    let state = machine.state();
    match transition {
        Transition::Loaded | Transition::Refreshed => info!(
            mount_id = %mount_id,
            transition = ?transition,
            categories = %state.categories.len(),
            selected = ?state.selected_category,
            data_as_of = ?state.data_as_of,
            "refresh_cycle_applied"
        ),
        Transition::LoadFailed(kind) | Transition::RefreshFailed(kind) => warn!(
            mount_id = %mount_id,
            transition = ?transition,
            kind = %kind,
            message = %kind.user_message(),
            stale_categories = %state.categories.len(),
            "refresh_cycle_failed"
        ),
    }
}
