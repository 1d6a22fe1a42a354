//! Services - refresh scheduling and dashboard state management
//!
//! This module contains the stateful parts of the pipeline:
//! - `scheduler` - Chained-timer refresh loop with cancellation
//! - `dashboard` - State machine, per-mount owner and render contract

pub mod dashboard;
pub mod scheduler;

// Re-export commonly used types
pub use dashboard::{CategorySelector, Dashboard, DashboardStateMachine, Transition};
pub use scheduler::{RefreshScheduler, SchedulerState, REFRESH_INTERVAL};
