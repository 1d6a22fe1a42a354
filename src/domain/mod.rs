//! Domain models - metric identities, envelope validation, normalization
//!
//! This module contains the pure data types and transforms:
//! - `metric` - `MetricKind` and the display-ready `DisplayMetric`
//! - `envelope` - validation of the endpoint's response envelope
//! - `normalize` - validated metrics object to the fixed five-metric list
//! - `state` - `DashboardState`, `CategoryMap`, `ErrorKind`

pub mod envelope;
pub mod metric;
pub mod normalize;
pub mod state;

// Re-export commonly used types at module level
pub use envelope::{EnvelopeError, MetricsEnvelope};
pub use metric::{DisplayMetric, HistoricalPoint, MetricKind, Trend};
pub use normalize::normalize;
pub use state::{CategoryMap, DashboardState, ErrorKind, METRICS_CATEGORY};
