//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `fetch` - HTTP client for the metrics endpoint and the `MetricsSource` seam

pub mod fetch;

// Re-export commonly used types
pub use fetch::{FetchClient, FetchError, FetchResult, MetricsSource};
