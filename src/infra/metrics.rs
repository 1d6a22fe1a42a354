//! Lock-free fetch metrics and periodic reporting
//!
//! Uses atomics so the fetch path never contends with the reporter.
//!
//! All atomics use Relaxed ordering: statistical counters only, never read
//! for coordination.

use crate::domain::ErrorKind;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Fetch latency bucket boundaries (milliseconds)
/// Buckets: ≤50, ≤100, ≤200, ≤400, ≤800, ≤1600, ≤3200, ≤6400, ≤12800, ≤25600,
/// >25600
const BUCKET_BOUNDS: [u64; 10] = [50, 100, 200, 400, 800, 1600, 3200, 6400, 12800, 25600];
const NUM_BUCKETS: usize = 11;

/// Compute bucket index for a latency value using binary search
#[inline]
fn bucket_index(latency_ms: u64) -> usize {
    BUCKET_BOUNDS.partition_point(|&bound| bound < latency_ms)
}

/// Update an atomic max value using compare-and-swap loop
#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

/// Swap all buckets to zero and return their values
#[inline]
fn swap_buckets(buckets: &[AtomicU64; NUM_BUCKETS]) -> [u64; NUM_BUCKETS] {
    let mut result = [0u64; NUM_BUCKETS];
    for (i, bucket) in buckets.iter().enumerate() {
        result[i] = bucket.swap(0, Ordering::Relaxed);
    }
    result
}

/// Compute percentile from histogram buckets
/// Returns the upper bound of the bucket containing the percentile
fn percentile_from_buckets(buckets: &[u64; NUM_BUCKETS], percentile: f64) -> u64 {
    let total: u64 = buckets.iter().sum();
    if total == 0 {
        return 0;
    }

    let target = ((total as f64 * percentile).ceil() as u64).max(1);
    let mut cumulative = 0u64;

    // Upper bounds for each bucket (last bucket uses 2x the previous bound)
    const BUCKET_UPPER_BOUNDS: [u64; NUM_BUCKETS] =
        [50, 100, 200, 400, 800, 1600, 3200, 6400, 12800, 25600, 51200];

    for (i, &count) in buckets.iter().enumerate() {
        cumulative += count;
        if cumulative >= target {
            return BUCKET_UPPER_BOUNDS[i];
        }
    }
    BUCKET_UPPER_BOUNDS[NUM_BUCKETS - 1]
}

/// Lock-free fetch metrics collector
///
/// Totals are monotonic; latency fields reset on `report()`.
pub struct Metrics {
    fetch_attempts: AtomicU64,
    fetch_success: AtomicU64,
    fetch_transport_errors: AtomicU64,
    fetch_rate_limited: AtomicU64,
    fetch_protocol_errors: AtomicU64,
    /// Results dropped because the dashboard was already unmounted
    results_discarded: AtomicU64,
    latency_sum_ms: AtomicU64,
    latency_max_ms: AtomicU64,
    latency_count: AtomicU64,
    latency_buckets: [AtomicU64; NUM_BUCKETS],
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            fetch_attempts: AtomicU64::new(0),
            fetch_success: AtomicU64::new(0),
            fetch_transport_errors: AtomicU64::new(0),
            fetch_rate_limited: AtomicU64::new(0),
            fetch_protocol_errors: AtomicU64::new(0),
            results_discarded: AtomicU64::new(0),
            latency_sum_ms: AtomicU64::new(0),
            latency_max_ms: AtomicU64::new(0),
            latency_count: AtomicU64::new(0),
            latency_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }

    #[inline]
    pub fn record_fetch_attempt(&self) {
        self.fetch_attempts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_fetch_success(&self, latency_ms: u64) {
        self.fetch_success.fetch_add(1, Ordering::Relaxed);
        self.record_latency(latency_ms);
    }

    #[inline]
    pub fn record_fetch_failure(&self, kind: ErrorKind, latency_ms: u64) {
        let counter = match kind {
            ErrorKind::TransportError => &self.fetch_transport_errors,
            ErrorKind::RateLimited => &self.fetch_rate_limited,
            ErrorKind::ProtocolError => &self.fetch_protocol_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.record_latency(latency_ms);
    }

    #[inline]
    pub fn record_result_discarded(&self) {
        self.results_discarded.fetch_add(1, Ordering::Relaxed);
    }

    fn record_latency(&self, latency_ms: u64) {
        self.latency_sum_ms.fetch_add(latency_ms, Ordering::Relaxed);
        self.latency_count.fetch_add(1, Ordering::Relaxed);
        self.latency_buckets[bucket_index(latency_ms)].fetch_add(1, Ordering::Relaxed);
        update_atomic_max(&self.latency_max_ms, latency_ms);
    }

    pub fn fetch_attempts(&self) -> u64 {
        self.fetch_attempts.load(Ordering::Relaxed)
    }

    pub fn fetch_success(&self) -> u64 {
        self.fetch_success.load(Ordering::Relaxed)
    }

    pub fn fetch_failures(&self, kind: ErrorKind) -> u64 {
        match kind {
            ErrorKind::TransportError => self.fetch_transport_errors.load(Ordering::Relaxed),
            ErrorKind::RateLimited => self.fetch_rate_limited.load(Ordering::Relaxed),
            ErrorKind::ProtocolError => self.fetch_protocol_errors.load(Ordering::Relaxed),
        }
    }

    pub fn results_discarded(&self) -> u64 {
        self.results_discarded.load(Ordering::Relaxed)
    }

    /// Snapshot totals and drain the latency window
    pub fn report(&self) -> MetricsSummary {
        let buckets = swap_buckets(&self.latency_buckets);
        let latency_sum = self.latency_sum_ms.swap(0, Ordering::Relaxed);
        let latency_count = self.latency_count.swap(0, Ordering::Relaxed);
        let latency_max = self.latency_max_ms.swap(0, Ordering::Relaxed);

        MetricsSummary {
            fetch_attempts: self.fetch_attempts(),
            fetch_success: self.fetch_success(),
            fetch_transport_errors: self.fetch_failures(ErrorKind::TransportError),
            fetch_rate_limited: self.fetch_failures(ErrorKind::RateLimited),
            fetch_protocol_errors: self.fetch_failures(ErrorKind::ProtocolError),
            results_discarded: self.results_discarded(),
            latency_avg_ms: if latency_count > 0 { latency_sum / latency_count } else { 0 },
            latency_max_ms: latency_max,
            latency_p95_ms: percentile_from_buckets(&buckets, 0.95),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time metrics summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSummary {
    pub fetch_attempts: u64,
    pub fetch_success: u64,
    pub fetch_transport_errors: u64,
    pub fetch_rate_limited: u64,
    pub fetch_protocol_errors: u64,
    pub results_discarded: u64,
    pub latency_avg_ms: u64,
    pub latency_max_ms: u64,
    pub latency_p95_ms: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            fetch_attempts = %self.fetch_attempts,
            fetch_success = %self.fetch_success,
            transport_errors = %self.fetch_transport_errors,
            rate_limited = %self.fetch_rate_limited,
            protocol_errors = %self.fetch_protocol_errors,
            results_discarded = %self.results_discarded,
            avg_latency_ms = %self.latency_avg_ms,
            max_latency_ms = %self.latency_max_ms,
            p95_latency_ms = %self.latency_p95_ms,
            "fetch_metrics"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_metrics_new() {
        let metrics = Metrics::new();
        assert_eq!(metrics.fetch_attempts(), 0);
        assert_eq!(metrics.fetch_success(), 0);
        assert_eq!(metrics.report().latency_p95_ms, 0);
    }

    #[test]
    fn test_failure_counters_by_kind() {
        let metrics = Metrics::new();
        metrics.record_fetch_failure(ErrorKind::RateLimited, 10);
        metrics.record_fetch_failure(ErrorKind::RateLimited, 10);
        metrics.record_fetch_failure(ErrorKind::ProtocolError, 10);

        assert_eq!(metrics.fetch_failures(ErrorKind::RateLimited), 2);
        assert_eq!(metrics.fetch_failures(ErrorKind::ProtocolError), 1);
        assert_eq!(metrics.fetch_failures(ErrorKind::TransportError), 0);
    }

    #[test]
    fn test_report_resets_latency_not_totals() {
        let metrics = Metrics::new();
        metrics.record_fetch_attempt();
        metrics.record_fetch_success(100);
        metrics.record_fetch_attempt();
        metrics.record_fetch_success(300);

        let first = metrics.report();
        assert_eq!(first.fetch_attempts, 2);
        assert_eq!(first.fetch_success, 2);
        assert_eq!(first.latency_avg_ms, 200);
        assert_eq!(first.latency_max_ms, 300);

        let second = metrics.report();
        assert_eq!(second.fetch_success, 2);
        assert_eq!(second.latency_avg_ms, 0);
        assert_eq!(second.latency_max_ms, 0);
    }

    #[test]
    fn test_bucket_index() {
        assert_eq!(bucket_index(0), 0);
        assert_eq!(bucket_index(50), 0);
        assert_eq!(bucket_index(51), 1);
        assert_eq!(bucket_index(25600), 9);
        assert_eq!(bucket_index(25601), 10);
    }

    #[test]
    fn test_percentile_computation() {
        let mut buckets = [0u64; NUM_BUCKETS];
        buckets[0] = 95;
        buckets[4] = 5;
        assert_eq!(percentile_from_buckets(&buckets, 0.95), 50);
        assert_eq!(percentile_from_buckets(&buckets, 0.99), 800);
    }

    #[test]
    fn test_concurrent_updates() {
        let metrics = Arc::new(Metrics::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let metrics = metrics.clone();
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        metrics.record_fetch_attempt();
                        metrics.record_fetch_success(20);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(metrics.fetch_attempts(), 1000);
        assert_eq!(metrics.report().latency_max_ms, 20);
    }
}
