//! Metrics collector - thread-safe collection with latency tracking

use super::types::TestMetrics;
use crate::executor::IterationOutcome;
use crate::thresholds::Aggregation;
use hdrhistogram::Histogram;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};

#[derive(Clone)]
pub struct MetricsCollector {
    metrics: Arc<RwLock<TestMetrics>>,
    // microseconds
    request_latencies: Arc<RwLock<Histogram<u64>>>,
    system: Arc<RwLock<System>>,
    start_time: Instant,
}

impl MetricsCollector {
    pub fn new() -> Self {
        // 3 significant digits, auto-resizing so no sample is rejected
        let request_hist = Histogram::new(3).expect("Failed to create request histogram");

        let system = System::new_with_specifics(
            RefreshKind::new()
                .with_cpu(CpuRefreshKind::everything())
                .with_memory(MemoryRefreshKind::everything()),
        );

        Self {
            metrics: Arc::new(RwLock::new(TestMetrics::default())),
            request_latencies: Arc::new(RwLock::new(request_hist)),
            system: Arc::new(RwLock::new(system)),
            start_time: Instant::now(),
        }
    }

    pub fn iteration_started(&self) {
        let mut metrics = self.metrics.write();
        metrics.iterations.started += 1;
        metrics.iterations.in_flight += 1;
    }

    pub fn iteration_finished(&self, outcome: &IterationOutcome) {
        let mut metrics = self.metrics.write();
        metrics.iterations.completed += 1;
        metrics.iterations.in_flight = metrics.iterations.in_flight.saturating_sub(1);

        metrics.requests.total += 1;
        match outcome.status {
            Some(status) => *metrics.requests.by_status.entry(status).or_insert(0) += 1,
            None => metrics.requests.transport_errors += 1,
        }

        if outcome.check_passed {
            metrics.checks.passed += 1;
        } else {
            metrics.checks.failed += 1;
        }
        drop(metrics);

        let micros = u64::try_from(outcome.latency.as_micros()).unwrap_or(u64::MAX);
        // Record at least 1us so instant responses still count
        if let Err(e) = self.request_latencies.write().record(micros.max(1)) {
            tracing::debug!("Dropped latency sample {}us: {}", micros, e);
        }
    }

    pub fn iteration_dropped(&self) {
        self.metrics.write().iterations.dropped += 1;
    }

    pub fn iterations_interrupted(&self, count: u64) {
        let mut metrics = self.metrics.write();
        metrics.iterations.interrupted += count;
        metrics.iterations.in_flight = metrics.iterations.in_flight.saturating_sub(count);
    }

    /// Update system metrics (CPU, memory)
    pub fn update_system_metrics(&self) {
        let mut system = self.system.write();
        system.refresh_cpu_all();
        system.refresh_memory();

        let mut metrics = self.metrics.write();
        metrics.system.cpu_usage = system.global_cpu_usage();
        metrics.system.memory_used_mb = system.used_memory() / 1024 / 1024;
        metrics.system.memory_total_mb = system.total_memory() / 1024 / 1024;
    }

    pub fn get_snapshot(&self) -> TestMetrics {
        self.metrics.read().clone()
    }

    /// Request latency aggregate in milliseconds, `None` without samples.
    pub fn latency_aggregate(&self, aggregation: Aggregation) -> Option<f64> {
        let hist = self.request_latencies.read();
        if hist.is_empty() {
            return None;
        }

        let micros = match aggregation {
            Aggregation::Percentile(p) => hist.value_at_percentile(p) as f64,
            Aggregation::Median => hist.value_at_quantile(0.5) as f64,
            Aggregation::Avg => hist.mean(),
            Aggregation::Min => hist.min() as f64,
            Aggregation::Max => hist.max() as f64,
        };
        Some(micros / 1000.0)
    }

    pub fn get_latency_percentiles(&self) -> LatencyStats {
        let hist = self.request_latencies.read();
        let ms = |micros: u64| micros as f64 / 1000.0;
        LatencyStats {
            min: ms(hist.min()),
            p50: ms(hist.value_at_quantile(0.50)),
            p90: ms(hist.value_at_quantile(0.90)),
            p95: ms(hist.value_at_quantile(0.95)),
            p99: ms(hist.value_at_quantile(0.99)),
            max: ms(hist.max()),
            mean: hist.mean() / 1000.0,
            count: hist.len(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed().as_secs()
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Request latency distribution in milliseconds
#[derive(Debug, Clone, Serialize)]
pub struct LatencyStats {
    pub min: f64,
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
    pub max: f64,
    pub mean: f64,
    pub count: u64,
}
