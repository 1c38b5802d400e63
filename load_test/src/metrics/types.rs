//! Metric types

use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct IterationMetrics {
    pub started: u64,
    pub completed: u64,
    /// Scheduled starts skipped because every VU was busy
    pub dropped: u64,
    /// Still running when the graceful stop window closed
    pub interrupted: u64,
    pub in_flight: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RequestMetrics {
    pub total: u64,
    pub transport_errors: u64,
    pub by_status: BTreeMap<u16, u64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckMetrics {
    pub passed: u64,
    pub failed: u64,
}

impl CheckMetrics {
    /// Fraction of passing checks in `0.0..=1.0`, `None` before the first check.
    pub fn pass_rate(&self) -> Option<f64> {
        let total = self.passed + self.failed;
        (total > 0).then(|| self.passed as f64 / total as f64)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SystemMetrics {
    pub cpu_usage: f32,
    pub memory_used_mb: u64,
    pub memory_total_mb: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TestMetrics {
    pub iterations: IterationMetrics,
    pub requests: RequestMetrics,
    pub checks: CheckMetrics,
    pub system: SystemMetrics,
}
