//! Run summary - end-of-run aggregate, optionally exported as JSON

use std::path::Path;

use serde::Serialize;
use uuid::Uuid;

use super::collector::{LatencyStats, MetricsCollector};
use super::types::TestMetrics;
use crate::config::RunConfig;
use crate::error::SummaryError;
use crate::executor::constant_arrival_rate::ExecutionReport;
use crate::executor::ExecutionPlan;
use crate::thresholds::{Threshold, ThresholdResult};

/// Process exit code when at least one threshold failed.
pub const THRESHOLDS_FAILED_EXIT_CODE: u8 = 99;

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub target_url: String,
    pub config: RunConfig,
    pub plan: ExecutionPlan,
    pub elapsed_secs: f64,
    pub scheduled_iterations: u64,
    pub vus_initialized: usize,
    pub stopped_early: bool,
    pub metrics: TestMetrics,
    pub latency_ms: LatencyStats,
    /// Completed iterations per second
    pub throughput: f64,
    pub check_pass_rate: Option<f64>,
    pub thresholds: Vec<ThresholdResult>,
}

impl RunSummary {
    pub fn collect(
        config: RunConfig,
        plan: ExecutionPlan,
        report: &ExecutionReport,
        collector: &MetricsCollector,
        thresholds: &[Threshold],
    ) -> Self {
        let metrics = collector.get_snapshot();
        let elapsed_secs = collector.elapsed().as_secs_f64();
        let throughput = if elapsed_secs > 0.0 {
            metrics.iterations.completed as f64 / elapsed_secs
        } else {
            0.0
        };

        let thresholds = thresholds
            .iter()
            .map(|t| t.evaluate(collector.latency_aggregate(t.aggregation)))
            .collect();

        Self {
            run_id: Uuid::new_v4(),
            target_url: config.target_url(),
            config,
            plan,
            elapsed_secs,
            scheduled_iterations: report.scheduled,
            vus_initialized: report.vus_initialized,
            stopped_early: report.stopped_early,
            check_pass_rate: metrics.checks.pass_rate(),
            latency_ms: collector.get_latency_percentiles(),
            throughput,
            metrics,
            thresholds,
        }
    }

    pub fn thresholds_passed(&self) -> bool {
        self.thresholds.iter().all(|t| t.passed)
    }

    /// `0` when every threshold passed. Failed checks alone do not fail a run.
    pub fn exit_code(&self) -> u8 {
        if self.thresholds_passed() {
            0
        } else {
            THRESHOLDS_FAILED_EXIT_CODE
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<(), SummaryError> {
        let bytes = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, bytes).map_err(|source| SummaryError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{ExecutorKind, IterationOutcome};
    use std::time::Duration;

    fn fixture(latency_ms: u64, status: u16) -> RunSummary {
        let config = RunConfig::default();
        let plan = ExecutionPlan {
            name: "constant_request_rate".to_string(),
            executor: ExecutorKind::ConstantArrivalRate,
            rate: config.target_rate,
            time_unit: Duration::from_secs(60),
            duration: config.duration,
            pre_allocated_vus: 20,
            max_vus: 200,
        };
        let collector = MetricsCollector::new();
        for _ in 0..10 {
            collector.iteration_started();
            collector.iteration_finished(&IterationOutcome {
                latency: Duration::from_millis(latency_ms),
                status: Some(status),
                check_passed: status == 200,
            });
        }
        let report = ExecutionReport {
            scheduled: 10,
            dropped: 0,
            interrupted: 0,
            vus_initialized: 20,
            stopped_early: false,
        };
        let thresholds = [Threshold::parse("http_req_duration", "p(95)<500").unwrap()];

        RunSummary::collect(config, plan, &report, &collector, &thresholds)
    }

    #[test]
    fn test_exit_code_follows_thresholds() {
        let fast = fixture(20, 200);
        assert!(fast.thresholds_passed());
        assert_eq!(fast.exit_code(), 0);

        let slow = fixture(800, 200);
        assert!(!slow.thresholds_passed());
        assert_eq!(slow.exit_code(), THRESHOLDS_FAILED_EXIT_CODE);
    }

    #[test]
    fn test_failed_checks_do_not_fail_run() {
        let summary = fixture(20, 500);
        assert_eq!(summary.check_pass_rate, Some(0.0));
        assert_eq!(summary.exit_code(), 0);
    }

    #[test]
    fn test_write_json() {
        let summary = fixture(20, 200);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");

        summary.write_json(&path).unwrap();

        let json: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(json["target_url"], "http://host.docker.internal:8000/health");
        assert_eq!(json["plan"]["executor"], "constant-arrival-rate");
        assert_eq!(json["plan"]["max_vus"], 200);
        assert_eq!(json["metrics"]["checks"]["passed"], 10);
        assert_eq!(json["metrics"]["requests"]["by_status"]["200"], 10);
        assert_eq!(json["check_pass_rate"], 1.0);
        assert_eq!(json["thresholds"][0]["expression"], "p(95)<500");
        assert_eq!(json["thresholds"][0]["passed"], true);
    }

    #[test]
    fn test_write_json_reports_path() {
        let summary = fixture(20, 200);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("summary.json");

        let err = summary.write_json(&path).unwrap_err();
        assert!(matches!(err, SummaryError::Write { .. }));
        assert!(err.to_string().contains("summary.json"));
    }
}
