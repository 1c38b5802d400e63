//! Constant request rate scenario - probe one endpoint at a fixed requests/minute
//!
//! Declares the execution plan and latency threshold for a run and hands the
//! HTTP probe to the constant-arrival-rate executor.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::config::RunConfig;
use crate::error::ThresholdError;
use crate::executor::{self, ExecutionPlan, ExecutorKind};
use crate::metrics::collector::MetricsCollector;
use crate::metrics::reporter;
use crate::metrics::summary::RunSummary;
use crate::scenarios::probe::HttpProbe;
use crate::thresholds::Threshold;

pub const SCENARIO_NAME: &str = "constant_request_rate";
/// `target_rate` is expressed per this unit
pub const TIME_UNIT: Duration = Duration::from_secs(60);
pub const PRE_ALLOCATED_VUS: usize = 20;
pub const MAX_VUS: usize = 200;

pub const LATENCY_METRIC: &str = "http_req_duration";
/// 95% of requests should complete below 500ms
pub const LATENCY_THRESHOLD: &str = "p(95)<500";

/// Engine-side knobs that are not part of the scenario itself.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub request_timeout: Duration,
    pub graceful_stop: Duration,
    /// Seconds between live reports, `None` disables them
    pub report_interval: Option<u64>,
    /// Checked in addition to the scenario's own thresholds
    pub extra_thresholds: Vec<Threshold>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(60),
            graceful_stop: executor::DEFAULT_GRACEFUL_STOP,
            report_interval: Some(5),
            extra_thresholds: Vec::new(),
        }
    }
}

pub fn plan(config: &RunConfig) -> ExecutionPlan {
    ExecutionPlan {
        name: SCENARIO_NAME.to_string(),
        executor: ExecutorKind::ConstantArrivalRate,
        rate: config.target_rate,
        time_unit: TIME_UNIT,
        duration: config.duration,
        pre_allocated_vus: PRE_ALLOCATED_VUS,
        max_vus: MAX_VUS,
    }
}

pub fn thresholds() -> Result<Vec<Threshold>, ThresholdError> {
    Ok(vec![Threshold::parse(LATENCY_METRIC, LATENCY_THRESHOLD)?])
}

/// Run until the plan completes or Ctrl+C is pressed.
pub async fn run(config: RunConfig, options: RunOptions) -> Result<RunSummary> {
    run_until(config, options, shutdown_signal()).await
}

pub async fn run_until<S>(config: RunConfig, options: RunOptions, shutdown: S) -> Result<RunSummary>
where
    S: Future<Output = ()>,
{
    let plan = plan(&config);
    let mut thresholds = thresholds()?;
    thresholds.extend(options.extra_thresholds.iter().cloned());
    let probe = Arc::new(HttpProbe::new(config.target_url(), options.request_timeout)?);

    tracing::info!("Starting {} scenario against {}", plan.name, probe.url());
    tracing::info!(
        "  Rate: {}/{} ({:.2}/sec) for {}",
        plan.rate,
        humantime::format_duration(plan.time_unit),
        plan.rate_per_second(),
        humantime::format_duration(plan.duration)
    );
    for threshold in &thresholds {
        tracing::info!("  Threshold: {} {}", threshold.metric, threshold);
    }

    let collector = MetricsCollector::new();

    // Start periodic metrics reporter
    let live_reporter = options.report_interval.map(|secs| {
        let collector = collector.clone();
        tokio::spawn(async move {
            reporter::start_periodic_reporter(collector, secs).await;
        })
    });

    let report = executor::constant_arrival_rate::execute(
        &plan,
        probe,
        &collector,
        options.graceful_stop,
        shutdown,
    )
    .await;

    if let Some(handle) = live_reporter {
        handle.abort();
    }

    tracing::info!(
        "Run finished: {} scheduled, {} dropped, {} interrupted",
        report.scheduled,
        report.dropped,
        report.interrupted
    );

    collector.update_system_metrics();
    let summary = RunSummary::collect(config, plan, &report, &collector, &thresholds);

    // Print final report
    reporter::print_final_report(&summary);

    Ok(summary)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C, run will only stop at its deadline: {}", e);
        std::future::pending::<()>().await;
    }
}
