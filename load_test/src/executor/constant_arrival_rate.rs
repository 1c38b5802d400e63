//! Constant arrival rate - start iterations on a fixed clock (open loop)

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::{sleep_until, Instant};

use super::vu_pool::VuPool;
use super::{ExecutionPlan, Iteration};
use crate::metrics::collector::MetricsCollector;

/// What the scheduler did, independent of iteration outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    pub scheduled: u64,
    pub dropped: u64,
    pub interrupted: u64,
    pub vus_initialized: usize,
    pub stopped_early: bool,
}

/// Run `plan`, starting iteration `i` at `plan.start_offset(i)`.
///
/// Scheduling stops once `plan.duration` has elapsed or `shutdown` resolves;
/// a scheduler that fell behind never starts work past the deadline.
/// Iterations still in flight then get `graceful_stop` to finish before being
/// aborted.
pub async fn execute<I, S>(
    plan: &ExecutionPlan,
    iteration: Arc<I>,
    collector: &MetricsCollector,
    graceful_stop: Duration,
    shutdown: S,
) -> ExecutionReport
where
    I: Iteration,
    S: Future<Output = ()>,
{
    let pool = VuPool::new(plan.pre_allocated_vus, plan.max_vus);
    let planned = plan.planned_iterations();
    let period = plan.start_interval();

    tracing::info!(
        "Scheduling {} iterations, one every {:?} ({} VUs pre-allocated, {} max)",
        planned,
        period,
        plan.pre_allocated_vus,
        plan.max_vus
    );

    let start = Instant::now();
    let deadline = start + plan.duration;

    let mut tasks = JoinSet::new();
    let mut scheduled = 0u64;
    let mut dropped = 0u64;
    let mut stopped_early = false;
    tokio::pin!(shutdown);

    while scheduled < planned {
        // Late starts fire back-to-back so the arrival rate catches up
        let next_start = start + plan.start_offset(scheduled);

        tokio::select! {
            _ = &mut shutdown => {
                tracing::warn!("Shutdown requested, stopping after {} of {} iterations", scheduled, planned);
                stopped_early = true;
                break;
            }
            _ = sleep_until(next_start) => {
                if Instant::now() >= deadline {
                    tracing::warn!(
                        "Scheduler fell behind past the run deadline, skipping {} remaining iterations",
                        planned - scheduled
                    );
                    break;
                }
                scheduled += 1;

                let Some(vu) = pool.try_acquire() else {
                    if dropped == 0 {
                        tracing::warn!(
                            "All {} VUs busy, dropping iterations until one frees up",
                            pool.max()
                        );
                    }
                    dropped += 1;
                    collector.iteration_dropped();
                    continue;
                };

                collector.iteration_started();
                let iteration = Arc::clone(&iteration);
                let collector = collector.clone();
                tasks.spawn(async move {
                    let outcome = iteration.execute().await;
                    collector.iteration_finished(&outcome);
                    drop(vu);
                });
            }
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                log_join_error(joined);
            }
        }
    }

    tracing::info!(
        "Scheduling finished, waiting up to {:?} for {} in-flight iterations...",
        graceful_stop,
        tasks.len()
    );

    let drained = tokio::time::timeout(graceful_stop, async {
        while let Some(joined) = tasks.join_next().await {
            log_join_error(joined);
        }
    })
    .await;

    let mut interrupted = 0u64;
    if drained.is_err() {
        interrupted = tasks.len() as u64;
        tracing::warn!("Graceful stop elapsed, interrupting {} iterations", interrupted);
        tasks.abort_all();
        while tasks.join_next().await.is_some() {}
        collector.iterations_interrupted(interrupted);
    }

    ExecutionReport {
        scheduled,
        dropped,
        interrupted,
        vus_initialized: pool.initialized(),
        stopped_early,
    }
}

fn log_join_error(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        if e.is_panic() {
            tracing::error!("Iteration task panicked: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{ExecutorKind, IterationOutcome};
    use std::pin::Pin;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    struct SleepIteration {
        delay: Duration,
        runs: AtomicU64,
    }

    impl SleepIteration {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                delay,
                runs: AtomicU64::new(0),
            })
        }
    }

    impl Iteration for SleepIteration {
        fn execute(&self) -> Pin<Box<dyn Future<Output = IterationOutcome> + Send>> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            let delay = self.delay;
            Box::pin(async move {
                tokio::time::sleep(delay).await;
                IterationOutcome {
                    latency: delay,
                    status: Some(200),
                    check_passed: true,
                }
            })
        }
    }

    fn plan(rate: u64, duration: Duration, pre_allocated_vus: usize, max_vus: usize) -> ExecutionPlan {
        ExecutionPlan {
            name: "test".to_string(),
            executor: ExecutorKind::ConstantArrivalRate,
            rate,
            time_unit: Duration::from_secs(60),
            duration,
            pre_allocated_vus,
            max_vus,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_starts_planned_iterations() {
        let plan = plan(600, Duration::from_secs(10), 20, 200);
        let iteration = SleepIteration::new(Duration::from_millis(20));
        let collector = MetricsCollector::new();

        let report = execute(
            &plan,
            Arc::clone(&iteration),
            &collector,
            Duration::from_secs(30),
            std::future::pending(),
        )
        .await;

        assert_eq!(report.scheduled, 100);
        assert_eq!(report.dropped, 0);
        assert_eq!(report.interrupted, 0);
        assert!(!report.stopped_early);
        assert_eq!(iteration.runs.load(Ordering::SeqCst), 100);

        let metrics = collector.get_snapshot();
        assert_eq!(metrics.iterations.started, 100);
        assert_eq!(metrics.iterations.completed, 100);
        assert_eq!(metrics.iterations.in_flight, 0);
        assert_eq!(metrics.checks.pass_rate(), Some(1.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_loop_does_not_wait_for_slow_iterations() {
        // 100ms interval, each iteration takes 1s: ~10 run concurrently
        let plan = plan(600, Duration::from_secs(2), 2, 200);
        let iteration = SleepIteration::new(Duration::from_secs(1));
        let collector = MetricsCollector::new();

        let report = execute(
            &plan,
            iteration,
            &collector,
            Duration::from_secs(30),
            std::future::pending(),
        )
        .await;

        assert_eq!(report.scheduled, 20);
        assert_eq!(report.dropped, 0);
        assert!(report.vus_initialized >= 10, "vus {}", report.vus_initialized);
        assert_eq!(collector.get_snapshot().iterations.completed, 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drops_when_pool_exhausted() {
        // 50ms interval over 300ms: 6 starts, 2 VUs each busy for 500ms
        let plan = plan(1200, Duration::from_millis(300), 1, 2);
        let iteration = SleepIteration::new(Duration::from_millis(500));
        let collector = MetricsCollector::new();

        let report = execute(
            &plan,
            iteration,
            &collector,
            Duration::from_secs(30),
            std::future::pending(),
        )
        .await;

        assert_eq!(report.scheduled, 6);
        assert_eq!(report.dropped, 4);
        assert_eq!(report.vus_initialized, 2);

        let metrics = collector.get_snapshot();
        assert_eq!(metrics.iterations.started, 2);
        assert_eq!(metrics.iterations.completed, 2);
        assert_eq!(metrics.iterations.dropped, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupts_after_graceful_stop() {
        let plan = plan(60, Duration::from_secs(3), 5, 5);
        let iteration = SleepIteration::new(Duration::from_secs(60));
        let collector = MetricsCollector::new();

        let report = execute(
            &plan,
            iteration,
            &collector,
            Duration::from_secs(1),
            std::future::pending(),
        )
        .await;

        assert_eq!(report.scheduled, 3);
        assert_eq!(report.interrupted, 3);

        let metrics = collector.get_snapshot();
        assert_eq!(metrics.iterations.interrupted, 3);
        assert_eq!(metrics.iterations.completed, 0);
        assert_eq!(metrics.iterations.in_flight, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_scheduling() {
        let plan = plan(600, Duration::from_secs(60), 20, 200);
        let iteration = SleepIteration::new(Duration::from_millis(10));
        let collector = MetricsCollector::new();

        let report = execute(
            &plan,
            iteration,
            &collector,
            Duration::from_secs(30),
            tokio::time::sleep(Duration::from_millis(950)),
        )
        .await;

        assert!(report.stopped_early);
        assert!(report.scheduled < plan.planned_iterations());
        assert!(report.scheduled >= 9 && report.scheduled <= 11, "scheduled {}", report.scheduled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_uneven_rate_starts_exactly_rate_per_minute() {
        for rate in [7, 333, 1001] {
            let plan = plan(rate, Duration::from_secs(60), 20, 200);
            let iteration = SleepIteration::new(Duration::from_millis(1));
            let collector = MetricsCollector::new();

            let report = execute(
                &plan,
                iteration,
                &collector,
                Duration::from_secs(30),
                std::future::pending(),
            )
            .await;

            assert_eq!(report.scheduled, rate, "rate {}", rate);
            assert_eq!(collector.get_snapshot().iterations.started, rate, "rate {}", rate);
        }
    }

    /// Jumps the paused clock forward from inside the first iteration, so the
    /// scheduler only wakes up again after the run deadline.
    struct StallingIteration {
        stall: Duration,
        stalled: AtomicBool,
    }

    impl Iteration for StallingIteration {
        fn execute(&self) -> Pin<Box<dyn Future<Output = IterationOutcome> + Send>> {
            let stall = (!self.stalled.swap(true, Ordering::SeqCst)).then_some(self.stall);
            Box::pin(async move {
                if let Some(stall) = stall {
                    tokio::time::advance(stall).await;
                }
                IterationOutcome {
                    latency: Duration::from_millis(1),
                    status: Some(200),
                    check_passed: true,
                }
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_starts_after_deadline_when_behind() {
        // 10 starts planned over 1s, but the clock jumps to 5s after the first
        let plan = plan(600, Duration::from_secs(1), 20, 200);
        let iteration = Arc::new(StallingIteration {
            stall: Duration::from_secs(5),
            stalled: AtomicBool::new(false),
        });
        let collector = MetricsCollector::new();

        let report = execute(
            &plan,
            iteration,
            &collector,
            Duration::from_secs(30),
            std::future::pending(),
        )
        .await;

        assert_eq!(report.scheduled, 1);
        assert!(!report.stopped_early);

        let metrics = collector.get_snapshot();
        assert_eq!(metrics.iterations.started, 1);
        assert_eq!(metrics.iterations.completed, 1);
        assert_eq!(metrics.iterations.dropped, 0);
    }
}
