//! Executor - turns a declared execution plan into scheduled iterations
//!
//! Scenarios only describe *how much* load to generate (an [`ExecutionPlan`])
//! and *what* one iteration does (an [`Iteration`]). The executor owns the
//! clock, the VU pool and cancellation.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::Serialize;

use crate::config::run_config::serialize_duration;

pub mod constant_arrival_rate;
pub mod vu_pool;

/// How long in-flight iterations may keep running once the plan has ended.
pub const DEFAULT_GRACEFUL_STOP: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutorKind {
    /// Open loop: iterations start on a fixed clock regardless of how long
    /// earlier ones take.
    ConstantArrivalRate,
}

impl std::fmt::Display for ExecutorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutorKind::ConstantArrivalRate => write!(f, "constant-arrival-rate"),
        }
    }
}

/// Declarative description of a load scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionPlan {
    pub name: String,
    pub executor: ExecutorKind,
    /// Iterations to start per `time_unit`
    pub rate: u64,
    #[serde(serialize_with = "serialize_duration")]
    pub time_unit: Duration,
    #[serde(serialize_with = "serialize_duration")]
    pub duration: Duration,
    pub pre_allocated_vus: usize,
    pub max_vus: usize,
}

impl ExecutionPlan {
    /// Average gap between two consecutive iteration starts. Only for
    /// display; scheduling uses [`ExecutionPlan::start_offset`].
    pub fn start_interval(&self) -> Duration {
        self.start_offset(1)
    }

    /// Offset of iteration `index` from the start of the run, computed as
    /// `index * time_unit / rate` without accumulating rounding error.
    pub fn start_offset(&self, index: u64) -> Duration {
        let rate = u128::from(self.rate.max(1));
        let nanos = u128::from(index).saturating_mul(self.time_unit.as_nanos()) / rate;
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// Number of iterations whose start falls inside `duration`. The first
    /// one starts immediately.
    pub fn planned_iterations(&self) -> u64 {
        let unit = self.time_unit.as_nanos().max(1);
        let planned = self
            .duration
            .as_nanos()
            .saturating_mul(u128::from(self.rate))
            .div_ceil(unit);
        u64::try_from(planned).unwrap_or(u64::MAX)
    }

    /// Iterations per second implied by `rate` and `time_unit`.
    pub fn rate_per_second(&self) -> f64 {
        self.rate as f64 / self.time_unit.as_secs_f64()
    }
}

/// Result of a single iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationOutcome {
    pub latency: Duration,
    /// `None` when the request never produced a response
    pub status: Option<u16>,
    pub check_passed: bool,
}

/// One unit of work run by a VU.
pub trait Iteration: Send + Sync + 'static {
    fn execute(&self) -> Pin<Box<dyn Future<Output = IterationOutcome> + Send>>;
}
