use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::run_config::{BASE_URL_VAR, DURATION_VAR, ENDPOINT_VAR, TARGET_RPM_VAR};
use crate::config::RunConfig;
use crate::error::ThresholdError;
use crate::executor::DEFAULT_GRACEFUL_STOP;
use crate::scenarios::constant_request_rate::{RunOptions, LATENCY_METRIC};
use crate::thresholds::Threshold;

/// Constant request rate HTTP probe
///
/// Values for the four run settings are taken verbatim and resolved
/// leniently: anything missing or unparseable falls back to its default.
#[derive(Parser, Debug)]
#[command(name = "rate-probe")]
#[command(about = "Probe an HTTP endpoint at a constant request rate, expecting 200 or 429")]
#[command(version)]
pub struct Cli {
    /// Requests per minute (default 1000)
    #[arg(long, env = "TARGET_RPM")]
    pub target_rpm: Option<String>,

    /// Total run length, e.g. 60s, 2m, 1h (default 60s)
    #[arg(long, env = "DURATION")]
    pub duration: Option<String>,

    /// Target host (default http://host.docker.internal:8000)
    #[arg(long, env = "BASE_URL")]
    pub base_url: Option<String>,

    /// Path appended to the base URL (default /health)
    #[arg(long, env = "ENDPOINT")]
    pub endpoint: Option<String>,

    /// Per-request timeout
    #[arg(long, default_value = "60s", value_parser = humantime::parse_duration)]
    pub request_timeout: Duration,

    /// Time in-flight requests may take to finish once the run ends
    #[arg(long, default_value = "30s", value_parser = humantime::parse_duration)]
    pub graceful_stop: Duration,

    /// Extra request latency threshold in ms, e.g. "avg<200" or "p(99)<=1000".
    /// Repeatable; checked alongside the built-in p(95)<500
    #[arg(long = "threshold", env = "THRESHOLDS", value_delimiter = ',')]
    pub thresholds: Vec<String>,

    /// Metrics reporting interval in seconds
    #[arg(long, default_value = "5")]
    pub report_interval: u64,

    /// Disable the live console report
    #[arg(long)]
    pub no_live: bool,

    /// Write the end-of-run summary as JSON to this file
    #[arg(long)]
    pub summary_export: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    fn raw_setting(&self, key: &str) -> Option<String> {
        match key {
            TARGET_RPM_VAR => self.target_rpm.clone(),
            DURATION_VAR => self.duration.clone(),
            BASE_URL_VAR => self.base_url.clone(),
            ENDPOINT_VAR => self.endpoint.clone(),
            _ => None,
        }
    }

    pub fn run_config(&self) -> RunConfig {
        RunConfig::resolve(|key| self.raw_setting(key))
    }

    /// Engine options. Fails on a malformed `--threshold`.
    pub fn run_options(&self) -> Result<RunOptions, ThresholdError> {
        let extra_thresholds = self
            .thresholds
            .iter()
            .map(|expression| Threshold::parse(LATENCY_METRIC, expression))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RunOptions {
            request_timeout: self.request_timeout,
            graceful_stop: self.graceful_stop,
            report_interval: (!self.no_live).then_some(self.report_interval),
            extra_thresholds,
        })
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            target_rpm: None,
            duration: None,
            base_url: None,
            endpoint: None,
            request_timeout: Duration::from_secs(60),
            graceful_stop: DEFAULT_GRACEFUL_STOP,
            thresholds: Vec::new(),
            report_interval: 5,
            no_live: false,
            summary_export: None,
            verbose: false,
        }
    }
}
