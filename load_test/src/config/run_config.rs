//! Run configuration - resolved once at startup from environment lookups
//!
//! Every field has a literal default, so a run needs no external
//! configuration at all. Missing, empty, or unparseable values fall back to
//! the default silently; resolution never fails.

use std::time::Duration;

use serde::{Serialize, Serializer};

/// Requests per minute
pub const TARGET_RPM_VAR: &str = "TARGET_RPM";
/// Total run length, e.g. `60s`, `2m`, `1h`
pub const DURATION_VAR: &str = "DURATION";
/// Target host, including scheme
pub const BASE_URL_VAR: &str = "BASE_URL";
/// Path appended verbatim to the base URL
pub const ENDPOINT_VAR: &str = "ENDPOINT";

pub const DEFAULT_TARGET_RPM: u64 = 1000;
pub const DEFAULT_DURATION: &str = "60s";
pub const DEFAULT_BASE_URL: &str = "http://host.docker.internal:8000";
pub const DEFAULT_ENDPOINT: &str = "/health";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunConfig {
    /// Iterations started per minute
    pub target_rate: u64,
    #[serde(serialize_with = "serialize_duration")]
    pub duration: Duration,
    pub base_url: String,
    pub endpoint_path: String,
}

impl RunConfig {
    /// Resolve through an arbitrary lookup. `lookup` receives the variable
    /// name and returns its raw value, if any.
    pub fn resolve<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            target_rate: parse_rate(value(TARGET_RPM_VAR).as_deref()),
            duration: parse_run_duration(value(DURATION_VAR).as_deref()),
            base_url: value(BASE_URL_VAR).unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            endpoint_path: value(ENDPOINT_VAR).unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
        }
    }

    /// Full probe URL. The path is appended as-is, without normalising slashes.
    pub fn target_url(&self) -> String {
        format!("{}{}", self.base_url, self.endpoint_path)
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::resolve(|_| None)
    }
}

fn parse_rate(raw: Option<&str>) -> u64 {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|rate| *rate > 0)
        .unwrap_or(DEFAULT_TARGET_RPM)
}

fn parse_run_duration(raw: Option<&str>) -> Duration {
    raw.and_then(|s| humantime::parse_duration(s.trim()).ok())
        .filter(|d| !d.is_zero())
        .unwrap_or_else(default_duration)
}

fn default_duration() -> Duration {
    // DEFAULT_DURATION is a compile-time literal that always parses
    humantime::parse_duration(DEFAULT_DURATION).unwrap_or(Duration::from_secs(60))
}

pub(crate) fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(&humantime::format_duration(*duration))
}
