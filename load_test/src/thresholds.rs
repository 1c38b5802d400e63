//! Pass/fail criteria evaluated against the run's latency distribution
//!
//! Expressions use the `<aggregation><op><bound>` form, e.g. `p(95)<500`,
//! `avg<=200` or `max<2000`. Bounds are in milliseconds.

use std::fmt;

use serde::Serialize;

use crate::error::ThresholdError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Aggregation {
    /// Percentile in `(0, 100]`
    Percentile(f64),
    Median,
    Avg,
    Min,
    Max,
}

impl Aggregation {
    fn parse(token: &str, expression: &str) -> Result<Self, ThresholdError> {
        match token {
            "avg" => return Ok(Aggregation::Avg),
            "min" => return Ok(Aggregation::Min),
            "max" => return Ok(Aggregation::Max),
            "med" => return Ok(Aggregation::Median),
            _ => {}
        }

        let inner = token
            .strip_prefix("p(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| ThresholdError::UnknownAggregation(expression.to_string()))?;

        inner
            .parse::<f64>()
            .ok()
            .filter(|p| *p > 0.0 && *p <= 100.0)
            .map(Aggregation::Percentile)
            .ok_or_else(|| ThresholdError::InvalidPercentile(expression.to_string()))
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregation::Percentile(p) => write!(f, "p({})", p),
            Aggregation::Median => write!(f, "med"),
            Aggregation::Avg => write!(f, "avg"),
            Aggregation::Min => write!(f, "min"),
            Aggregation::Max => write!(f, "max"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

impl Comparison {
    fn holds(self, observed: f64, bound: f64) -> bool {
        match self {
            Comparison::Lt => observed < bound,
            Comparison::Le => observed <= bound,
            Comparison::Gt => observed > bound,
            Comparison::Ge => observed >= bound,
            Comparison::Eq => (observed - bound).abs() < f64::EPSILON,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
            Comparison::Eq => "==",
        };
        f.write_str(op)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Threshold {
    pub metric: String,
    pub aggregation: Aggregation,
    pub comparison: Comparison,
    pub bound: f64,
}

impl Threshold {
    /// Parse `expression` as a threshold on `metric`.
    pub fn parse(metric: &str, expression: &str) -> Result<Self, ThresholdError> {
        let compact: String = expression.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.is_empty() {
            return Err(ThresholdError::Empty);
        }

        let op_start = compact
            .find(['<', '>', '='])
            .ok_or_else(|| ThresholdError::MissingOperator(expression.to_string()))?;
        let (token, rest) = compact.split_at(op_start);

        let (comparison, bound) = [
            ("<=", Comparison::Le),
            (">=", Comparison::Ge),
            ("==", Comparison::Eq),
            ("<", Comparison::Lt),
            (">", Comparison::Gt),
        ]
        .into_iter()
        .find_map(|(op, cmp)| rest.strip_prefix(op).map(|bound| (cmp, bound)))
        .ok_or_else(|| ThresholdError::MissingOperator(expression.to_string()))?;

        let aggregation = Aggregation::parse(token, expression)?;
        let bound = bound
            .parse::<f64>()
            .ok()
            .filter(|b| b.is_finite())
            .ok_or_else(|| ThresholdError::InvalidBound(expression.to_string()))?;

        Ok(Self {
            metric: metric.to_string(),
            aggregation,
            comparison,
            bound,
        })
    }

    /// Judge an observed aggregate. No observation means there was nothing
    /// to measure, which passes.
    pub fn evaluate(&self, observed: Option<f64>) -> ThresholdResult {
        let passed = observed.map_or(true, |value| self.comparison.holds(value, self.bound));
        ThresholdResult {
            metric: self.metric.clone(),
            expression: self.to_string(),
            observed,
            passed,
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.aggregation, self.comparison, self.bound)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdResult {
    pub metric: String,
    pub expression: String,
    /// Observed aggregate in milliseconds
    pub observed: Option<f64>,
    pub passed: bool,
}
