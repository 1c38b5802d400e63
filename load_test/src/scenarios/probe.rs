//! HTTP probe - one GET per iteration, classified by status code

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use tokio::time::Instant;

use crate::executor::{Iteration, IterationOutcome};

/// Statuses that count as a passing check: served, or explicitly rate limited.
pub const EXPECTED_STATUSES: [StatusCode; 2] = [StatusCode::OK, StatusCode::TOO_MANY_REQUESTS];

pub fn is_expected_status(status: StatusCode) -> bool {
    EXPECTED_STATUSES.contains(&status)
}

#[derive(Clone)]
pub struct HttpProbe {
    client: Client,
    url: Arc<str>,
}

impl HttpProbe {
    pub fn new(url: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("rate-probe/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            url: Arc::from(url.into()),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issue a single GET and classify the response. Transport errors are
    /// reported as a failed check, never retried.
    pub async fn probe(&self) -> IterationOutcome {
        let start = Instant::now();

        let status = match self.client.get(self.url.as_ref()).send().await {
            Ok(response) => {
                let status = response.status();
                // Drain the body so the connection goes back to the pool
                if let Err(e) = response.bytes().await {
                    tracing::debug!("Failed to read body from {}: {}", self.url, e);
                }
                Some(status)
            }
            Err(e) => {
                tracing::debug!("Request to {} failed: {}", self.url, e);
                None
            }
        };

        let latency = start.elapsed();
        if let Some(status) = status.filter(|s| !is_expected_status(*s)) {
            tracing::debug!("Unexpected status {} from {}", status, self.url);
        }

        IterationOutcome {
            latency,
            status: status.map(|s| s.as_u16()),
            check_passed: status.is_some_and(is_expected_status),
        }
    }
}

impl Iteration for HttpProbe {
    fn execute(&self) -> Pin<Box<dyn Future<Output = IterationOutcome> + Send>> {
        let probe = self.clone();
        Box::pin(async move { probe.probe().await })
    }
}
