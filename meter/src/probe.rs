//! Timed round-trip probes
//!
//! A probe never fails: network errors and timeouts are still timed and the
//! elapsed milliseconds are returned. The stats engine treats anything at or
//! above the timeout as a lost packet.

use crate::catalog::{ProbeStrategy, Target};
use crate::constants::IMAGE_PROBE_PATH;
use crate::error::MeterError;
use async_trait::async_trait;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::Instant;
use tracing::{debug, warn};

/// Issues one timed round trip against a target
#[async_trait]
pub trait Prober: Send + Sync {
    /// Elapsed wall-clock milliseconds; never exceeds the deadline by more
    /// than scheduling noise
    async fn probe(&self, target: &Target) -> f64;
}

/// HTTP prober covering both probe strategies
pub struct HttpProber {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpProber {
    pub fn new(timeout: Duration) -> Result<Self, MeterError> {
        // Deadline is applied per attempt in `probe`
        let client = reqwest::Client::builder()
            .user_agent(concat!("hifi-jitter/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, timeout })
    }

    fn timeout_ms(&self) -> f64 {
        self.timeout.as_secs_f64() * 1000.0
    }

    async fn issue(&self, strategy: ProbeStrategy, endpoint: &str) -> Result<(), reqwest::Error> {
        match strategy {
            ProbeStrategy::OpaqueHead => {
                // Only arrival matters, status and headers are ignored
                self.client.head(endpoint).send().await?;
            }
            ProbeStrategy::ImageLoad => {
                let url = image_probe_url(endpoint, &cache_bust_token());
                let response = self.client.get(url).send().await?;
                // Drain the body so the round trip covers the full load
                response.bytes().await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, target: &Target) -> f64 {
        let endpoint = match target.primary_endpoint() {
            Ok(endpoint) => endpoint,
            Err(e) => {
                warn!("{}: {}", target.id, e);
                return self.timeout_ms();
            }
        };

        let start = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, self.issue(target.probe_strategy, endpoint)).await;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok(Ok(())) => {
                debug!("{} {:?} -> {:.2}ms", target.id, target.probe_strategy, elapsed_ms);
                elapsed_ms
            }
            Ok(Err(e)) => {
                debug!("{} {:?} -> error after {:.2}ms: {}", target.id, target.probe_strategy, elapsed_ms, e);
                elapsed_ms
            }
            Err(_) => {
                debug!("{} {:?} -> timeout after {:?}", target.id, target.probe_strategy, self.timeout);
                elapsed_ms.max(self.timeout_ms())
            }
        }
    }
}

/// Cache-busting resource URL for the image-load strategy
pub fn image_probe_url(endpoint: &str, token: &str) -> String {
    format!("{}/{}?t={}", endpoint.trim_end_matches('/'), IMAGE_PROBE_PATH, token)
}

/// Unix millis plus a random suffix, unique even for back-to-back probes
fn cache_bust_token() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();

    format!("{}-{:04x}", millis, rand::random::<u16>())
}
