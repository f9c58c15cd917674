//! Engine error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MeterError {
    #[error("sample_count must be greater than zero")]
    ZeroSampleCount,

    #[error("timeout_ms must be greater than zero")]
    ZeroTimeout,

    #[error("Invalid smoothing divisor: {0} (must be finite and >= 1)")]
    InvalidSmoothingDivisor(f64),

    #[error("Target {target} has no endpoints")]
    NoEndpoints { target: String },

    #[error("Unknown target: {0}")]
    UnknownTarget(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Measurement task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}
