//! Hi-Fi Jitter Meter engine
//!
//! Measurement-and-analysis core shared by the command line client.
//! This includes the service catalog, the HTTP prober, the RTP-style jitter
//! engine, the quality classifier and the rule-based guidance generator.

pub mod catalog;
pub mod config;
pub mod constants;
pub mod error;
pub mod guidance;
pub mod history;
pub mod probe;
pub mod quality;
pub mod session;
pub mod stats;

pub use catalog::{ProbeStrategy, Target};
pub use config::MeasurementConfig;
pub use error::MeterError;
pub use guidance::{GuidanceReport, generate_guidance};
pub use history::HistoryRecord;
pub use probe::{HttpProber, Prober};
pub use quality::{QualityTier, classify};
pub use session::{JitterMeter, MeasurementRun, ProgressEvent, preallocated_samples};
pub use stats::StatsRecord;

/// Re-exported so callers can cancel runs without depending on tokio-util
pub use tokio_util::sync::CancellationToken;
