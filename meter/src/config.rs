//! Measurement configuration

use crate::constants::*;
use crate::error::MeterError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MeasurementConfig {
    #[serde(default = "default_sample_count")]
    pub sample_count: u32,
    #[serde(default = "default_warmup_count")]
    pub warmup_count: u32,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_smoothing_divisor")]
    pub smoothing_divisor: f64,
}

fn default_sample_count() -> u32 {
    DEFAULT_SAMPLE_COUNT
}

fn default_warmup_count() -> u32 {
    DEFAULT_WARMUP_COUNT
}

fn default_interval_ms() -> u64 {
    DEFAULT_INTERVAL_MS
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_smoothing_divisor() -> f64 {
    RTP_JITTER_DIVISOR
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        Self {
            sample_count: DEFAULT_SAMPLE_COUNT,
            warmup_count: DEFAULT_WARMUP_COUNT,
            interval_ms: DEFAULT_INTERVAL_MS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            smoothing_divisor: RTP_JITTER_DIVISOR,
        }
    }
}

impl MeasurementConfig {
    pub fn validate(&self) -> Result<(), MeterError> {
        if self.sample_count == 0 {
            return Err(MeterError::ZeroSampleCount);
        }
        if self.timeout_ms == 0 {
            return Err(MeterError::ZeroTimeout);
        }
        if !self.smoothing_divisor.is_finite() || self.smoothing_divisor < 1.0 {
            return Err(MeterError::InvalidSmoothingDivisor(self.smoothing_divisor));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}
