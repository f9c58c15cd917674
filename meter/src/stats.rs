//! Jitter statistics
//!
//! Two jitter measures coexist here. The smoothed estimate follows RFC 3550
//! over every raw sample (timeouts included) and only feeds the MOS estimate.
//! `avg_jitter` / `max_jitter` are plain consecutive differences over the
//! samples that beat the timeout, and drive classification and guidance.

use crate::constants::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatsRecord {
    pub avg_rtt: f64,
    pub avg_jitter: f64,
    pub max_jitter: f64,
    pub std_dev_rtt: f64,
    /// Lost attempts over all attempts, in [0, 1]
    pub packet_loss_ratio: f64,
    /// Mean opinion score estimate, in [1, 5]
    pub mos_estimate: f64,
}

impl StatsRecord {
    /// Result of a run where no probe beat the timeout
    pub fn worst_case() -> Self {
        Self {
            avg_rtt: 0.0,
            avg_jitter: 0.0,
            max_jitter: 0.0,
            std_dev_rtt: 0.0,
            packet_loss_ratio: 1.0,
            mos_estimate: MOS_MIN,
        }
    }
}

/// One RFC 3550 smoothing step: J += (|D| - J) / divisor
pub fn smooth_jitter(previous: f64, diff: f64, divisor: f64) -> f64 {
    previous + (diff.abs() - previous) / divisor
}

pub fn estimate_mos(smoothed_jitter: f64, packet_loss_ratio: f64) -> f64 {
    let mos = MOS_BASE - smoothed_jitter * MOS_JITTER_WEIGHT - packet_loss_ratio * MOS_LOSS_WEIGHT;
    // NaN inputs land on the worst score instead of escaping the range
    if mos.is_nan() {
        return MOS_MIN;
    }
    mos.clamp(MOS_MIN, MOS_MAX)
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = mean(values);
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Reduce a run's raw samples into a stats record
///
/// `samples` holds every recorded attempt in order; values at or above
/// `timeout_ms` count as lost.
pub fn calculate_stats(samples: &[f64], timeout_ms: f64, smoothed_jitter: f64) -> StatsRecord {
    let valid: Vec<f64> = samples.iter().copied().filter(|&rtt| rtt < timeout_ms).collect();

    if valid.is_empty() {
        return StatsRecord::worst_case();
    }

    let diffs: Vec<f64> = valid.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
    let (avg_jitter, max_jitter) = if diffs.is_empty() {
        (0.0, 0.0)
    } else {
        (mean(&diffs), diffs.iter().copied().fold(0.0, f64::max))
    };

    let packet_loss_ratio = (samples.len() - valid.len()) as f64 / samples.len() as f64;

    StatsRecord {
        avg_rtt: mean(&valid),
        avg_jitter,
        max_jitter,
        std_dev_rtt: std_dev(&valid),
        packet_loss_ratio,
        mos_estimate: estimate_mos(smoothed_jitter, packet_loss_ratio),
    }
}
