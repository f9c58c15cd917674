//! Result analysis for presentation

use meter::{QualityTier, StatsRecord, Target, classify};
use serde::Serialize;

/// Sample rate assumed for the playback buffer estimate
pub const DEFAULT_SAMPLE_RATE_KHZ: f64 = 96.0;

/// One target's outcome within a batch run
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub target_id: String,
    pub target_name: String,
    pub stats: StatsRecord,
    pub quality: QualityTier,
}

impl BatchResult {
    pub fn new(target: &Target, stats: StatsRecord) -> Self {
        Self {
            target_id: target.id.clone(),
            target_name: target.display_name.clone(),
            quality: classify(stats.avg_jitter),
            stats,
        }
    }
}

/// Order by average jitter, best first (NaN last)
pub fn rank_by_jitter(results: &mut [BatchResult]) {
    results.sort_by(|a, b| a.stats.avg_jitter.total_cmp(&b.stats.avg_jitter));
}

/// Playback buffer in seconds: max(avg_jitter * 2, 50) ms
pub fn estimate_buffer_seconds(avg_jitter_ms: f64, sample_rate_khz: f64) -> Option<f64> {
    if sample_rate_khz <= 0.0 {
        return None;
    }
    let buffer_ms = (avg_jitter_ms * 2.0).max(50.0);
    Some(buffer_ms / 1000.0)
}
