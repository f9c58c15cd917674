//! Quality tier classification by average jitter

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl QualityTier {
    pub fn label(&self) -> &'static str {
        match self {
            QualityTier::Excellent => "excellent",
            QualityTier::Good => "good",
            QualityTier::Fair => "fair",
            QualityTier::Poor => "poor",
        }
    }

    /// 0 for excellent up to 3 for poor
    pub fn severity_rank(&self) -> u8 {
        match self {
            QualityTier::Excellent => 0,
            QualityTier::Good => 1,
            QualityTier::Fair => 2,
            QualityTier::Poor => 3,
        }
    }
}

impl std::fmt::Display for QualityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// (exclusive upper bound in ms, tier), ascending; last band is the catch-all
const QUALITY_BANDS: [(f64, QualityTier); 4] = [
    (5.0, QualityTier::Excellent),
    (15.0, QualityTier::Good),
    (30.0, QualityTier::Fair),
    (f64::INFINITY, QualityTier::Poor),
];

pub fn classify(avg_jitter_ms: f64) -> QualityTier {
    QUALITY_BANDS
        .iter()
        .find(|(upper, _)| avg_jitter_ms < *upper)
        .map(|(_, tier)| *tier)
        .unwrap_or(QualityTier::Poor)
}
