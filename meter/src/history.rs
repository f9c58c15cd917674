//! Persisted result shape
//!
//! The engine owns no storage; this is the record the client stores and
//! exports for each completed run.

use crate::catalog::Target;
use crate::stats::StatsRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
    pub target_id: String,
    pub target_name: String,
    pub avg_rtt: f64,
    pub avg_jitter: f64,
    pub max_jitter: f64,
    pub std_dev_rtt: f64,
    pub packet_loss_ratio: f64,
    pub mos_estimate: f64,
}

impl HistoryRecord {
    pub fn new(target: &Target, stats: &StatsRecord, timestamp: i64) -> Self {
        Self {
            timestamp,
            target_id: target.id.clone(),
            target_name: target.display_name.clone(),
            avg_rtt: stats.avg_rtt,
            avg_jitter: stats.avg_jitter,
            max_jitter: stats.max_jitter,
            std_dev_rtt: stats.std_dev_rtt,
            packet_loss_ratio: stats.packet_loss_ratio,
            mos_estimate: stats.mos_estimate,
        }
    }

    pub fn stats(&self) -> StatsRecord {
        StatsRecord {
            avg_rtt: self.avg_rtt,
            avg_jitter: self.avg_jitter,
            max_jitter: self.max_jitter,
            std_dev_rtt: self.std_dev_rtt,
            packet_loss_ratio: self.packet_loss_ratio,
            mos_estimate: self.mos_estimate,
        }
    }
}
