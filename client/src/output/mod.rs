//! Console output and export

use crate::analysis::{BatchResult, DEFAULT_SAMPLE_RATE_KHZ, estimate_buffer_seconds};
use anyhow::{Context, Result};
use crossterm::style::{Color, Stylize};
use meter::guidance::Severity;
use meter::{GuidanceReport, HistoryRecord, ProbeStrategy, ProgressEvent, QualityTier, StatsRecord, Target, classify};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// How many history entries the listing shows
pub const HISTORY_LISTING_LIMIT: usize = 30;

pub struct OutputManager {
    use_colors: bool,
}

impl OutputManager {
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.use_colors {
            text.with(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn tier_badge(&self, tier: QualityTier) -> String {
        let color = match tier {
            QualityTier::Excellent => Color::Green,
            QualityTier::Good => Color::Yellow,
            QualityTier::Fair => Color::DarkYellow,
            QualityTier::Poor => Color::Red,
        };
        self.paint(tier.label(), color)
    }

    fn severity_badge(&self, severity: Severity) -> String {
        let color = match severity {
            Severity::Critical => Color::Red,
            Severity::High => Color::DarkYellow,
            Severity::Medium => Color::Yellow,
        };
        self.paint(&format!("[{}]", severity.label()), color)
    }

    pub fn catalog(&self, targets: &[Target]) {
        println!("{:<14} {:<18} {:<10} {:<26} Probe", "Id", "Service", "Tier", "Quality");
        for t in targets {
            let probe = match t.probe_strategy {
                ProbeStrategy::OpaqueHead => "head",
                ProbeStrategy::ImageLoad => "image",
            };
            println!("{:<14} {:<18} {:<10} {:<26} {}", t.id, t.display_name, t.tier_label, t.bitrate_label, probe);
        }
    }

    pub fn progress(&self, target: &Target, event: &ProgressEvent) {
        println!(
            "[{}] {} -> {} jitter {} ({}/{})",
            chrono::Local::now().format("%H:%M:%S"),
            target.display_name,
            format_ms(event.rtt_ms),
            format_ms(event.smoothed_jitter_ms),
            event.sample_index,
            event.total_samples
        );
    }

    pub fn result(&self, target: &Target, stats: &StatsRecord, cancelled: bool) {
        println!();
        if cancelled {
            println!("{}", self.paint("Cancelled, statistics cover the samples gathered so far", Color::DarkYellow));
        }
        println!("Result for {} ({}, {}): {}",
            target.display_name,
            target.tier_label,
            target.bitrate_label,
            self.tier_badge(classify(stats.avg_jitter))
        );
        println!("  Avg jitter    {}", format_ms(stats.avg_jitter));
        println!("  Max jitter    {}", format_ms(stats.max_jitter));
        println!("  Avg RTT       {}", format_ms(stats.avg_rtt));
        println!("  Std dev       {}", format_ms(stats.std_dev_rtt));
        println!("  Packet loss   {}", format_percent(stats.packet_loss_ratio));
        println!("  MOS estimate  {:.1}", stats.mos_estimate);
        if let Some(seconds) = estimate_buffer_seconds(stats.avg_jitter, DEFAULT_SAMPLE_RATE_KHZ) {
            println!("  Est. buffer   {:.1}s", seconds);
        }
    }

    pub fn guidance(&self, report: &GuidanceReport) {
        println!();
        if !report.warnings.is_empty() {
            println!("Warnings:");
            for warning in &report.warnings {
                println!("  {} {}", self.severity_badge(warning.severity), warning.message);
            }
        }

        if !report.immediate_actions.is_empty() {
            println!("Immediate actions:");
            for action in &report.immediate_actions {
                println!("  {} {}: {}", self.severity_badge(action.priority), action.action, action.rationale);
                if let Some(tip) = &action.tip {
                    println!("      tip: {}", tip);
                }
            }
        }

        println!("Network:");
        println!("  Status        {}", report.network.status.label());
        println!("  Connection    {}", report.network.connection);
        println!("  Wi-Fi         {}", report.network.wifi_tip);
        println!("  Advanced      {}", report.network.bufferbloat_tip);

        println!("System:");
        println!("  Environment   {}", report.system.os);
        println!("  Hardware      {}", report.system.hardware_grade.label());
        println!("  Audio buffer  {}ms", report.system.audio.buffer_ms);
        println!("  Driver        {}", report.system.audio.driver);
        println!("  Bit depth     {}", report.system.audio.bit_depth);
        for tip in &report.system.optimizations {
            println!("  - {}", tip);
        }

        println!("Player software:");
        for software in &report.software {
            println!("  {}: {}", software.name, software.reason);
        }
    }

    pub fn history(&self, records: &[HistoryRecord]) {
        if records.is_empty() {
            println!("No saved measurements.");
            return;
        }
        for record in records.iter().take(HISTORY_LISTING_LIMIT) {
            let when = chrono::DateTime::from_timestamp_millis(record.timestamp)
                .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| record.timestamp.to_string());
            let stats = record.stats();
            println!(
                "{} | {} | avg jitter {} | loss {} | MOS {:.1} {}",
                when,
                record.target_name,
                format_ms(stats.avg_jitter),
                format_percent(stats.packet_loss_ratio),
                stats.mos_estimate,
                self.tier_badge(classify(stats.avg_jitter))
            );
        }
    }

    /// Expects results already ranked
    pub fn batch_table(&self, results: &[BatchResult]) {
        println!();
        println!(
            "{:<18} {:>11} {:>11} {:<10} {:>11} {:>8}",
            "Service", "Avg jitter", "Max jitter", "Quality", "Avg RTT", "Loss"
        );
        for r in results {
            // Pad before colouring so escape codes don't skew the columns
            let quality = format!("{:<10}", r.quality.label());
            let quality = if self.use_colors {
                quality.replace(r.quality.label(), &self.tier_badge(r.quality))
            } else {
                quality
            };
            println!(
                "{:<18} {:>11} {:>11} {} {:>11} {:>8}",
                r.target_name,
                format_ms(r.stats.avg_jitter),
                format_ms(r.stats.max_jitter),
                quality,
                format_ms(r.stats.avg_rtt),
                format_percent(r.stats.packet_loss_ratio)
            );
        }
    }
}

pub fn format_ms(value: f64) -> String {
    if value.is_nan() {
        return "-".to_string();
    }
    format!("{:.1}ms", value)
}

pub fn format_percent(ratio: f64) -> String {
    if ratio.is_nan() {
        return "-".to_string();
    }
    format!("{:.1}%", ratio * 100.0)
}

/// `hifi-jitter-history-YYYY-MM-DD.<ext>` in `directory`
pub fn default_history_export_path(directory: &str, extension: &str) -> PathBuf {
    Path::new(directory).join(format!(
        "hifi-jitter-history-{}.{}",
        chrono::Local::now().format("%Y-%m-%d"),
        extension
    ))
}

/// `hifi-jitter-all-YYYY-MM-DDTHH-MM-SS.<ext>` in `directory`
pub fn default_batch_export_path(directory: &str, extension: &str) -> PathBuf {
    Path::new(directory).join(format!(
        "hifi-jitter-all-{}.{}",
        chrono::Local::now().format("%Y-%m-%dT%H-%M-%S"),
        extension
    ))
}

/// Pretty-printed JSON array
pub fn export_json<T: Serialize>(items: &[T], output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(items)?;
    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write {:?}", output_path))?;
    Ok(())
}

/// Export history records as CSV
pub fn export_history_csv(records: &[HistoryRecord], output_path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(output_path)
        .with_context(|| format!("Failed to create {:?}", output_path))?;

    writer.write_record([
        "timestamp",
        "target_id",
        "target_name",
        "avg_rtt",
        "avg_jitter",
        "max_jitter",
        "std_dev_rtt",
        "packet_loss_ratio",
        "mos_estimate",
    ])?;

    for r in records {
        writer.write_record(&[
            r.timestamp.to_string(),
            r.target_id.clone(),
            r.target_name.clone(),
            format!("{:.2}", r.avg_rtt),
            format!("{:.2}", r.avg_jitter),
            format!("{:.2}", r.max_jitter),
            format!("{:.2}", r.std_dev_rtt),
            format!("{:.4}", r.packet_loss_ratio),
            format!("{:.2}", r.mos_estimate),
        ])?;
    }

    writer.flush()?;

    Ok(())
}

/// Export batch results as CSV
pub fn export_batch_csv(results: &[BatchResult], output_path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(output_path)
        .with_context(|| format!("Failed to create {:?}", output_path))?;

    writer.write_record([
        "target_id",
        "target_name",
        "quality",
        "avg_rtt",
        "avg_jitter",
        "max_jitter",
        "std_dev_rtt",
        "packet_loss_ratio",
        "mos_estimate",
    ])?;

    for r in results {
        writer.write_record(&[
            r.target_id.clone(),
            r.target_name.clone(),
            r.quality.label().to_string(),
            format!("{:.2}", r.stats.avg_rtt),
            format!("{:.2}", r.stats.avg_jitter),
            format!("{:.2}", r.stats.max_jitter),
            format!("{:.2}", r.stats.std_dev_rtt),
            format!("{:.4}", r.stats.packet_loss_ratio),
            format!("{:.2}", r.stats.mos_estimate),
        ])?;
    }

    writer.flush()?;

    Ok(())
}
