//! Rule-based remediation guidance
//!
//! Warnings and immediate actions come from one ordered rule table. Every
//! rule is evaluated once per report and rules never depend on each other,
//! so each predicate can be tested alone. The remaining sections are
//! derived directly from the stats.

use crate::catalog::Target;
use crate::constants::*;
use crate::stats::StatsRecord;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Warning {
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImmediateAction {
    pub priority: Severity,
    pub action: String,
    pub rationale: String,
    pub tip: Option<String>,
}

/// What a rule contributes when its predicate holds
#[derive(Debug, Clone, Copy)]
pub enum RuleEffect {
    Action {
        priority: Severity,
        action: &'static str,
        rationale: &'static str,
        tip: Option<&'static str>,
    },
    Warning {
        severity: Severity,
        message: &'static str,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct GuidanceRule {
    pub name: &'static str,
    pub applies: fn(&StatsRecord, &Target) -> bool,
    pub effect: RuleEffect,
}

fn needs_wired_connection(stats: &StatsRecord, _: &Target) -> bool {
    stats.max_jitter > WIRED_ACTION_MAX_JITTER_MS
}

fn needs_router_qos(stats: &StatsRecord, _: &Target) -> bool {
    stats.max_jitter > QOS_ACTION_MAX_JITTER_MS
}

fn needs_faster_dns(_: &StatsRecord, target: &Target) -> bool {
    target.is_subscription_tier()
}

fn lossless_infeasible(stats: &StatsRecord, _: &Target) -> bool {
    stats.max_jitter > LOSSLESS_INFEASIBLE_MAX_JITTER_MS
}

fn dropouts_likely(stats: &StatsRecord, _: &Target) -> bool {
    stats.packet_loss_ratio > DROPOUT_LOSS_RATIO
}

fn underrun_risk(stats: &StatsRecord, target: &Target) -> bool {
    stats.avg_jitter > UNDERRUN_AVG_JITTER_MS && target.is_high_resolution()
}

pub const RULES: &[GuidanceRule] = &[
    GuidanceRule {
        name: "wired-connection",
        applies: needs_wired_connection,
        effect: RuleEffect::Action {
            priority: Severity::Critical,
            action: "Switch from Wi-Fi to a wired connection",
            rationale: "Extreme jitter is characteristic of wireless links.",
            tip: Some("Can cut jitter by 50% or more"),
        },
    },
    GuidanceRule {
        name: "router-qos",
        applies: needs_router_qos,
        effect: RuleEffect::Action {
            priority: Severity::High,
            action: "Enable router QoS",
            rationale: "Audio packets need to be prioritised.",
            tip: Some("Turn on audio/streaming priority in the router settings"),
        },
    },
    GuidanceRule {
        name: "public-dns",
        applies: needs_faster_dns,
        effect: RuleEffect::Action {
            priority: Severity::Medium,
            action: "Optimise DNS",
            rationale: "Improves reach to the service's overseas CDN.",
            tip: Some("Cloudflare DNS (1.1.1.1) recommended"),
        },
    },
    GuidanceRule {
        name: "lossless-infeasible",
        applies: lossless_infeasible,
        effect: RuleEffect::Warning {
            severity: Severity::Critical,
            message: "Lossless streaming is practically impossible in the current environment.",
        },
    },
    GuidanceRule {
        name: "packet-loss",
        applies: dropouts_likely,
        effect: RuleEffect::Warning {
            severity: Severity::High,
            message: "Packet loss detected. Audio drop-outs may occur.",
        },
    },
    GuidanceRule {
        name: "hi-res-underrun",
        applies: underrun_risk,
        effect: RuleEffect::Warning {
            severity: Severity::Medium,
            message: "Hi-res playback is at risk of buffer underruns.",
        },
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NetworkStatus {
    Excellent,
    Good,
    NeedsImprovement,
}

impl NetworkStatus {
    pub fn from_avg_jitter(avg_jitter: f64) -> Self {
        if avg_jitter < 50.0 {
            NetworkStatus::Excellent
        } else if avg_jitter < 150.0 {
            NetworkStatus::Good
        } else {
            NetworkStatus::NeedsImprovement
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NetworkStatus::Excellent => "excellent",
            NetworkStatus::Good => "good",
            NetworkStatus::NeedsImprovement => "needs improvement",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkGuidance {
    pub status: NetworkStatus,
    pub connection: String,
    pub wifi_tip: String,
    pub bufferbloat_tip: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum HardwareGrade {
    Entry,
    Mobile,
    Desktop,
    Performance,
    DedicatedServer,
}

impl HardwareGrade {
    pub fn assess(max_jitter: f64, memory_mb: u32) -> Self {
        let memory_gb = memory_mb as f64 / 1024.0;
        if max_jitter < 50.0 && memory_gb <= 1.0 {
            HardwareGrade::Entry
        } else if max_jitter < 150.0 && memory_gb <= 2.0 {
            HardwareGrade::Mobile
        } else if max_jitter < 500.0 && memory_gb <= 4.0 {
            HardwareGrade::Desktop
        } else if max_jitter < 1000.0 && memory_gb <= 8.0 {
            HardwareGrade::Performance
        } else {
            HardwareGrade::DedicatedServer
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HardwareGrade::Entry => "Embedded/IoT",
            HardwareGrade::Mobile => "Mobile/low power",
            HardwareGrade::Desktop => "General desktop",
            HardwareGrade::Performance => "High-performance dedicated audio",
            HardwareGrade::DedicatedServer => "Dedicated buffering server required",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioSettings {
    pub driver: String,
    pub buffer_ms: u32,
    pub bit_depth: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemGuidance {
    pub estimated_cpu_load: f64,
    pub os: String,
    pub audio: AudioSettings,
    pub optimizations: Vec<String>,
    pub hardware_grade: HardwareGrade,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoftwareRecommendation {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuidanceReport {
    pub warnings: Vec<Warning>,
    pub immediate_actions: Vec<ImmediateAction>,
    pub network: NetworkGuidance,
    pub system: SystemGuidance,
    pub software: Vec<SoftwareRecommendation>,
}

/// Build the remediation report for one run
pub fn generate_guidance(stats: &StatsRecord, target: &Target) -> GuidanceReport {
    let mut warnings = Vec::new();
    let mut immediate_actions = Vec::new();

    for rule in RULES.iter().filter(|rule| (rule.applies)(stats, target)) {
        match rule.effect {
            RuleEffect::Action {
                priority,
                action,
                rationale,
                tip,
            } => immediate_actions.push(ImmediateAction {
                priority,
                action: action.to_string(),
                rationale: rationale.to_string(),
                tip: tip.map(str::to_string),
            }),
            RuleEffect::Warning { severity, message } => warnings.push(Warning {
                severity,
                message: message.to_string(),
            }),
        }
    }

    GuidanceReport {
        warnings,
        immediate_actions,
        network: network_guidance(stats),
        system: system_guidance(stats),
        software: software_recommendations(stats.avg_jitter),
    }
}

fn network_guidance(stats: &StatsRecord) -> NetworkGuidance {
    let connection = if stats.max_jitter > WIRED_RECOMMENDATION_MAX_JITTER_MS {
        "Wired Ethernet connection"
    } else {
        "Use the 5 GHz Wi-Fi band"
    };
    let wifi_tip = if stats.avg_rtt > 100.0 {
        "5 GHz required; pin the channel manually"
    } else {
        "Current band is fine"
    };

    NetworkGuidance {
        status: NetworkStatus::from_avg_jitter(stats.avg_jitter),
        connection: connection.to_string(),
        wifi_tip: wifi_tip.to_string(),
        bufferbloat_tip: "Fix bufferbloat with SQM (fq_codel) on the router".to_string(),
    }
}

/// Rough CPU headroom needed to absorb the measured jitter and loss
pub fn estimate_cpu_load(max_jitter: f64, packet_loss_ratio: f64) -> f64 {
    let mut load = 5.0;
    if max_jitter > 100.0 {
        load += 0.5;
    }
    if max_jitter > 500.0 {
        load += 1.0;
    }
    if max_jitter > 2000.0 {
        load += 2.0;
    }
    load + packet_loss_ratio * 100.0 * 2.0
}

/// max(max_jitter * 1.5, 50), rounded to whole milliseconds
pub fn recommended_buffer_ms(max_jitter: f64) -> u32 {
    (max_jitter * BUFFER_JITTER_FACTOR).max(MIN_AUDIO_BUFFER_MS).round() as u32
}

fn system_guidance(stats: &StatsRecord) -> SystemGuidance {
    let estimated_cpu_load = estimate_cpu_load(stats.max_jitter, stats.packet_loss_ratio);
    let os = if estimated_cpu_load > 10.0 {
        "Real-time kernel Linux"
    } else {
        "Windows/macOS in high-performance mode"
    };

    SystemGuidance {
        estimated_cpu_load,
        os: os.to_string(),
        audio: AudioSettings {
            driver: "ASIO or CoreAudio (dedicated driver)".to_string(),
            buffer_ms: recommended_buffer_ms(stats.max_jitter),
            bit_depth: "Fixed at 24-bit or higher".to_string(),
        },
        optimizations: vec![
            "Power management: always use high-performance mode".to_string(),
            "Disable USB selective suspend".to_string(),
            "Pause background apps and automatic updates".to_string(),
        ],
        hardware_grade: HardwareGrade::assess(stats.max_jitter, BASELINE_MEMORY_MB),
    }
}

fn software_recommendations(avg_jitter: f64) -> Vec<SoftwareRecommendation> {
    let picks: &[(&str, &str)] = if avg_jitter > 300.0 {
        &[
            ("Roon", "Strong network buffering and isolated playback"),
            ("Audirvana", "Memory playback minimises the impact of jitter"),
        ]
    } else if avg_jitter > 100.0 {
        &[("foobar2000 (WASAPI)", "Lightweight, low-latency audio path")]
    } else {
        &[("Official app", "Performs well enough in the current environment")]
    };

    picks
        .iter()
        .map(|(name, reason)| SoftwareRecommendation {
            name: name.to_string(),
            reason: reason.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ProbeStrategy, builtin_targets, find};

    fn stats(avg_jitter: f64, max_jitter: f64, loss: f64) -> StatsRecord {
        StatsRecord {
            avg_rtt: 40.0,
            avg_jitter,
            max_jitter,
            std_dev_rtt: 5.0,
            packet_loss_ratio: loss,
            mos_estimate: 4.0,
        }
    }

    fn plain_target() -> Target {
        Target::new(
            "plain",
            "Plain Radio",
            "Standard",
            "16bit/44.1kHz",
            ProbeStrategy::OpaqueHead,
            &["https://radio.example"],
        )
    }

    fn rule(name: &str) -> &'static GuidanceRule {
        RULES.iter().find(|r| r.name == name).unwrap()
    }

    #[test]
    fn test_extreme_jitter_scenario() {
        let report = generate_guidance(&stats(300.0, 2500.0, 0.01), &plain_target());

        let actions: Vec<_> = report.immediate_actions.iter().map(|a| (a.priority, a.action.as_str())).collect();
        assert_eq!(
            actions,
            vec![
                (Severity::Critical, "Switch from Wi-Fi to a wired connection"),
                (Severity::High, "Enable router QoS"),
            ]
        );
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].severity, Severity::Critical);
        assert!(report.warnings[0].message.contains("Lossless"));
    }

    #[test]
    fn test_quiet_network_has_no_warnings() {
        let report = generate_guidance(&stats(3.0, 10.0, 0.0), &plain_target());
        assert!(report.warnings.is_empty());
        assert!(report.immediate_actions.is_empty());
        assert_eq!(report.network.status, NetworkStatus::Excellent);
        assert_eq!(report.network.connection, "Use the 5 GHz Wi-Fi band");
        assert_eq!(report.system.audio.buffer_ms, 50);
        assert_eq!(report.software[0].name, "Official app");
    }

    #[test]
    fn test_rule_thresholds_are_strict() {
        let target = plain_target();
        assert!(!(rule("wired-connection").applies)(&stats(0.0, 1000.0, 0.0), &target));
        assert!((rule("wired-connection").applies)(&stats(0.0, 1000.1, 0.0), &target));
        assert!(!(rule("router-qos").applies)(&stats(0.0, 500.0, 0.0), &target));
        assert!(!(rule("lossless-infeasible").applies)(&stats(0.0, 2000.0, 0.0), &target));
        assert!(!(rule("packet-loss").applies)(&stats(0.0, 0.0, 0.02), &target));
        assert!((rule("packet-loss").applies)(&stats(0.0, 0.0, 0.03), &target));
    }

    #[test]
    fn test_dns_rule_matches_subscription_services() {
        let targets = builtin_targets();
        let quiet = stats(1.0, 2.0, 0.0);
        let dns = rule("public-dns");
        assert!((dns.applies)(&quiet, find(&targets, "tidal").unwrap()));
        assert!((dns.applies)(&quiet, find(&targets, "spotify").unwrap()));
        assert!(!(dns.applies)(&quiet, find(&targets, "qobuz").unwrap()));

        let report = generate_guidance(&quiet, find(&targets, "spotify").unwrap());
        assert_eq!(report.immediate_actions.len(), 1);
        assert_eq!(report.immediate_actions[0].priority, Severity::Medium);
        assert!(report.immediate_actions[0].tip.as_deref().unwrap().contains("1.1.1.1"));
    }

    #[test]
    fn test_underrun_warning_needs_hi_res_target() {
        let targets = builtin_targets();
        let jittery = stats(151.0, 180.0, 0.0);
        let underrun = rule("hi-res-underrun");
        assert!((underrun.applies)(&jittery, find(&targets, "qobuz").unwrap()));
        assert!(!(underrun.applies)(&jittery, find(&targets, "youtube-music").unwrap()));
        assert!(!(underrun.applies)(&stats(150.0, 180.0, 0.0), find(&targets, "qobuz").unwrap()));
    }

    #[test]
    fn test_warning_order_follows_table() {
        let targets = builtin_targets();
        let report = generate_guidance(&stats(400.0, 2500.0, 0.5), find(&targets, "qobuz").unwrap());
        let severities: Vec<_> = report.warnings.iter().map(|w| w.severity).collect();
        assert_eq!(severities, vec![Severity::Critical, Severity::High, Severity::Medium]);
    }

    #[test]
    fn test_network_guidance() {
        assert_eq!(NetworkStatus::from_avg_jitter(49.9), NetworkStatus::Excellent);
        assert_eq!(NetworkStatus::from_avg_jitter(50.0), NetworkStatus::Good);
        assert_eq!(NetworkStatus::from_avg_jitter(150.0), NetworkStatus::NeedsImprovement);

        let wired = generate_guidance(&stats(10.0, 200.1, 0.0), &plain_target());
        assert_eq!(wired.network.connection, "Wired Ethernet connection");

        let mut slow = stats(10.0, 20.0, 0.0);
        slow.avg_rtt = 150.0;
        let report = generate_guidance(&slow, &plain_target());
        assert!(report.network.wifi_tip.contains("pin the channel"));
        assert!(report.network.bufferbloat_tip.contains("fq_codel"));
    }

    #[test]
    fn test_system_guidance() {
        assert_eq!(recommended_buffer_ms(0.0), 50);
        assert_eq!(recommended_buffer_ms(33.0), 50);
        assert_eq!(recommended_buffer_ms(101.0), 152);
        assert_eq!(recommended_buffer_ms(2500.0), 3750);

        assert_eq!(estimate_cpu_load(0.0, 0.0), 5.0);
        assert_eq!(estimate_cpu_load(2500.0, 0.0), 8.5);
        assert!((estimate_cpu_load(600.0, 0.03) - 12.5).abs() < 1e-9);

        let calm = generate_guidance(&stats(10.0, 90.0, 0.0), &plain_target());
        assert!(calm.system.os.starts_with("Windows/macOS"));
        assert_eq!(calm.system.hardware_grade, HardwareGrade::Mobile);

        let stormy = generate_guidance(&stats(10.0, 600.0, 0.03), &plain_target());
        assert_eq!(stormy.system.os, "Real-time kernel Linux");
        assert_eq!(stormy.system.hardware_grade, HardwareGrade::Performance);
    }

    #[test]
    fn test_hardware_grades() {
        assert_eq!(HardwareGrade::assess(10.0, 1024), HardwareGrade::Entry);
        assert_eq!(HardwareGrade::assess(10.0, 2048), HardwareGrade::Mobile);
        assert_eq!(HardwareGrade::assess(300.0, 2048), HardwareGrade::Desktop);
        assert_eq!(HardwareGrade::assess(700.0, 8192), HardwareGrade::Performance);
        assert_eq!(HardwareGrade::assess(1000.0, 2048), HardwareGrade::DedicatedServer);
    }

    #[test]
    fn test_software_tiers() {
        let names = |avg: f64| -> Vec<String> {
            generate_guidance(&stats(avg, avg, 0.0), &plain_target())
                .software
                .into_iter()
                .map(|s| s.name)
                .collect()
        };
        assert_eq!(names(301.0), vec!["Roon", "Audirvana"]);
        assert_eq!(names(300.0), vec!["foobar2000 (WASAPI)"]);
        assert_eq!(names(100.0), vec!["Official app"]);
    }

    #[test]
    fn test_generation_is_idempotent() {
        let targets = builtin_targets();
        let input = stats(170.0, 1200.0, 0.05);
        let target = find(&targets, "tidal").unwrap();
        assert_eq!(generate_guidance(&input, target), generate_guidance(&input, target));
    }
}
