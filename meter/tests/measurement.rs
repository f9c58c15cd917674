//! Integration tests for warm-up -> sampling -> stats runs
//!
//! A scripted prober replaces the network so runs are deterministic under
//! tokio's paused clock.

use async_trait::async_trait;
use meter::{
    CancellationToken, JitterMeter, MeasurementConfig, MeterError, ProbeStrategy, Prober,
    ProgressEvent, StatsRecord, Target, classify, generate_guidance,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_stream::StreamExt;

/// Replays (delay, rtt) pairs; runs dry as timeouts
struct ScriptedProber {
    script: Mutex<VecDeque<(Duration, f64)>>,
    calls: AtomicUsize,
}

impl ScriptedProber {
    fn instant(rtts: &[f64]) -> Arc<Self> {
        Self::with_delays(rtts.iter().map(|&rtt| (Duration::ZERO, rtt)).collect())
    }

    fn with_delays(script: Vec<(Duration, f64)>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, _target: &Target) -> f64 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        let (delay, rtt) = next.unwrap_or((Duration::ZERO, 5000.0));
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        rtt
    }
}

fn test_target() -> Target {
    Target::new(
        "test",
        "Test Service",
        "Lossless",
        "24bit/96kHz",
        ProbeStrategy::OpaqueHead,
        &["http://127.0.0.1:9"],
    )
}

fn config(sample_count: u32, warmup_count: u32, interval_ms: u64) -> MeasurementConfig {
    MeasurementConfig {
        sample_count,
        warmup_count,
        interval_ms,
        timeout_ms: 5000,
        ..Default::default()
    }
}

fn meter(prober: &Arc<ScriptedProber>, config: MeasurementConfig) -> JitterMeter {
    JitterMeter::new(prober.clone(), config).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_warmup_samples_are_discarded() {
    let prober = ScriptedProber::instant(&[9000.0, 1.0, 100.0, 105.0, 95.0, 300.0, 90.0]);
    let meter = meter(&prober, config(5, 2, 100));

    let stats = meter
        .measure(&test_target(), &CancellationToken::new(), |_| {})
        .await
        .unwrap();

    assert_eq!(prober.calls(), 7);
    assert_eq!(stats.packet_loss_ratio, 0.0);
    assert!((stats.avg_jitter - 107.5).abs() < 1e-9);
    assert_eq!(stats.max_jitter, 210.0);
    assert!((stats.avg_rtt - 138.0).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn test_progress_events_per_sample() {
    let prober = ScriptedProber::instant(&[100.0, 132.0, 100.0]);
    let meter = meter(&prober, config(3, 0, 10));

    let mut events: Vec<ProgressEvent> = Vec::new();
    meter
        .measure(&test_target(), &CancellationToken::new(), |e| events.push(e))
        .await
        .unwrap();

    let indexes: Vec<u32> = events.iter().map(|e| e.sample_index).collect();
    assert_eq!(indexes, vec![1, 2, 3]);
    assert!(events.iter().all(|e| e.total_samples == 3));
    assert_eq!(events[0].smoothed_jitter_ms, 0.0);
    assert_eq!(events[1].smoothed_jitter_ms, 2.0);
    assert_eq!(events[2].rtt_ms, 100.0);
}

#[tokio::test(start_paused = true)]
async fn test_timeouts_count_as_loss() {
    let mut rtts = vec![40.0; 7];
    rtts.extend([5000.0, 5000.0, 5000.0]);
    let prober = ScriptedProber::instant(&rtts);
    let meter = meter(&prober, config(10, 0, 0));

    let stats = meter
        .measure(&test_target(), &CancellationToken::new(), |_| {})
        .await
        .unwrap();

    assert!((stats.packet_loss_ratio - 0.3).abs() < 1e-9);
    assert_eq!(stats.avg_rtt, 40.0);
}

#[tokio::test(start_paused = true)]
async fn test_all_lost_yields_worst_case() {
    let prober = ScriptedProber::instant(&[]);
    let meter = meter(&prober, config(4, 0, 0));

    let stats = meter
        .measure(&test_target(), &CancellationToken::new(), |_| {})
        .await
        .unwrap();

    assert_eq!(stats, StatsRecord::worst_case());
    assert_eq!(prober.calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_smoothed_jitter_converges_over_a_run() {
    let rtts: Vec<f64> = (0..400).map(|i| if i % 2 == 0 { 100.0 } else { 110.0 }).collect();
    let prober = ScriptedProber::instant(&rtts);
    let meter = meter(&prober, config(400, 0, 0));

    let mut last = None;
    let stats = meter
        .measure(&test_target(), &CancellationToken::new(), |e| last = Some(e))
        .await
        .unwrap();

    let last = last.unwrap();
    assert!((last.smoothed_jitter_ms - 10.0).abs() < 1e-6);
    assert!((stats.mos_estimate - 4.0).abs() < 1e-6);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_before_start_returns_empty_stats() {
    let prober = ScriptedProber::instant(&[10.0, 20.0]);
    let meter = meter(&prober, config(2, 3, 0));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let stats = meter.measure(&test_target(), &cancel, |_| {}).await.unwrap();

    assert_eq!(prober.calls(), 0);
    assert_eq!(stats, StatsRecord::worst_case());
}

#[tokio::test(start_paused = true)]
async fn test_huge_sample_count_does_not_reserve_up_front() {
    let prober = ScriptedProber::instant(&[]);
    let config = config(u32::MAX, 0, 0);
    config.validate().unwrap();
    let meter = meter(&prober, config);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let stats = meter.measure(&test_target(), &cancel, |_| {}).await.unwrap();

    assert_eq!(prober.calls(), 0);
    assert_eq!(stats, StatsRecord::worst_case());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_delay_keeps_gathered_samples() {
    let prober = ScriptedProber::instant(&[10.0, 20.0, 30.0, 40.0, 50.0]);
    let meter = meter(&prober, config(5, 0, 1000));
    let cancel = CancellationToken::new();

    let mut run = meter.spawn(test_target(), cancel.clone());
    let mut seen = 0;
    while let Some(event) = run.events().next().await {
        seen += 1;
        if event.sample_index == 3 {
            cancel.cancel();
        }
    }
    let stats = run.finish().await.unwrap();

    assert_eq!(seen, 3);
    assert_eq!(prober.calls(), 3);
    assert_eq!(stats.avg_rtt, 20.0);
    assert_eq!(stats.packet_loss_ratio, 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_abandons_in_flight_probe() {
    let prober = ScriptedProber::with_delays(vec![
        (Duration::from_millis(10), 10.0),
        (Duration::from_millis(10), 30.0),
        (Duration::from_secs(60), 4000.0),
    ]);
    let meter = meter(&prober, config(3, 0, 100));
    let cancel = CancellationToken::new();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        canceller.cancel();
    });

    let started = tokio::time::Instant::now();
    let stats = meter.measure(&test_target(), &cancel, |_| {}).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(prober.calls(), 3);
    // Abandoned third attempt is neither a sample nor a loss
    assert_eq!(stats.avg_rtt, 20.0);
    assert_eq!(stats.packet_loss_ratio, 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_event_stream_ends_with_run() {
    let prober = ScriptedProber::instant(&[12.0, 14.0, 11.0, 19.0]);
    let meter = meter(&prober, config(4, 1, 50));

    let mut run = meter.spawn(test_target(), CancellationToken::new());
    let events: Vec<ProgressEvent> = run.events().collect().await;
    let stats = run.finish().await.unwrap();

    assert_eq!(events.len(), 4);
    assert_eq!(events.last().unwrap().sample_index, 4);
    // 12 was the warm-up
    assert_eq!(events[0].rtt_ms, 14.0);
    assert!((stats.avg_rtt - (14.0 + 11.0 + 19.0) / 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_invalid_config_fails_fast() {
    let prober = ScriptedProber::instant(&[]);
    let zero_samples = MeasurementConfig {
        sample_count: 0,
        ..Default::default()
    };
    assert!(matches!(
        JitterMeter::new(prober.clone(), zero_samples),
        Err(MeterError::ZeroSampleCount)
    ));

    let zero_timeout = MeasurementConfig {
        timeout_ms: 0,
        ..Default::default()
    };
    assert!(matches!(
        JitterMeter::new(prober.clone(), zero_timeout),
        Err(MeterError::ZeroTimeout)
    ));
    assert_eq!(prober.calls(), 0);
}

#[tokio::test]
async fn test_target_without_endpoint_is_rejected() {
    let prober = ScriptedProber::instant(&[10.0]);
    let meter = meter(&prober, config(1, 0, 0));
    let target = Target::new("x", "X", "-", "-", ProbeStrategy::ImageLoad, &[]);

    let result = meter.measure(&target, &CancellationToken::new(), |_| {}).await;

    assert!(matches!(result, Err(MeterError::NoEndpoints { .. })));
    assert_eq!(prober.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_run_feeds_classifier_and_guidance() {
    let prober = ScriptedProber::instant(&[20.0, 24.0, 21.0, 25.0, 22.0]);
    let meter = meter(&prober, config(5, 0, 100));
    let target = test_target();

    let stats = meter
        .measure(&target, &CancellationToken::new(), |_| {})
        .await
        .unwrap();

    // diffs 4, 3, 4, 3
    assert_eq!(classify(stats.avg_jitter).label(), "excellent");
    let report = generate_guidance(&stats, &target);
    assert!(report.warnings.is_empty());
    assert_eq!(report.system.audio.buffer_ms, 50);
}
