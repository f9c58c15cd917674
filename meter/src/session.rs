//! Measurement runs
//!
//! A run walks Idle -> Warmup -> Sampling -> Completed with exactly one probe
//! in flight at a time. Cancellation is observed before every probe, while a
//! probe is in flight and during the inter-probe delay; a cancelled run still
//! returns stats over the samples gathered so far.

use crate::catalog::Target;
use crate::config::MeasurementConfig;
use crate::constants::MAX_PREALLOCATED_SAMPLES;
use crate::error::MeterError;
use crate::probe::{HttpProber, Prober};
use crate::stats::{StatsRecord, calculate_stats, smooth_jitter};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Emitted after every measured sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub rtt_ms: f64,
    pub smoothed_jitter_ms: f64,
    /// 1-based
    pub sample_index: u32,
    pub total_samples: u32,
}

/// Initial sample buffer size; larger runs grow as samples arrive
pub fn preallocated_samples(sample_count: u32) -> usize {
    (sample_count as usize).min(MAX_PREALLOCATED_SAMPLES)
}

/// Samples and running jitter of one run; never shared between runs
struct ProbeSession {
    samples: Vec<f64>,
    smoothed_jitter: f64,
    divisor: f64,
}

impl ProbeSession {
    fn new(sample_count: u32, divisor: f64) -> Self {
        Self {
            samples: Vec::with_capacity(preallocated_samples(sample_count)),
            smoothed_jitter: 0.0,
            divisor,
        }
    }

    /// Append a sample and return the updated smoothed jitter
    fn record(&mut self, rtt_ms: f64) -> f64 {
        if let Some(&previous) = self.samples.last() {
            self.smoothed_jitter = smooth_jitter(self.smoothed_jitter, rtt_ms - previous, self.divisor);
        }
        self.samples.push(rtt_ms);
        self.smoothed_jitter
    }

    fn finish(&self, timeout_ms: f64) -> StatsRecord {
        calculate_stats(&self.samples, timeout_ms, self.smoothed_jitter)
    }
}

/// Runs measurements against targets with a validated configuration
#[derive(Clone)]
pub struct JitterMeter {
    prober: Arc<dyn Prober>,
    config: MeasurementConfig,
}

impl JitterMeter {
    pub fn new(prober: Arc<dyn Prober>, config: MeasurementConfig) -> Result<Self, MeterError> {
        config.validate()?;
        Ok(Self { prober, config })
    }

    /// Meter backed by the HTTP prober
    pub fn with_http(config: MeasurementConfig) -> Result<Self, MeterError> {
        config.validate()?;
        let prober = HttpProber::new(config.timeout())?;
        Self::new(Arc::new(prober), config)
    }

    pub fn config(&self) -> &MeasurementConfig {
        &self.config
    }

    /// Run one measurement, calling `on_progress` synchronously after each
    /// measured sample
    pub async fn measure<F>(
        &self,
        target: &Target,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> Result<StatsRecord, MeterError>
    where
        F: FnMut(ProgressEvent),
    {
        target.validate()?;

        let total = self.config.sample_count;
        info!(
            "Measuring {} ({} warm-up, {} samples, {}ms interval)",
            target.display_name, self.config.warmup_count, total, self.config.interval_ms
        );

        let mut stopped_early = false;

        for i in 0..self.config.warmup_count {
            match self.probe_unless_cancelled(target, cancel).await {
                Some(rtt) => debug!("{} warm-up {} -> {:.2}ms (discarded)", target.id, i + 1, rtt),
                None => {
                    stopped_early = true;
                    break;
                }
            }
        }

        let mut session = ProbeSession::new(total, self.config.smoothing_divisor);

        for i in 0..total {
            if stopped_early {
                break;
            }
            let Some(rtt) = self.probe_unless_cancelled(target, cancel).await else {
                stopped_early = true;
                break;
            };

            let jitter = session.record(rtt);
            debug!("{} sample {}/{} -> {:.2}ms (jitter {:.2}ms)", target.id, i + 1, total, rtt, jitter);

            on_progress(ProgressEvent {
                rtt_ms: rtt,
                smoothed_jitter_ms: jitter,
                sample_index: i + 1,
                total_samples: total,
            });

            if i + 1 < total {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        stopped_early = true;
                        break;
                    }
                    _ = tokio::time::sleep(self.config.interval()) => {}
                }
            }
        }

        if stopped_early {
            warn!(
                "Measurement of {} cancelled after {}/{} samples",
                target.display_name,
                session.samples.len(),
                total
            );
        }

        let stats = session.finish(self.config.timeout_ms as f64);
        if stats.packet_loss_ratio >= 1.0 {
            warn!("{}: no probe completed within {}ms", target.display_name, self.config.timeout_ms);
        }
        info!(
            "{}: avg jitter {:.2}ms, max {:.2}ms, loss {:.1}%",
            target.display_name,
            stats.avg_jitter,
            stats.max_jitter,
            stats.packet_loss_ratio * 100.0
        );

        Ok(stats)
    }

    /// Run a measurement on a tokio task and expose its progress as a stream
    pub fn spawn(&self, target: Target, cancel: CancellationToken) -> MeasurementRun {
        let (tx, rx) = mpsc::unbounded_channel();
        let meter = self.clone();

        let handle = tokio::spawn(async move {
            meter
                .measure(&target, &cancel, |event| {
                    // Receiver gone means nobody is watching; keep measuring
                    let _ = tx.send(event);
                })
                .await
        });

        MeasurementRun {
            events: UnboundedReceiverStream::new(rx),
            handle,
        }
    }

    /// `None` if cancelled before or during the probe; an abandoned
    /// in-flight attempt is not recorded
    async fn probe_unless_cancelled(&self, target: &Target, cancel: &CancellationToken) -> Option<f64> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            rtt = self.prober.probe(target) => Some(rtt),
        }
    }
}

/// Handle to a spawned measurement
///
/// `events` yields each progress event once and ends when the run completes.
pub struct MeasurementRun {
    events: UnboundedReceiverStream<ProgressEvent>,
    handle: JoinHandle<Result<StatsRecord, MeterError>>,
}

impl MeasurementRun {
    pub fn events(&mut self) -> &mut UnboundedReceiverStream<ProgressEvent> {
        &mut self.events
    }

    /// Wait for the run to complete
    pub async fn finish(self) -> Result<StatsRecord, MeterError> {
        self.handle.await?
    }
}
