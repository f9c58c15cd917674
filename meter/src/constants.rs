//! Measurement defaults and analysis thresholds

/// Measured probes per run
pub const DEFAULT_SAMPLE_COUNT: u32 = 50;

/// Discarded probes that prime DNS and connection caches
pub const DEFAULT_WARMUP_COUNT: u32 = 5;

/// Delay between measured probes (milliseconds)
pub const DEFAULT_INTERVAL_MS: u64 = 100;

/// Per-probe deadline (milliseconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Upper bound on the sample buffer reserved up front
pub const MAX_PREALLOCATED_SAMPLES: usize = 1024;

/// RFC 3550 jitter gain: J += (|D| - J) / 16
pub const RTP_JITTER_DIVISOR: f64 = 16.0;

/// MOS model: 4.5 - 0.05 * jitter - 2 * loss, clamped to [1, 5]
pub const MOS_BASE: f64 = 4.5;
pub const MOS_JITTER_WEIGHT: f64 = 0.05;
pub const MOS_LOSS_WEIGHT: f64 = 2.0;
pub const MOS_MIN: f64 = 1.0;
pub const MOS_MAX: f64 = 5.0;

/// Path requested by the image-load probe strategy
pub const IMAGE_PROBE_PATH: &str = "favicon.ico";

/// Maximum-jitter thresholds used by the guidance rules (milliseconds)
pub const WIRED_ACTION_MAX_JITTER_MS: f64 = 1000.0;
pub const QOS_ACTION_MAX_JITTER_MS: f64 = 500.0;
pub const LOSSLESS_INFEASIBLE_MAX_JITTER_MS: f64 = 2000.0;
pub const WIRED_RECOMMENDATION_MAX_JITTER_MS: f64 = 200.0;

/// Packet loss ratio above which drop-outs are expected
pub const DROPOUT_LOSS_RATIO: f64 = 0.02;

/// Average jitter above which hi-res playback risks buffer underruns
pub const UNDERRUN_AVG_JITTER_MS: f64 = 150.0;

/// Audio buffer sizing: max(max_jitter * 1.5, 50) ms
pub const BUFFER_JITTER_FACTOR: f64 = 1.5;
pub const MIN_AUDIO_BUFFER_MS: f64 = 50.0;

/// Memory assumed when grading the playback hardware (MB)
pub const BASELINE_MEMORY_MB: u32 = 2048;
