//! Streaming service catalog (measurement targets)

use crate::error::MeterError;
use serde::{Deserialize, Serialize};

/// How a round trip is timed against a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProbeStrategy {
    /// Metadata-only HEAD request; response visibility is not required
    OpaqueHead,

    /// Cache-busted resource fetch that completes on load or decode failure
    ImageLoad,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub id: String,
    pub display_name: String,
    pub tier_label: String,
    pub bitrate_label: String,
    pub probe_strategy: ProbeStrategy,
    /// First endpoint is the one probed
    pub endpoints: Vec<String>,
}

impl Target {
    pub fn new(
        id: &str,
        display_name: &str,
        tier_label: &str,
        bitrate_label: &str,
        probe_strategy: ProbeStrategy,
        endpoints: &[&str],
    ) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            tier_label: tier_label.to_string(),
            bitrate_label: bitrate_label.to_string(),
            probe_strategy,
            endpoints: endpoints.iter().map(|e| e.to_string()).collect(),
        }
    }

    pub fn validate(&self) -> Result<(), MeterError> {
        if self.endpoints.iter().all(|e| e.trim().is_empty()) {
            return Err(MeterError::NoEndpoints {
                target: self.id.clone(),
            });
        }
        Ok(())
    }

    /// Endpoint used for probing
    pub fn primary_endpoint(&self) -> Result<&str, MeterError> {
        self.endpoints
            .iter()
            .map(|e| e.trim())
            .find(|e| !e.is_empty())
            .ok_or_else(|| MeterError::NoEndpoints {
                target: self.id.clone(),
            })
    }

    /// 24-bit (hi-res) streams are sensitive to buffer underruns
    pub fn is_high_resolution(&self) -> bool {
        self.bitrate_label.contains("24bit")
    }

    /// Services whose CDNs benefit from a faster public resolver
    pub fn is_subscription_tier(&self) -> bool {
        self.display_name.contains("TIDAL") || self.display_name.contains("Spotify")
    }
}

/// Built-in streaming services
pub fn builtin_targets() -> Vec<Target> {
    vec![
        Target::new(
            "tidal",
            "TIDAL",
            "Master/MQA",
            "24bit/96kHz+",
            ProbeStrategy::ImageLoad,
            &["https://resources.tidal.com/images", "https://audio.tidal.com"],
        ),
        Target::new(
            "qobuz",
            "Qobuz",
            "Studio Premier",
            "24bit/192kHz",
            ProbeStrategy::ImageLoad,
            &["https://static.qobuz.com", "https://streaming.qobuz.com"],
        ),
        Target::new(
            "apple-music",
            "Apple Music",
            "Lossless/Hi-Res",
            "24bit/192kHz",
            ProbeStrategy::ImageLoad,
            &["https://audio-ssl.itunes.apple.com", "https://mvod.itunes.apple.com"],
        ),
        Target::new(
            "spotify",
            "Spotify",
            "Very High (320kbps)",
            "16bit/44.1kHz (Ogg)",
            ProbeStrategy::OpaqueHead,
            &["https://audio-fa.scdn.co", "https://i.scdn.co"],
        ),
        Target::new(
            "amazon-music",
            "Amazon Music HD",
            "HD/Ultra HD",
            "24bit/192kHz",
            ProbeStrategy::ImageLoad,
            &["https://music.amazon.com", "https://m.media-amazon.com"],
        ),
        Target::new(
            "youtube-music",
            "YouTube Music",
            "High (256kbps AAC)",
            "16bit/44.1kHz",
            ProbeStrategy::ImageLoad,
            &["https://music.youtube.com", "https://yt3.ggpht.com"],
        ),
    ]
}

/// Look up a target by id
pub fn find<'a>(targets: &'a [Target], id: &str) -> Result<&'a Target, MeterError> {
    targets
        .iter()
        .find(|t| t.id == id)
        .ok_or_else(|| MeterError::UnknownTarget(id.to_string()))
}
