//! Pipeline tuning.

use serde::{Deserialize, Serialize};
use vidcompress_core::error::{Error, Result};
use vidcompress_core::format::{MIME_VIDEO_AVC, VIDEO_MIME_PREFIX};

/// Encoder and polling parameters for the transcode loop.
///
/// Two device families ship with different frame-rate hints; both are
/// available as [`PipelineConfig::default`] and [`PipelineConfig::legacy`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Upper bound for a single codec poll, in microseconds.
    pub poll_timeout_us: i64,
    /// Frame-rate hint given to the encoder.
    pub frame_rate: u32,
    /// Seconds between keyframes.
    pub i_frame_interval: u32,
    /// Bitrate used when the requested bitrate is 0.
    pub fallback_bitrate: u32,
    /// Output MIME type.
    pub mime_type: String,
    /// Bytes added to the width to form the raw-buffer row stride.
    pub stride_padding: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            poll_timeout_us: 2500,
            frame_rate: 40,
            i_frame_interval: 10,
            fallback_bitrate: 921_600,
            mime_type: MIME_VIDEO_AVC.to_string(),
            stride_padding: 32,
        }
    }
}

impl PipelineConfig {
    /// Constants of the older pipeline variant.
    pub fn legacy() -> Self {
        Self {
            frame_rate: 25,
            ..Self::default()
        }
    }

    /// Set the poll timeout.
    #[must_use]
    pub fn with_poll_timeout_us(mut self, timeout_us: i64) -> Self {
        self.poll_timeout_us = timeout_us;
        self
    }

    /// Set the frame-rate hint.
    #[must_use]
    pub fn with_frame_rate(mut self, frame_rate: u32) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    /// Check that every field is usable.
    pub fn validate(&self) -> Result<()> {
        if self.poll_timeout_us < 0 {
            return Err(Error::Config(format!(
                "poll_timeout_us must not be negative, got {}",
                self.poll_timeout_us
            )));
        }
        if self.frame_rate == 0 {
            return Err(Error::Config("frame_rate must be positive".into()));
        }
        if self.fallback_bitrate == 0 {
            return Err(Error::Config("fallback_bitrate must be positive".into()));
        }
        if !self.mime_type.starts_with(VIDEO_MIME_PREFIX) {
            return Err(Error::Config(format!(
                "mime_type must be a video type, got {}",
                self.mime_type
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.poll_timeout_us, 2500);
        assert_eq!(config.frame_rate, 40);
        assert_eq!(config.i_frame_interval, 10);
        assert_eq!(config.fallback_bitrate, 921_600);
        assert_eq!(config.mime_type, "video/avc");
        assert_eq!(config.stride_padding, 32);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_legacy_frame_rate() {
        let legacy = PipelineConfig::legacy();
        assert_eq!(legacy.frame_rate, 25);
        assert_eq!(legacy.poll_timeout_us, PipelineConfig::default().poll_timeout_us);
    }

    #[test]
    fn test_validate() {
        assert!(PipelineConfig::default().with_frame_rate(0).validate().is_err());
        assert!(PipelineConfig::default()
            .with_poll_timeout_us(-1)
            .validate()
            .is_err());
        let audio = PipelineConfig {
            mime_type: "audio/mp4a-latm".into(),
            ..Default::default()
        };
        assert!(matches!(audio.validate(), Err(Error::Config(_))));
    }
}
