//! Compression options.

use vidcompress_core::error::{Error, Result};
use vidcompress_pipeline::TimeWindow;

/// Per-job options using builder pattern.
///
/// Every field is optional. Unset dimensions and bitrate are derived from
/// the source; an unset window covers the whole source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompressionOptions {
    /// Output width.
    pub width: Option<u32>,
    /// Output height.
    pub height: Option<u32>,
    /// Target bitrate in bits per second.
    pub bitrate: Option<u32>,
    /// First timestamp to keep, in microseconds.
    pub start_us: Option<i64>,
    /// First timestamp to drop, in microseconds.
    pub end_us: Option<i64>,
}

impl CompressionOptions {
    /// Create empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set output width.
    #[must_use]
    pub fn width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    /// Set output height.
    #[must_use]
    pub fn height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    /// Set output resolution.
    #[must_use]
    pub fn resolution(self, width: u32, height: u32) -> Self {
        self.width(width).height(height)
    }

    /// Set target bitrate.
    #[must_use]
    pub fn bitrate(mut self, bitrate: u32) -> Self {
        self.bitrate = Some(bitrate);
        self
    }

    /// Keep samples from `start_us` on.
    #[must_use]
    pub fn start_us(mut self, start_us: i64) -> Self {
        self.start_us = Some(start_us);
        self
    }

    /// Drop samples from `end_us` on.
    #[must_use]
    pub fn end_us(mut self, end_us: i64) -> Self {
        self.end_us = Some(end_us);
        self
    }

    /// Trim window before clamping to the source duration.
    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start_us.unwrap_or(0), self.end_us)
    }

    /// Validate the options.
    ///
    /// Dimensions and bitrate must be positive and window bounds must not
    /// be negative. A start at or after the end is allowed and yields an
    /// empty result.
    pub fn validate(&self) -> Result<()> {
        if self.width == Some(0) {
            return Err(Error::invalid_param("width must be positive"));
        }
        if self.height == Some(0) {
            return Err(Error::invalid_param("height must be positive"));
        }
        if self.bitrate == Some(0) {
            return Err(Error::invalid_param("bitrate must be positive"));
        }
        if let Some(start) = self.start_us.filter(|&start| start < 0) {
            return Err(Error::invalid_param(format!("start {start}us is negative")));
        }
        if let Some(end) = self.end_us.filter(|&end| end < 0) {
            return Err(Error::invalid_param(format!("end {end}us is negative")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let options = CompressionOptions::new()
            .resolution(640, 360)
            .bitrate(1_000_000)
            .start_us(1_000)
            .end_us(5_000);
        assert_eq!(options.width, Some(640));
        assert_eq!(options.height, Some(360));
        assert_eq!(options.bitrate, Some(1_000_000));
        assert_eq!(options.window(), TimeWindow::new(1_000, Some(5_000)));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_default_window_is_unbounded() {
        assert_eq!(CompressionOptions::new().window(), TimeWindow::unbounded());
    }

    #[test]
    fn test_rejects_non_positive_values() {
        for options in [
            CompressionOptions::new().width(0),
            CompressionOptions::new().height(0),
            CompressionOptions::new().bitrate(0),
            CompressionOptions::new().start_us(-1),
            CompressionOptions::new().end_us(-5),
        ] {
            assert!(matches!(
                options.validate(),
                Err(Error::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn test_inverted_window_is_valid() {
        let options = CompressionOptions::new().start_us(5_000).end_us(1_000);
        assert!(options.validate().is_ok());
        assert!(options.window().is_empty());
    }
}
