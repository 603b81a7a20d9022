//! Track format descriptors and color formats.

use serde::{Deserialize, Serialize};
use std::fmt;

/// MIME prefix identifying audio tracks.
pub const AUDIO_MIME_PREFIX: &str = "audio/";
/// MIME prefix identifying video tracks.
pub const VIDEO_MIME_PREFIX: &str = "video/";
/// H.264/AVC MIME type.
pub const MIME_VIDEO_AVC: &str = "video/avc";

/// Pixel layout accepted by an encoder.
///
/// The numeric codes are the ones codec drivers advertise in their
/// capability lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorFormat {
    /// Planar YUV 4:2:0 (I420).
    Yuv420Planar,
    /// Packed planar YUV 4:2:0.
    Yuv420PackedPlanar,
    /// Semi-planar YUV 4:2:0 (NV12).
    Yuv420SemiPlanar,
    /// Packed semi-planar YUV 4:2:0.
    Yuv420PackedSemiPlanar,
    /// TI vendor packed semi-planar YUV 4:2:0.
    TiYuv420PackedSemiPlanar,
    /// Opaque GPU surface input.
    Surface,
    /// Any code this library does not recognize.
    Other(i32),
}

impl ColorFormat {
    /// Map an advertised capability code to a color format.
    pub fn from_code(code: i32) -> Self {
        match code {
            19 => Self::Yuv420Planar,
            20 => Self::Yuv420PackedPlanar,
            21 => Self::Yuv420SemiPlanar,
            39 => Self::Yuv420PackedSemiPlanar,
            0x7f00_0100 => Self::TiYuv420PackedSemiPlanar,
            0x7f00_0789 => Self::Surface,
            other => Self::Other(other),
        }
    }

    /// Capability code for this color format.
    pub fn code(&self) -> i32 {
        match self {
            Self::Yuv420Planar => 19,
            Self::Yuv420PackedPlanar => 20,
            Self::Yuv420SemiPlanar => 21,
            Self::Yuv420PackedSemiPlanar => 39,
            Self::TiYuv420PackedSemiPlanar => 0x7f00_0100,
            Self::Surface => 0x7f00_0789,
            Self::Other(code) => *code,
        }
    }

    /// Whether U and V live in separate planes.
    pub fn is_planar(&self) -> bool {
        matches!(self, Self::Yuv420Planar | Self::Yuv420PackedPlanar)
    }

    /// Whether U and V are interleaved in one plane.
    pub fn is_semi_planar(&self) -> bool {
        matches!(
            self,
            Self::Yuv420SemiPlanar | Self::Yuv420PackedSemiPlanar | Self::TiYuv420PackedSemiPlanar
        )
    }
}

impl fmt::Display for ColorFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yuv420Planar => write!(f, "YUV420Planar"),
            Self::Yuv420PackedPlanar => write!(f, "YUV420PackedPlanar"),
            Self::Yuv420SemiPlanar => write!(f, "YUV420SemiPlanar"),
            Self::Yuv420PackedSemiPlanar => write!(f, "YUV420PackedSemiPlanar"),
            Self::TiYuv420PackedSemiPlanar => write!(f, "TI_YUV420PackedSemiPlanar"),
            Self::Surface => write!(f, "Surface"),
            Self::Other(code) => write!(f, "ColorFormat({code})"),
        }
    }
}

/// Clockwise rotation in quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    /// No rotation.
    #[default]
    Deg0,
    /// 90 degrees clockwise.
    Deg90,
    /// 180 degrees.
    Deg180,
    /// 270 degrees clockwise.
    Deg270,
}

impl Rotation {
    /// Parse a rotation in degrees. Only multiples of 90 are accepted;
    /// negative values and full turns are normalized.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(Self::Deg0),
            90 => Some(Self::Deg90),
            180 => Some(Self::Deg180),
            270 => Some(Self::Deg270),
            _ => None,
        }
    }

    /// Rotation in degrees.
    pub fn degrees(&self) -> u32 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    /// Whether this rotation exchanges width and height.
    pub fn swaps_dimensions(&self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}

/// Codec format descriptor for one track.
///
/// Demuxers fill in what the container declares; encoders report what they
/// actually produce. Unset fields are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MediaFormat {
    /// MIME type, e.g. `video/avc` or `audio/mp4a-latm`.
    pub mime: String,
    /// Width in pixels (video).
    pub width: Option<u32>,
    /// Height in pixels (video).
    pub height: Option<u32>,
    /// Display rotation declared by the container (video).
    pub rotation: Option<Rotation>,
    /// Largest sample the track contains, in bytes.
    pub max_input_size: Option<usize>,
    /// Track duration in microseconds.
    pub duration_us: Option<i64>,
    /// Target bitrate in bits per second (encoder formats).
    pub bitrate: Option<u32>,
    /// Frame-rate hint (encoder formats).
    pub frame_rate: Option<u32>,
    /// Seconds between keyframes (encoder formats).
    pub i_frame_interval: Option<u32>,
    /// Input pixel layout (encoder formats).
    pub color_format: Option<ColorFormat>,
    /// Row stride of raw input buffers.
    pub stride: Option<u32>,
    /// Rows per plane of raw input buffers.
    pub slice_height: Option<u32>,
    /// Sample rate in Hz (audio).
    pub sample_rate: Option<u32>,
    /// Channel count (audio).
    pub channel_count: Option<u32>,
    /// First codec-specific data blob (SPS for AVC).
    pub csd0: Option<Vec<u8>>,
    /// Second codec-specific data blob (PPS for AVC).
    pub csd1: Option<Vec<u8>>,
}

impl MediaFormat {
    /// Create a format with only the MIME type set.
    pub fn new(mime: impl Into<String>) -> Self {
        Self {
            mime: mime.into(),
            ..Default::default()
        }
    }

    /// Create a video format.
    pub fn video(mime: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            mime: mime.into(),
            width: Some(width),
            height: Some(height),
            ..Default::default()
        }
    }

    /// Create an audio format.
    pub fn audio(mime: impl Into<String>, sample_rate: u32, channel_count: u32) -> Self {
        Self {
            mime: mime.into(),
            sample_rate: Some(sample_rate),
            channel_count: Some(channel_count),
            ..Default::default()
        }
    }

    /// Set the maximum input size.
    #[must_use]
    pub fn with_max_input_size(mut self, size: usize) -> Self {
        self.max_input_size = Some(size);
        self
    }

    /// Set the duration.
    #[must_use]
    pub fn with_duration_us(mut self, duration_us: i64) -> Self {
        self.duration_us = Some(duration_us);
        self
    }

    /// Set both codec-specific data blobs.
    #[must_use]
    pub fn with_parameter_sets(mut self, csd0: Vec<u8>, csd1: Vec<u8>) -> Self {
        self.csd0 = Some(csd0);
        self.csd1 = Some(csd1);
        self
    }

    /// Check if the MIME type denotes audio.
    pub fn is_audio(&self) -> bool {
        self.mime.starts_with(AUDIO_MIME_PREFIX)
    }

    /// Check if the MIME type denotes video.
    pub fn is_video(&self) -> bool {
        self.mime.starts_with(VIDEO_MIME_PREFIX)
    }
}

/// One elementary stream inside a container.
///
/// The index is assigned when the track is registered and never changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    index: usize,
    is_audio: bool,
    format: MediaFormat,
}

impl Track {
    /// Create a track.
    pub fn new(index: usize, is_audio: bool, format: MediaFormat) -> Self {
        Self {
            index,
            is_audio,
            format,
        }
    }

    /// Index within the owning container.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Whether this is the audio track.
    pub fn is_audio(&self) -> bool {
        self.is_audio
    }

    /// Codec format of the track.
    pub fn format(&self) -> &MediaFormat {
        &self.format
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_format_codes() {
        for format in [
            ColorFormat::Yuv420Planar,
            ColorFormat::Yuv420PackedPlanar,
            ColorFormat::Yuv420SemiPlanar,
            ColorFormat::Yuv420PackedSemiPlanar,
            ColorFormat::TiYuv420PackedSemiPlanar,
            ColorFormat::Surface,
        ] {
            assert_eq!(ColorFormat::from_code(format.code()), format);
        }
        assert_eq!(ColorFormat::from_code(7), ColorFormat::Other(7));
    }

    #[test]
    fn test_color_format_layout() {
        assert!(ColorFormat::Yuv420Planar.is_planar());
        assert!(ColorFormat::TiYuv420PackedSemiPlanar.is_semi_planar());
        assert!(!ColorFormat::Surface.is_planar());
        assert!(!ColorFormat::Surface.is_semi_planar());
    }

    #[test]
    fn test_rotation_parse() {
        assert_eq!(Rotation::from_degrees(90), Some(Rotation::Deg90));
        assert_eq!(Rotation::from_degrees(-90), Some(Rotation::Deg270));
        assert_eq!(Rotation::from_degrees(360), Some(Rotation::Deg0));
        assert_eq!(Rotation::from_degrees(45), None);
        assert!(Rotation::Deg270.swaps_dimensions());
        assert!(!Rotation::Deg180.swaps_dimensions());
    }

    #[test]
    fn test_media_kind() {
        assert!(MediaFormat::new("audio/mp4a-latm").is_audio());
        assert!(MediaFormat::video(MIME_VIDEO_AVC, 640, 480).is_video());
        assert!(!MediaFormat::new("text/vtt").is_video());
    }

    #[test]
    fn test_track_accessors() {
        let track = Track::new(1, true, MediaFormat::audio("audio/mp4a-latm", 44_100, 2));
        assert_eq!(track.index(), 1);
        assert!(track.is_audio());
        assert_eq!(track.format().sample_rate, Some(44_100));
    }
}
