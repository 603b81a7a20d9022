//! Buffer metadata shared by demuxers, codecs and muxers.
//!
//! A [`SampleInfo`] describes one compressed or raw buffer. Pipeline stages
//! overwrite a single instance on every call instead of allocating new ones,
//! so nothing should hold on to it across iterations.

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Flags for buffer properties.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SampleFlags: u32 {
        /// The buffer contains a keyframe.
        const KEY_FRAME = 0x0001;
        /// Codec-specific configuration data, not media.
        const CODEC_CONFIG = 0x0002;
        /// Last buffer of the stream.
        const END_OF_STREAM = 0x0004;
    }
}

/// Size, position and timing of one buffer.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct SampleInfo {
    /// Number of valid bytes.
    pub size: usize,
    /// Start of the valid bytes within the buffer.
    pub offset: usize,
    /// Presentation timestamp in microseconds.
    pub presentation_time_us: i64,
    /// Buffer flags.
    pub flags: SampleFlags,
}

impl SampleInfo {
    /// Create sample info with the given fields.
    pub fn new(size: usize, offset: usize, presentation_time_us: i64, flags: SampleFlags) -> Self {
        Self {
            size,
            offset,
            presentation_time_us,
            flags,
        }
    }

    /// Overwrite every field in place.
    pub fn set(&mut self, size: usize, offset: usize, presentation_time_us: i64, flags: SampleFlags) {
        self.size = size;
        self.offset = offset;
        self.presentation_time_us = presentation_time_us;
        self.flags = flags;
    }

    /// Check if this is a keyframe.
    pub fn is_key_frame(&self) -> bool {
        self.flags.contains(SampleFlags::KEY_FRAME)
    }

    /// Check if this buffer carries codec configuration data.
    pub fn is_codec_config(&self) -> bool {
        self.flags.contains(SampleFlags::CODEC_CONFIG)
    }

    /// Check if this buffer ends the stream.
    pub fn is_end_of_stream(&self) -> bool {
        self.flags.contains(SampleFlags::END_OF_STREAM)
    }

    /// Byte range of the valid data.
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.size
    }
}

impl fmt::Debug for SampleInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleInfo")
            .field("size", &self.size)
            .field("offset", &self.offset)
            .field("pts_us", &self.presentation_time_us)
            .field("flags", &self.flags)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags() {
        let info = SampleInfo::new(10, 0, 0, SampleFlags::KEY_FRAME | SampleFlags::END_OF_STREAM);
        assert!(info.is_key_frame());
        assert!(info.is_end_of_stream());
        assert!(!info.is_codec_config());
    }

    #[test]
    fn test_set_overwrites() {
        let mut info = SampleInfo::new(10, 4, 1_000, SampleFlags::CODEC_CONFIG);
        info.set(20, 0, 2_000, SampleFlags::empty());
        assert_eq!(info.size, 20);
        assert_eq!(info.offset, 0);
        assert_eq!(info.presentation_time_us, 2_000);
        assert!(info.flags.is_empty());
    }

    #[test]
    fn test_range() {
        let info = SampleInfo::new(6, 2, 0, SampleFlags::empty());
        assert_eq!(info.range(), 2..8);
    }
}
