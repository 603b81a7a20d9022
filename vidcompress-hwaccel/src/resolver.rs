//! Encoder and color format selection.

use crate::codec::{CodecCatalog, CodecInfo};
use crate::error::{HwAccelError, Result};
use crate::platform::DevicePlatform;
use crate::quirks::{BufferLayout, ProcessorFamily};
use std::sync::Arc;
use tracing::{debug, info};
use vidcompress_core::format::ColorFormat;

/// Encoder name skipped in favor of any other match.
const DEPRIORITIZED_ENCODER: &str = "OMX.SEC.avc.enc";

/// Encoder that only gets planar input as a last resort.
const PLANAR_LAST_RESORT_ENCODER: &str = "OMX.SEC.AVC.Encoder";

/// Raw-buffer color formats, most preferred first.
pub const COLOR_FORMAT_PREFERENCE: [ColorFormat; 5] = [
    ColorFormat::Yuv420Planar,
    ColorFormat::Yuv420PackedPlanar,
    ColorFormat::Yuv420SemiPlanar,
    ColorFormat::Yuv420PackedSemiPlanar,
    ColorFormat::TiYuv420PackedSemiPlanar,
];

/// Per-job encoder input layout.
///
/// Derived once before the pipeline starts and never re-evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceProfile {
    /// Encoder input color format.
    pub color_format: ColorFormat,
    /// Extra bytes between luma and chroma planes.
    pub buffer_padding: usize,
    /// Whether U and V are swapped.
    pub swap_chroma: bool,
    /// Chipset family of the encoder.
    pub processor: ProcessorFamily,
    /// Height after vendor alignment.
    pub aligned_height: u32,
    /// Bytes queued per raw frame.
    pub buffer_size: usize,
}

impl DeviceProfile {
    /// Profile for the GPU surface input path.
    pub fn surface(processor: ProcessorFamily, width: u32, height: u32) -> Self {
        Self {
            color_format: ColorFormat::Surface,
            buffer_padding: 0,
            swap_chroma: false,
            processor,
            aligned_height: height,
            buffer_size: width as usize * height as usize * 3 / 2,
        }
    }

    /// Whether frames reach the encoder through a GPU surface.
    pub fn uses_surface_input(&self) -> bool {
        self.color_format == ColorFormat::Surface
    }
}

/// The encoder chosen for a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEncoder {
    /// Encoder description.
    pub codec: CodecInfo,
    /// Input layout.
    pub profile: DeviceProfile,
}

/// Picks an encoder and input layout for the running device.
pub struct CapabilityResolver {
    catalog: Arc<dyn CodecCatalog>,
    platform: DevicePlatform,
}

impl CapabilityResolver {
    /// Create a resolver.
    pub fn new(catalog: Arc<dyn CodecCatalog>, platform: DevicePlatform) -> Self {
        Self { catalog, platform }
    }

    /// Device the resolver targets.
    pub fn platform(&self) -> &DevicePlatform {
        &self.platform
    }

    /// Choose an encoder for `mime` producing `width` x `height` frames.
    ///
    /// The surface input path wins when both the platform and the encoder
    /// support it; otherwise a raw-buffer color format is chosen and the
    /// vendor quirk table decides padding and chroma order.
    pub fn resolve(&self, mime: &str, width: u32, height: u32) -> Result<ResolvedEncoder> {
        let codecs = self.catalog.codecs();
        let codec =
            select_codec(&codecs, mime).ok_or_else(|| HwAccelError::NoEncoder(mime.to_string()))?;
        let processor = ProcessorFamily::from_codec_name(&codec.name);

        if self.platform.supports_surface_input() && codec.supports_surface_input() {
            info!(codec = %codec.name, "Using surface input");
            return Ok(ResolvedEncoder {
                profile: DeviceProfile::surface(processor, width, height),
                codec: codec.clone(),
            });
        }

        let color_format = select_color_format(codec).ok_or_else(|| HwAccelError::NoColorFormat {
            codec: codec.name.clone(),
        })?;
        let quirk = processor.quirk();
        let BufferLayout {
            aligned_height,
            padding,
            buffer_size,
        } = quirk.layout(width, height, &self.platform);
        let profile = DeviceProfile {
            color_format,
            buffer_padding: padding,
            swap_chroma: quirk.swaps_chroma(&self.platform),
            processor,
            aligned_height,
            buffer_size,
        };

        info!(
            codec = %codec.name,
            manufacturer = %self.platform.manufacturer,
            model = %self.platform.model,
            "Using raw buffer input"
        );
        debug!(
            color_format = %profile.color_format,
            processor = %profile.processor,
            padding = profile.buffer_padding,
            swap_chroma = profile.swap_chroma,
            buffer_size = profile.buffer_size,
            "Device profile"
        );

        Ok(ResolvedEncoder {
            codec: codec.clone(),
            profile,
        })
    }
}

/// First encoder handling `mime`, skipping the deprioritized encoder
/// unless it is the only match, in which case the last match wins.
pub fn select_codec<'a>(codecs: &'a [CodecInfo], mime: &str) -> Option<&'a CodecInfo> {
    let mut last = None;
    for codec in codecs.iter().filter(|c| c.is_encoder && c.supports_type(mime)) {
        if codec.name != DEPRIORITIZED_ENCODER {
            return Some(codec);
        }
        last = Some(codec);
    }
    last
}

/// Most preferred advertised raw-buffer color format.
pub fn select_color_format(codec: &CodecInfo) -> Option<ColorFormat> {
    let mut candidates = COLOR_FORMAT_PREFERENCE
        .iter()
        .filter(|f| codec.color_formats.contains(*f));

    if codec.name == PLANAR_LAST_RESORT_ENCODER {
        let available: Vec<ColorFormat> = candidates.copied().collect();
        return available
            .iter()
            .find(|f| **f != ColorFormat::Yuv420Planar)
            .or_else(|| available.first())
            .copied();
    }
    candidates.next().copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidcompress_core::format::MIME_VIDEO_AVC;

    #[test]
    fn test_select_codec_skips_decoders_and_other_types() {
        let codecs = vec![
            CodecInfo::decoder("OMX.dec", MIME_VIDEO_AVC),
            CodecInfo::encoder("OMX.hevc", "video/hevc", vec![ColorFormat::Surface]),
            CodecInfo::encoder("OMX.avc", "VIDEO/AVC", vec![ColorFormat::Surface]),
        ];
        assert_eq!(select_codec(&codecs, MIME_VIDEO_AVC).unwrap().name, "OMX.avc");
        assert!(select_codec(&codecs, "video/vp8").is_none());
    }

    #[test]
    fn test_select_codec_deprioritizes_sec_enc() {
        let sec = CodecInfo::encoder(DEPRIORITIZED_ENCODER, MIME_VIDEO_AVC, vec![]);
        let other = CodecInfo::encoder("OMX.other", MIME_VIDEO_AVC, vec![]);
        let codecs = vec![sec.clone(), other];
        assert_eq!(select_codec(&codecs, MIME_VIDEO_AVC).unwrap().name, "OMX.other");

        let only = vec![sec.clone(), sec];
        assert_eq!(
            select_codec(&only, MIME_VIDEO_AVC).unwrap().name,
            DEPRIORITIZED_ENCODER
        );
    }

    #[test]
    fn test_color_format_preference() {
        let codec = CodecInfo::encoder(
            "OMX.x",
            MIME_VIDEO_AVC,
            vec![
                ColorFormat::Other(2130706688),
                ColorFormat::Yuv420SemiPlanar,
                ColorFormat::Yuv420PackedPlanar,
            ],
        );
        assert_eq!(select_color_format(&codec), Some(ColorFormat::Yuv420PackedPlanar));

        let none = CodecInfo::encoder("OMX.x", MIME_VIDEO_AVC, vec![ColorFormat::Surface]);
        assert_eq!(select_color_format(&none), None);
    }

    #[test]
    fn test_sec_encoder_prefers_non_planar() {
        let codec = CodecInfo::encoder(
            PLANAR_LAST_RESORT_ENCODER,
            MIME_VIDEO_AVC,
            vec![ColorFormat::Yuv420Planar, ColorFormat::Yuv420SemiPlanar],
        );
        assert_eq!(select_color_format(&codec), Some(ColorFormat::Yuv420SemiPlanar));

        let planar_only = CodecInfo::encoder(
            PLANAR_LAST_RESORT_ENCODER,
            MIME_VIDEO_AVC,
            vec![ColorFormat::Yuv420Planar],
        );
        assert_eq!(select_color_format(&planar_only), Some(ColorFormat::Yuv420Planar));
    }

    #[test]
    fn test_device_profile_surface() {
        let profile = DeviceProfile::surface(ProcessorFamily::Other, 640, 360);
        assert!(profile.uses_surface_input());
        assert_eq!(profile.buffer_padding, 0);
        assert!(!profile.swap_chroma);
    }
}
