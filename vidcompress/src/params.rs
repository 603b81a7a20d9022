//! Target dimension, bitrate and rotation resolution.
//!
//! Unset options are derived from the probed source: dimensions round up
//! to a table of standard sizes and the bitrate comes from a tier lookup.
//! Rotation is then split between container metadata and the rendered
//! frame according to what the platform can do.

use crate::options::CompressionOptions;
use tracing::debug;
use vidcompress_containers::VideoMetadata;
use vidcompress_core::error::{Error, Result};
use vidcompress_core::format::Rotation;
use vidcompress_hwaccel::DevicePlatform;

/// Standard output widths, ascending.
pub const STANDARD_WIDTHS: [u32; 10] = [320, 352, 480, 640, 768, 800, 854, 1024, 1152, 1280];

/// Standard output heights, ascending.
pub const STANDARD_HEIGHTS: [u32; 15] = [
    200, 288, 320, 360, 480, 576, 600, 720, 768, 800, 854, 864, 900, 960, 1024,
];

/// Bitrate for targets outside every tier.
pub const DEFAULT_BITRATE: u32 = 4_000_000;

/// Smallest table entry `>= value`, or the largest entry when `value`
/// exceeds the table.
pub fn round_to_standard(value: u32, table: &[u32]) -> u32 {
    table
        .iter()
        .copied()
        .find(|&size| size >= value)
        .or_else(|| table.last().copied())
        .unwrap_or(value)
}

/// Standard width for a source width.
pub fn resolve_width(width: u32) -> u32 {
    round_to_standard(width, &STANDARD_WIDTHS)
}

/// Standard height for a source height.
pub fn resolve_height(height: u32) -> u32 {
    round_to_standard(height, &STANDARD_HEIGHTS)
}

/// Tiered bitrate for a target resolution.
///
/// A tier matches when either dimension matches it; higher tiers win.
pub fn bitrate_for(width: u32, height: u32) -> u32 {
    match (width, height) {
        (1920, _) | (_, 1080) => 7_500_000,
        (1280, _) | (_, 720) => 5_500_000,
        (640, _) | (_, 480) => 1_500_000,
        (320, _) | (_, 240) => 400_000,
        _ => DEFAULT_BITRATE,
    }
}

/// Output geometry after rotation handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Orientation {
    /// Output width.
    pub width: u32,
    /// Output height.
    pub height: u32,
    /// Rotation written to the destination container.
    pub container_rotation: Rotation,
    /// Rotation applied to each rendered frame.
    pub render_rotation: Rotation,
}

/// Split the source rotation between container metadata and rendering.
///
/// - Platforms without surface input keep container rotation, except for
///   portrait targets that differ from the source in both dimensions:
///   those are rendered landscape and tagged 90 degrees.
/// - Platforms that render rotation bake quarter and half turns into the
///   frames and write no container rotation; quarter turns swap the
///   output dimensions.
/// - Anything in between keeps the container rotation untouched.
pub fn normalize_rotation(
    source: (u32, u32),
    target: (u32, u32),
    rotation: Rotation,
    platform: &DevicePlatform,
) -> Orientation {
    let (source_width, source_height) = source;
    let (width, height) = target;
    let unchanged = Orientation {
        width,
        height,
        container_rotation: rotation,
        render_rotation: Rotation::Deg0,
    };

    if !platform.supports_surface_input() {
        if height > width && width != source_width && height != source_height {
            return Orientation {
                width: height,
                height: width,
                container_rotation: Rotation::Deg90,
                render_rotation: Rotation::Deg270,
            };
        }
        return unchanged;
    }
    if !platform.renders_rotation() {
        return unchanged;
    }

    let (width, height, render_rotation) = match rotation {
        Rotation::Deg0 => (width, height, Rotation::Deg0),
        Rotation::Deg90 => (height, width, Rotation::Deg270),
        Rotation::Deg180 => (width, height, Rotation::Deg180),
        Rotation::Deg270 => (height, width, Rotation::Deg90),
    };
    Orientation {
        width,
        height,
        container_rotation: Rotation::Deg0,
        render_rotation,
    }
}

/// Everything a job decided before touching the source samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedParameters {
    /// Output width.
    pub width: u32,
    /// Output height.
    pub height: u32,
    /// Encoder bitrate.
    pub bitrate: u32,
    /// Rotation written to the destination container.
    pub container_rotation: Rotation,
    /// Rotation applied to rendered frames.
    pub render_rotation: Rotation,
    /// Whether the video track is re-encoded rather than copied.
    pub transcode: bool,
}

impl ResolvedParameters {
    /// Resolve the output parameters for `source` on `platform`.
    pub fn resolve(
        options: &CompressionOptions,
        source: &VideoMetadata,
        platform: &DevicePlatform,
    ) -> Result<Self> {
        let width = options.width.unwrap_or_else(|| resolve_width(source.width));
        let height = options.height.unwrap_or_else(|| resolve_height(source.height));
        if width == 0 || height == 0 {
            return Err(Error::invalid_param(format!(
                "target resolution {width}x{height} is empty"
            )));
        }
        let bitrate = options.bitrate.unwrap_or_else(|| bitrate_for(width, height));

        let orientation = normalize_rotation(
            (source.width, source.height),
            (width, height),
            source.rotation,
            platform,
        );
        let transcode =
            orientation.width != source.width || orientation.height != source.height;

        debug!(
            source_width = source.width,
            source_height = source.height,
            width = orientation.width,
            height = orientation.height,
            bitrate,
            container_rotation = orientation.container_rotation.degrees(),
            render_rotation = orientation.render_rotation.degrees(),
            transcode,
            "Resolved parameters"
        );

        Ok(Self {
            width: orientation.width,
            height: orientation.height,
            bitrate,
            container_rotation: orientation.container_rotation,
            render_rotation: orientation.render_rotation,
            transcode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(width: u32, height: u32, rotation: Rotation) -> VideoMetadata {
        VideoMetadata {
            width,
            height,
            rotation,
            duration_us: 1_000_000,
        }
    }

    fn platform(os_version: u32) -> DevicePlatform {
        DevicePlatform::new("google", "pixel", os_version)
    }

    #[test]
    fn test_round_up_to_standard() {
        assert_eq!(resolve_width(700), 768);
        assert_eq!(resolve_width(1280), 1280);
        assert_eq!(resolve_width(1), 320);
        assert_eq!(resolve_width(1920), 1280);
        assert_eq!(resolve_height(1080), 1024);
        assert_eq!(resolve_height(721), 768);
    }

    #[test]
    fn test_bitrate_tiers() {
        assert_eq!(bitrate_for(1280, 720), 5_500_000);
        assert_eq!(bitrate_for(320, 240), 400_000);
        assert_eq!(bitrate_for(500, 500), DEFAULT_BITRATE);
        assert_eq!(bitrate_for(1920, 1080), 7_500_000);
        assert_eq!(bitrate_for(640, 720), 5_500_000);
        assert_eq!(bitrate_for(854, 480), 1_500_000);
    }

    #[test]
    fn test_quarter_turn_on_rendering_platform() {
        let orientation = normalize_rotation((1280, 720), (1280, 720), Rotation::Deg90, &platform(21));
        assert_eq!((orientation.width, orientation.height), (720, 1280));
        assert_eq!(orientation.container_rotation, Rotation::Deg0);
        assert_eq!(orientation.render_rotation, Rotation::Deg270);

        let orientation = normalize_rotation((1280, 720), (1280, 720), Rotation::Deg270, &platform(23));
        assert_eq!((orientation.width, orientation.height), (720, 1280));
        assert_eq!(orientation.render_rotation, Rotation::Deg90);
    }

    #[test]
    fn test_half_turn_keeps_dimensions() {
        let orientation = normalize_rotation((640, 480), (640, 480), Rotation::Deg180, &platform(21));
        assert_eq!((orientation.width, orientation.height), (640, 480));
        assert_eq!(orientation.container_rotation, Rotation::Deg0);
        assert_eq!(orientation.render_rotation, Rotation::Deg180);
    }

    #[test]
    fn test_metadata_rotation_on_older_platforms() {
        let orientation = normalize_rotation((1280, 720), (1280, 720), Rotation::Deg90, &platform(19));
        assert_eq!((orientation.width, orientation.height), (1280, 720));
        assert_eq!(orientation.container_rotation, Rotation::Deg90);
        assert_eq!(orientation.render_rotation, Rotation::Deg0);
    }

    #[test]
    fn test_portrait_target_before_surface_input() {
        let orientation = normalize_rotation((1000, 1000), (480, 800), Rotation::Deg0, &platform(17));
        assert_eq!((orientation.width, orientation.height), (800, 480));
        assert_eq!(orientation.container_rotation, Rotation::Deg90);
        assert_eq!(orientation.render_rotation, Rotation::Deg270);

        let orientation = normalize_rotation((480, 1000), (480, 800), Rotation::Deg0, &platform(17));
        assert_eq!((orientation.width, orientation.height), (480, 800));
        assert_eq!(orientation.container_rotation, Rotation::Deg0);
    }

    #[test]
    fn test_resolve_defaults() {
        let params = ResolvedParameters::resolve(
            &CompressionOptions::new(),
            &metadata(1270, 700, Rotation::Deg0),
            &platform(21),
        )
        .unwrap();
        assert_eq!((params.width, params.height), (1280, 720));
        assert_eq!(params.bitrate, 5_500_000);
        assert!(params.transcode);
    }

    #[test]
    fn test_same_dimensions_copy() {
        let params = ResolvedParameters::resolve(
            &CompressionOptions::new(),
            &metadata(640, 480, Rotation::Deg0),
            &platform(21),
        )
        .unwrap();
        assert!(!params.transcode);
        assert_eq!(params.bitrate, 1_500_000);
    }

    #[test]
    fn test_bitrate_uses_pre_rotation_target() {
        let params = ResolvedParameters::resolve(
            &CompressionOptions::new(),
            &metadata(1280, 720, Rotation::Deg90),
            &platform(21),
        )
        .unwrap();
        assert_eq!((params.width, params.height), (720, 1280));
        assert_eq!(params.bitrate, 5_500_000);
        assert!(params.transcode);
    }

    #[test]
    fn test_explicit_options_win() {
        let params = ResolvedParameters::resolve(
            &CompressionOptions::new().resolution(100, 50).bitrate(123_000),
            &metadata(1280, 720, Rotation::Deg0),
            &platform(21),
        )
        .unwrap();
        assert_eq!((params.width, params.height, params.bitrate), (100, 50, 123_000));
    }

    #[test]
    fn test_zero_target_rejected() {
        let options = CompressionOptions {
            width: Some(0),
            ..Default::default()
        };
        let err = ResolvedParameters::resolve(&options, &metadata(640, 480, Rotation::Deg0), &platform(21))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }
}
