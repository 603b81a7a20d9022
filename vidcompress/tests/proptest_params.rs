//! Property-based tests for output parameter resolution.

use proptest::prelude::*;
use vidcompress::{
    bitrate_for, normalize_rotation, resolve_height, resolve_width, DevicePlatform, Rotation,
    DEFAULT_BITRATE, STANDARD_HEIGHTS, STANDARD_WIDTHS,
};

fn rotation() -> impl Strategy<Value = Rotation> {
    prop_oneof![
        Just(Rotation::Deg0),
        Just(Rotation::Deg90),
        Just(Rotation::Deg180),
        Just(Rotation::Deg270),
    ]
}

proptest! {
    /// Larger sources never resolve to smaller widths or heights.
    #[test]
    fn resolution_is_monotonic(a in 0u32..4096, b in 0u32..4096) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(resolve_width(low) <= resolve_width(high));
        prop_assert!(resolve_height(low) <= resolve_height(high));
    }

    /// Resolved sizes come from the tables and cover the source when they can.
    #[test]
    fn resolution_rounds_up(value in 0u32..4096) {
        let width = resolve_width(value);
        prop_assert!(STANDARD_WIDTHS.contains(&width));
        prop_assert!(width >= value || width == STANDARD_WIDTHS[STANDARD_WIDTHS.len() - 1]);

        let height = resolve_height(value);
        prop_assert!(STANDARD_HEIGHTS.contains(&height));
        prop_assert!(height >= value || height == STANDARD_HEIGHTS[STANDARD_HEIGHTS.len() - 1]);
    }

    /// Bitrates are always one of the tiers.
    #[test]
    fn bitrate_is_a_tier(width in 0u32..4096, height in 0u32..4096) {
        let tiers = [7_500_000, 5_500_000, 1_500_000, 400_000, DEFAULT_BITRATE];
        prop_assert!(tiers.contains(&bitrate_for(width, height)));
    }

    /// Rendering platforms never write container rotation, and the output
    /// area never changes.
    #[test]
    fn rendering_platform_clears_container_rotation(
        width in 1u32..2000,
        height in 1u32..2000,
        rotation in rotation(),
        os_version in 21u32..30,
    ) {
        let platform = DevicePlatform::new("google", "pixel", os_version);
        let orientation = normalize_rotation((width, height), (width, height), rotation, &platform);
        prop_assert_eq!(orientation.container_rotation, Rotation::Deg0);
        prop_assert_eq!(orientation.width * orientation.height, width * height);
        prop_assert_eq!(
            orientation.width != width || orientation.height != height,
            rotation.swaps_dimensions() && width != height
        );
    }
}

#[test]
fn test_standard_sizes_resolve_to_themselves() {
    for width in STANDARD_WIDTHS {
        assert_eq!(resolve_width(width), width);
    }
    for height in STANDARD_HEIGHTS {
        assert_eq!(resolve_height(height), height);
    }
}
