//! Vendor quirks for raw-buffer encoder input.
//!
//! Encoder drivers disagree on where the chroma planes start and whether U
//! and V are swapped. The rules are keyed by a small set of processor
//! families derived from the encoder name and live in static tables.

use crate::platform::DevicePlatform;
use std::fmt;

/// Chipset family of an encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessorFamily {
    /// Qualcomm.
    Qcom,
    /// Intel.
    Intel,
    /// MediaTek.
    Mtk,
    /// Samsung Exynos.
    Sec,
    /// Texas Instruments OMAP.
    Ti,
    /// Anything else.
    Other,
}

impl ProcessorFamily {
    /// Classify an encoder by name.
    pub fn from_codec_name(name: &str) -> Self {
        FAMILY_PATTERNS
            .iter()
            .find(|(pattern, _)| pattern.matches(name))
            .map(|(_, family)| *family)
            .unwrap_or(ProcessorFamily::Other)
    }

    /// Quirk entry for this family.
    pub fn quirk(&self) -> &'static VendorQuirk {
        QUIRKS
            .iter()
            .find(|q| q.family == *self)
            .unwrap_or(&OTHER_QUIRK)
    }
}

impl fmt::Display for ProcessorFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessorFamily::Qcom => "qcom",
            ProcessorFamily::Intel => "intel",
            ProcessorFamily::Mtk => "mtk",
            ProcessorFamily::Sec => "sec",
            ProcessorFamily::Ti => "ti",
            ProcessorFamily::Other => "other",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy)]
enum NamePattern {
    Contains(&'static str),
    Exact(&'static str),
}

impl NamePattern {
    fn matches(&self, name: &str) -> bool {
        match self {
            NamePattern::Contains(fragment) => name.contains(fragment),
            NamePattern::Exact(expected) => name == *expected,
        }
    }
}

const FAMILY_PATTERNS: &[(NamePattern, ProcessorFamily)] = &[
    (NamePattern::Contains("OMX.qcom."), ProcessorFamily::Qcom),
    (NamePattern::Contains("OMX.Intel."), ProcessorFamily::Intel),
    (NamePattern::Exact("OMX.MTK.VIDEO.ENCODER.AVC"), ProcessorFamily::Mtk),
    (NamePattern::Exact("OMX.SEC.AVC.Encoder"), ProcessorFamily::Sec),
    (NamePattern::Exact("OMX.TI.DUCATI1.VIDEO.H264E"), ProcessorFamily::Ti),
];

/// How the raw input buffer grows beyond `width * height * 3 / 2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaddingRule {
    /// No padding.
    None,
    /// Align the height up to 16 rows when it is not aligned; the padded
    /// luma rows plus their chroma share (5/4) are added to the buffer.
    AlignHeight,
    /// Always add `16 - height % 16` rows, a full 16 when already aligned.
    StepHeight,
    /// Round the chroma plane offset up to a 2048-byte boundary.
    AlignChromaOffset,
}

/// Which manufacturers a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManufacturerFilter {
    /// Every manufacturer.
    Any,
    /// Only the listed manufacturers.
    Only(&'static [&'static str]),
    /// All but the listed manufacturers.
    Except(&'static [&'static str]),
}

impl ManufacturerFilter {
    fn accepts(&self, manufacturer: &str) -> bool {
        match self {
            ManufacturerFilter::Any => true,
            ManufacturerFilter::Only(list) => list.contains(&manufacturer),
            ManufacturerFilter::Except(list) => !list.contains(&manufacturer),
        }
    }
}

/// When U and V must be swapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChromaSwapRule {
    /// Never.
    Never,
    /// Always.
    Always,
    /// On one OS version for the listed manufacturers.
    OnOsVersion {
        /// OS API level.
        os_version: u32,
        /// Affected manufacturers.
        manufacturers: &'static [&'static str],
    },
}

/// Quirks of one processor family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VendorQuirk {
    /// Family the entry describes.
    pub family: ProcessorFamily,
    /// Buffer padding rule.
    pub padding: PaddingRule,
    /// Manufacturers the padding rule applies to.
    pub padding_applies_to: ManufacturerFilter,
    /// Chroma swap rule.
    pub chroma_swap: ChromaSwapRule,
}

const OTHER_QUIRK: VendorQuirk = VendorQuirk {
    family: ProcessorFamily::Other,
    padding: PaddingRule::AlignHeight,
    padding_applies_to: ManufacturerFilter::Any,
    chroma_swap: ChromaSwapRule::Never,
};

/// Per-family quirks.
pub static QUIRKS: &[VendorQuirk] = &[
    VendorQuirk {
        family: ProcessorFamily::Qcom,
        padding: PaddingRule::AlignChromaOffset,
        padding_applies_to: ManufacturerFilter::Except(&["lge"]),
        chroma_swap: ChromaSwapRule::OnOsVersion {
            os_version: 16,
            manufacturers: &["lge", "nokia"],
        },
    },
    VendorQuirk {
        family: ProcessorFamily::Intel,
        padding: PaddingRule::None,
        padding_applies_to: ManufacturerFilter::Any,
        chroma_swap: ChromaSwapRule::Never,
    },
    VendorQuirk {
        family: ProcessorFamily::Mtk,
        padding: PaddingRule::StepHeight,
        padding_applies_to: ManufacturerFilter::Only(&["baidu"]),
        chroma_swap: ChromaSwapRule::Never,
    },
    VendorQuirk {
        family: ProcessorFamily::Sec,
        padding: PaddingRule::None,
        padding_applies_to: ManufacturerFilter::Any,
        chroma_swap: ChromaSwapRule::Always,
    },
    VendorQuirk {
        family: ProcessorFamily::Ti,
        padding: PaddingRule::None,
        padding_applies_to: ManufacturerFilter::Any,
        chroma_swap: ChromaSwapRule::Never,
    },
    OTHER_QUIRK,
];

/// Raw input buffer geometry for one target size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferLayout {
    /// Height after alignment.
    pub aligned_height: u32,
    /// Extra bytes between the luma and chroma planes.
    pub padding: usize,
    /// Bytes queued per frame.
    pub buffer_size: usize,
}

impl VendorQuirk {
    /// Whether U and V are swapped on `platform`.
    pub fn swaps_chroma(&self, platform: &DevicePlatform) -> bool {
        match self.chroma_swap {
            ChromaSwapRule::Never => false,
            ChromaSwapRule::Always => true,
            ChromaSwapRule::OnOsVersion {
                os_version,
                manufacturers,
            } => {
                platform.os_version == os_version
                    && manufacturers.contains(&platform.manufacturer().as_str())
            }
        }
    }

    /// Buffer geometry for a `width` x `height` frame on `platform`.
    pub fn layout(&self, width: u32, height: u32, platform: &DevicePlatform) -> BufferLayout {
        let w = width as usize;
        let h = height as usize;
        let mut layout = BufferLayout {
            aligned_height: height,
            padding: 0,
            buffer_size: w * h * 3 / 2,
        };
        if !self.padding_applies_to.accepts(&platform.manufacturer()) {
            return layout;
        }

        match self.padding {
            PaddingRule::None => {}
            PaddingRule::AlignHeight => {
                if height % 16 != 0 {
                    layout.aligned_height = height + (16 - height % 16);
                    layout.padding = w * (layout.aligned_height - height) as usize;
                    layout.buffer_size += layout.padding * 5 / 4;
                }
            }
            PaddingRule::StepHeight => {
                layout.aligned_height = height + (16 - height % 16);
                layout.padding = w * (layout.aligned_height - height) as usize;
                layout.buffer_size += layout.padding * 5 / 4;
            }
            PaddingRule::AlignChromaOffset => {
                let uv_offset = (w * h + 2047) & !2047;
                layout.padding = uv_offset - w * h;
                layout.buffer_size += layout.padding;
            }
        }
        layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn platform(manufacturer: &str, os_version: u32) -> DevicePlatform {
        DevicePlatform::new(manufacturer, "test", os_version)
    }

    #[test]
    fn test_family_from_name() {
        assert_eq!(
            ProcessorFamily::from_codec_name("OMX.qcom.video.encoder.avc"),
            ProcessorFamily::Qcom
        );
        assert_eq!(
            ProcessorFamily::from_codec_name("OMX.Intel.VideoEncoder.AVC"),
            ProcessorFamily::Intel
        );
        assert_eq!(
            ProcessorFamily::from_codec_name("OMX.MTK.VIDEO.ENCODER.AVC"),
            ProcessorFamily::Mtk
        );
        assert_eq!(ProcessorFamily::from_codec_name("OMX.SEC.AVC.Encoder"), ProcessorFamily::Sec);
        assert_eq!(
            ProcessorFamily::from_codec_name("OMX.TI.DUCATI1.VIDEO.H264E"),
            ProcessorFamily::Ti
        );
        assert_eq!(ProcessorFamily::from_codec_name("OMX.SEC.avc.enc"), ProcessorFamily::Other);
        assert_eq!(ProcessorFamily::from_codec_name("c2.android.avc.encoder"), ProcessorFamily::Other);
    }

    #[test]
    fn test_every_family_has_an_entry() {
        for family in [
            ProcessorFamily::Qcom,
            ProcessorFamily::Intel,
            ProcessorFamily::Mtk,
            ProcessorFamily::Sec,
            ProcessorFamily::Ti,
            ProcessorFamily::Other,
        ] {
            assert_eq!(family.quirk().family, family);
        }
    }

    #[test]
    fn test_other_aligns_height() {
        let quirk = ProcessorFamily::Other.quirk();
        let layout = quirk.layout(640, 360, &platform("acme", 17));
        assert_eq!(layout.aligned_height, 368);
        assert_eq!(layout.padding, 640 * 8);
        assert_eq!(layout.buffer_size, 640 * 360 * 3 / 2 + 640 * 8 * 5 / 4);

        let aligned = quirk.layout(640, 480, &platform("acme", 17));
        assert_eq!(aligned.padding, 0);
        assert_eq!(aligned.buffer_size, 640 * 480 * 3 / 2);
    }

    #[test]
    fn test_qcom_aligns_chroma_offset() {
        let quirk = ProcessorFamily::Qcom.quirk();
        let layout = quirk.layout(640, 360, &platform("samsung", 17));
        // 230400 rounds up to 231424
        assert_eq!(layout.padding, 1024);
        assert_eq!(layout.buffer_size, 640 * 360 * 3 / 2 + 1024);
        assert_eq!(layout.aligned_height, 360);

        let lge = quirk.layout(640, 360, &platform("LGE", 17));
        assert_eq!(lge.padding, 0);
    }

    #[test]
    fn test_mtk_steps_height_for_baidu_only() {
        let quirk = ProcessorFamily::Mtk.quirk();
        let baidu = quirk.layout(640, 480, &platform("baidu", 17));
        assert_eq!(baidu.aligned_height, 496);
        assert_eq!(baidu.padding, 640 * 16);

        let other = quirk.layout(640, 360, &platform("acme", 17));
        assert_eq!(other.padding, 0);
    }

    #[test]
    fn test_no_padding_families() {
        for family in [ProcessorFamily::Ti, ProcessorFamily::Intel, ProcessorFamily::Sec] {
            let layout = family.quirk().layout(640, 360, &platform("acme", 17));
            assert_eq!(layout.padding, 0);
            assert_eq!(layout.buffer_size, 640 * 360 * 3 / 2);
        }
    }

    #[test]
    fn test_chroma_swap() {
        let qcom = ProcessorFamily::Qcom.quirk();
        assert!(qcom.swaps_chroma(&platform("lge", 16)));
        assert!(qcom.swaps_chroma(&platform("nokia", 16)));
        assert!(!qcom.swaps_chroma(&platform("lge", 17)));
        assert!(!qcom.swaps_chroma(&platform("samsung", 16)));
        assert!(ProcessorFamily::Sec.quirk().swaps_chroma(&platform("samsung", 17)));
        assert!(!ProcessorFamily::Other.quirk().swaps_chroma(&platform("lge", 16)));
    }
}
