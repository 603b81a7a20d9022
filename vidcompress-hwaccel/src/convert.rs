//! RGBA to YUV 4:2:0 conversion for raw-buffer encoders.

use crate::error::{HwAccelError, Result};
use vidcompress_core::format::ColorFormat;

/// Convert an RGBA frame into an encoder input buffer.
///
/// Layout:
/// - planar formats: Y plane, `padding` bytes, U plane, `padding / 4`
///   bytes, V plane
/// - semi-planar formats: Y plane, `padding` bytes, interleaved UV plane
///
/// `swap_chroma` exchanges U and V. Returns the number of bytes written.
pub fn convert_video_frame(
    rgba: &[u8],
    dest: &mut [u8],
    color_format: ColorFormat,
    width: u32,
    height: u32,
    padding: usize,
    swap_chroma: bool,
) -> Result<usize> {
    let w = width as usize;
    let h = height as usize;
    if rgba.len() < w * h * 4 {
        return Err(HwAccelError::Conversion(format!(
            "source holds {} bytes, {}x{} RGBA needs {}",
            rgba.len(),
            width,
            height,
            w * h * 4
        )));
    }

    let luma_size = w * h;
    let chroma_size = (w / 2) * (h / 2);
    let (u_offset, v_offset, needed) = if color_format.is_planar() {
        let u = luma_size + padding;
        let v = u + chroma_size + padding / 4;
        (u, v, v + chroma_size)
    } else if color_format.is_semi_planar() {
        let uv = luma_size + padding;
        (uv, uv + 1, uv + chroma_size * 2)
    } else {
        return Err(HwAccelError::Conversion(format!(
            "{color_format} is not a raw YUV 4:2:0 layout"
        )));
    };
    if dest.len() < needed {
        return Err(HwAccelError::Conversion(format!(
            "destination holds {} bytes, need {}",
            dest.len(),
            needed
        )));
    }
    let (u_offset, v_offset) = if swap_chroma {
        (v_offset, u_offset)
    } else {
        (u_offset, v_offset)
    };
    let chroma_step = if color_format.is_planar() { 1 } else { 2 };

    dest[luma_size..needed].fill(0);
    for y in 0..h {
        for x in 0..w {
            let idx = (y * w + x) * 4;
            let r = rgba[idx] as i32;
            let g = rgba[idx + 1] as i32;
            let b = rgba[idx + 2] as i32;

            // BT.601
            let y_val = ((66 * r + 129 * g + 25 * b + 128) >> 8) + 16;
            dest[y * w + x] = y_val.clamp(0, 255) as u8;

            if x % 2 == 0 && y % 2 == 0 && x / 2 < w / 2 && y / 2 < h / 2 {
                let c = ((y / 2) * (w / 2) + x / 2) * chroma_step;
                let u_val = ((-38 * r - 74 * g + 112 * b + 128) >> 8) + 128;
                let v_val = ((112 * r - 94 * g - 18 * b + 128) >> 8) + 128;
                dest[u_offset + c] = u_val.clamp(0, 255) as u8;
                dest[v_offset + c] = v_val.clamp(0, 255) as u8;
            }
        }
    }
    Ok(needed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: usize, height: usize, rgb: [u8; 3]) -> Vec<u8> {
        (0..width * height)
            .flat_map(|_| [rgb[0], rgb[1], rgb[2], 255])
            .collect()
    }

    #[test]
    fn test_planar_red() {
        let rgba = solid(4, 2, [255, 0, 0]);
        let mut dest = vec![0xEE; 12];
        let written =
            convert_video_frame(&rgba, &mut dest, ColorFormat::Yuv420Planar, 4, 2, 0, false).unwrap();
        assert_eq!(written, 12);
        assert!(dest[..8].iter().all(|&y| y == 82));
        assert_eq!(&dest[8..10], &[90, 90]);
        assert_eq!(&dest[10..12], &[240, 240]);
    }

    #[test]
    fn test_semi_planar_interleaves_and_swaps() {
        let rgba = solid(2, 2, [255, 0, 0]);
        let mut dest = vec![0; 6];
        convert_video_frame(&rgba, &mut dest, ColorFormat::Yuv420SemiPlanar, 2, 2, 0, false).unwrap();
        assert_eq!(&dest[4..6], &[90, 240]);

        convert_video_frame(&rgba, &mut dest, ColorFormat::Yuv420SemiPlanar, 2, 2, 0, true).unwrap();
        assert_eq!(&dest[4..6], &[240, 90]);
    }

    #[test]
    fn test_padding_moves_chroma() {
        let rgba = solid(2, 2, [0, 0, 255]);
        let mut dest = vec![0xEE; 4 + 8 + 1 + 2 + 1];
        let written =
            convert_video_frame(&rgba, &mut dest, ColorFormat::Yuv420PackedPlanar, 2, 2, 8, false)
                .unwrap();
        assert_eq!(written, 16);
        assert!(dest[4..12].iter().all(|&p| p == 0));
        assert_eq!(dest[12], 240);
        assert_eq!(dest[13], 0);
        assert_eq!(dest[15], 110);
    }

    #[test]
    fn test_rejects_surface_and_short_buffers() {
        let rgba = solid(2, 2, [0, 0, 0]);
        let mut dest = vec![0; 6];
        assert!(convert_video_frame(&rgba, &mut dest, ColorFormat::Surface, 2, 2, 0, false).is_err());
        assert!(convert_video_frame(&rgba, &mut dest[..5], ColorFormat::Yuv420Planar, 2, 2, 0, false)
            .is_err());
        assert!(convert_video_frame(&rgba[..8], &mut dest, ColorFormat::Yuv420Planar, 2, 2, 0, false)
            .is_err());
    }
}
