//! AVC parameter-set extraction.

/// Four-byte Annex B start code.
pub const START_CODE: [u8; 4] = [0, 0, 0, 1];

/// Split an encoder codec-config buffer into its two parameter sets.
///
/// The buffer is scanned backward for the last `00 00 00 01` start code
/// that begins after offset 0. Everything before it is the first set (SPS),
/// everything from it on is the second (PPS); both keep their start codes.
/// Returns `None` when no such start code exists, in which case the track
/// is registered without parameter sets.
pub fn split_parameter_sets(csd: &[u8]) -> Option<(&[u8], &[u8])> {
    for a in (0..csd.len()).rev() {
        if a <= 3 {
            break;
        }
        if csd[a] == 1 && csd[a - 1] == 0 && csd[a - 2] == 0 && csd[a - 3] == 0 {
            return Some((&csd[..a - 3], &csd[a - 3..]));
        }
    }
    None
}
