//! Container collaborator traits for demuxing and muxing.

use std::path::Path;
use vidcompress_core::error::Result;
use vidcompress_core::format::{MediaFormat, Rotation};
use vidcompress_core::sample::{SampleFlags, SampleInfo};

/// Seek mode options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeekMode {
    /// Seek to the nearest sync point at or before the target (default).
    #[default]
    PreviousSync,
    /// Seek to the nearest sync point at or after the target.
    NextSync,
    /// Seek to whichever sync point is closest to the target.
    ClosestSync,
}

/// Source container reader.
///
/// Reading is cursor based: the demuxer points at one sample of the
/// selected track, which can be inspected, copied out and then skipped
/// with [`Demuxer::advance`]. At most one track is selected at a time.
pub trait Demuxer: Send {
    /// Number of tracks in the container.
    fn track_count(&self) -> usize;

    /// Format of the track at `index`.
    fn track_format(&self, index: usize) -> Result<MediaFormat>;

    /// Select a track for reading.
    ///
    /// Fails if a different track is already selected.
    fn select_track(&mut self, index: usize) -> Result<()>;

    /// Stop reading a track.
    fn unselect_track(&mut self, index: usize) -> Result<()>;

    /// Move the cursor to a sync point relative to `timestamp_us`.
    fn seek_to(&mut self, timestamp_us: i64, mode: SeekMode) -> Result<()>;

    /// Track of the current sample, `None` at end of stream.
    fn sample_track_index(&self) -> Option<usize>;

    /// Presentation time of the current sample, `None` at end of stream.
    fn sample_time(&self) -> Option<i64>;

    /// Flags of the current sample.
    fn sample_flags(&self) -> SampleFlags;

    /// Copy the current sample into `buffer`.
    ///
    /// Returns the sample size, or `None` at end of stream. Does not
    /// advance the cursor.
    fn read_sample_data(&mut self, buffer: &mut [u8]) -> Result<Option<usize>>;

    /// Move to the next sample. Returns `false` when no sample remains.
    fn advance(&mut self) -> bool;

    /// Release the underlying source.
    fn release(&mut self);
}

/// Destination container writer.
///
/// The byte-level format is the implementor's business; callers only
/// register tracks, append samples and finalize once.
pub trait Muxer: Send {
    /// Register a track and return its destination index.
    fn add_track(&mut self, format: &MediaFormat, is_audio: bool) -> Result<usize>;

    /// Append one sample. Returns whether data reached the container.
    fn write_sample_data(
        &mut self,
        track_index: usize,
        buffer: &[u8],
        info: &SampleInfo,
        is_audio: bool,
    ) -> Result<bool>;

    /// Write trailing metadata and close the container.
    fn finalize(&mut self) -> Result<()>;
}

/// Movie-level settings fixed when the destination is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovieSettings {
    /// Rotation stored in the container metadata.
    pub rotation: Rotation,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
}

/// Opens source containers and creates destination containers.
pub trait ContainerFactory: Send + Sync {
    /// Open a demuxer over the file at `path`.
    fn open_demuxer(&self, path: &Path) -> Result<Box<dyn Demuxer>>;

    /// Create a muxer writing to `path`.
    fn create_muxer(&self, path: &Path, settings: MovieSettings) -> Result<Box<dyn Muxer>>;
}

/// Find the first track whose MIME type is audio (`is_audio`) or video.
///
/// Additional tracks of the same kind are ignored.
pub fn find_track(demuxer: &dyn Demuxer, is_audio: bool) -> Option<usize> {
    (0..demuxer.track_count()).find(|&index| {
        demuxer
            .track_format(index)
            .map(|format| {
                if is_audio {
                    format.is_audio()
                } else {
                    format.is_video()
                }
            })
            .unwrap_or(false)
    })
}
