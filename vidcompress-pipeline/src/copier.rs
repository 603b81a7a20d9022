//! Compressed-sample passthrough.

use crate::window::TimeWindow;
use tracing::{debug, trace, warn};
use vidcompress_containers::traits::{Demuxer, Muxer, SeekMode};
use vidcompress_core::cancel::CancellationToken;
use vidcompress_core::error::{ContainerError, Result};
use vidcompress_core::format::Track;
use vidcompress_core::progress::ProgressReporter;
use vidcompress_core::sample::SampleInfo;

/// What a copy wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyOutcome {
    /// Destination track index.
    pub destination_track: usize,
    /// Timestamp of the first sample written.
    pub first_sample_time_us: Option<i64>,
    /// Number of samples that reached the muxer.
    pub samples_written: usize,
}

/// Copies one track's compressed samples to a muxer without re-encoding.
#[derive(Debug, Clone, Default)]
pub struct TrackCopier {
    cancel: CancellationToken,
}

impl TrackCopier {
    /// Create a copier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop between samples once `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Copy `track` from `demuxer` to `muxer` within `window`.
    ///
    /// The track is registered on the muxer first, so it exists in the
    /// output even when the window holds no samples. Samples of other
    /// tracks are skipped. The track is unselected on every exit path.
    pub fn copy(
        &self,
        demuxer: &mut dyn Demuxer,
        muxer: &mut dyn Muxer,
        track: &Track,
        window: TimeWindow,
        mut progress: Option<&mut ProgressReporter>,
    ) -> Result<CopyOutcome> {
        let destination_track = muxer.add_track(track.format(), track.is_audio())?;
        let buffer_size = track
            .format()
            .max_input_size
            .ok_or(ContainerError::MissingKey("max-input-size"))?;

        demuxer.select_track(track.index())?;
        let result = self.copy_selected(
            demuxer,
            muxer,
            track,
            destination_track,
            window,
            vec![0u8; buffer_size],
            &mut progress,
        );
        if let Err(err) = demuxer.unselect_track(track.index()) {
            warn!(track = track.index(), error = %err, "Failed to unselect copied track");
        }

        let outcome = result?;
        debug!(
            track = track.index(),
            audio = track.is_audio(),
            samples = outcome.samples_written,
            first_us = ?outcome.first_sample_time_us,
            "Track copied"
        );
        Ok(outcome)
    }

    #[allow(clippy::too_many_arguments)]
    fn copy_selected(
        &self,
        demuxer: &mut dyn Demuxer,
        muxer: &mut dyn Muxer,
        track: &Track,
        destination_track: usize,
        window: TimeWindow,
        mut buffer: Vec<u8>,
        progress: &mut Option<&mut ProgressReporter>,
    ) -> Result<CopyOutcome> {
        demuxer.seek_to(window.seek_target(), SeekMode::PreviousSync)?;

        let mut info = SampleInfo::default();
        let mut outcome = CopyOutcome {
            destination_track,
            first_sample_time_us: None,
            samples_written: 0,
        };

        loop {
            self.cancel.check()?;
            match demuxer.sample_track_index() {
                None => break,
                Some(index) if index != track.index() => {
                    trace!(index, "Skipping sample of another track");
                    if !demuxer.advance() {
                        break;
                    }
                    continue;
                }
                Some(_) => {}
            }

            let Some(size) = demuxer.read_sample_data(&mut buffer)? else {
                break;
            };
            let pts = demuxer.sample_time().unwrap_or(0);
            if window.has_ended(pts) {
                trace!(pts, "Reached end of window");
                break;
            }

            info.set(size, 0, pts, demuxer.sample_flags());
            if muxer.write_sample_data(destination_track, &buffer, &info, track.is_audio())? {
                outcome.samples_written += 1;
                outcome.first_sample_time_us.get_or_insert(pts);
                if let Some(reporter) = progress.as_deref_mut() {
                    reporter.report(pts);
                }
            }
            if !demuxer.advance() {
                break;
            }
        }
        Ok(outcome)
    }
}
