//! One compression from source file to destination file.

use crate::compressor::Collaborators;
use crate::config::CompressorConfig;
use crate::options::CompressionOptions;
use crate::params::ResolvedParameters;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use vidcompress_containers::{find_track, Demuxer, MovieSettings, Muxer, VideoMetadata};
use vidcompress_core::cancel::CancellationToken;
use vidcompress_core::error::{Error, Result};
use vidcompress_core::format::{MediaFormat, Track};
use vidcompress_core::progress::{Outcome, ProgressReporter, ProgressSink};
use vidcompress_hwaccel::{CapabilityResolver, ResolvedEncoder};
use vidcompress_pipeline::{TimeWindow, TrackCopier, TranscodePipeline, TranscodeRequest};

/// Samples written per destination track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrackSummary {
    /// Timestamp of the first video frame kept.
    pub first_video_time_us: Option<i64>,
    /// Video samples written.
    pub video_samples: usize,
    /// Decoded frames the encoder never received.
    pub video_frames_dropped: usize,
    /// Audio samples written. `None` when the source has no audio.
    pub audio_samples: Option<usize>,
}

/// Result of a finished job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionReport {
    /// Parameters the job ran with.
    pub params: ResolvedParameters,
    /// Probed source properties.
    pub source: VideoMetadata,
    /// What reached the destination.
    pub tracks: TrackSummary,
    /// Whether the output holds video.
    pub outcome: Outcome,
    /// Whether the source file was removed.
    pub source_deleted: bool,
    /// Wall time of the job.
    pub elapsed: Duration,
}

impl CompressionReport {
    /// `Err(Error::EmptyResult)` when no video frame was kept.
    pub fn check(&self) -> Result<()> {
        match self.outcome {
            Outcome::Completed => Ok(()),
            Outcome::EmptyResult => Err(Error::EmptyResult),
        }
    }
}

/// A single compression, run once on the calling thread.
pub struct CompressionJob {
    collaborators: Collaborators,
    config: CompressorConfig,
    source: PathBuf,
    destination: PathBuf,
    options: CompressionOptions,
    cancel: CancellationToken,
}

impl CompressionJob {
    /// Create a job.
    pub fn new(
        collaborators: Collaborators,
        config: CompressorConfig,
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        options: CompressionOptions,
    ) -> Self {
        Self {
            collaborators,
            config,
            source: source.into(),
            destination: destination.into(),
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop at the next safe point once `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Source path.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Destination path.
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Run the job, delivering progress and exactly one terminal event to
    /// `sink`.
    ///
    /// The destination is finalized whenever it was created, even after a
    /// failure. The source is deleted only after a completed job and only
    /// when the configuration asks for it.
    pub fn run(self, sink: Box<dyn ProgressSink>) -> Result<CompressionReport> {
        let started = Instant::now();
        info!(
            source = %self.source.display(),
            destination = %self.destination.display(),
            "Starting compression"
        );

        let source = match self.prepare() {
            Ok(source) => source,
            Err(err) => {
                error!(error = %err, "Compression aborted before start");
                ProgressReporter::new(sink, 0).fail(&err);
                return Err(err);
            }
        };

        let mut reporter = ProgressReporter::new(sink, source.duration_us);
        reporter.report(0);

        match self.execute(&source, &mut reporter) {
            Ok((params, tracks)) => {
                let outcome = if tracks.video_samples == 0 {
                    Outcome::EmptyResult
                } else {
                    Outcome::Completed
                };
                reporter.complete(outcome);
                let source_deleted = outcome == Outcome::Completed
                    && self.config.delete_source_on_success
                    && self.delete_source();

                let report = CompressionReport {
                    params,
                    source,
                    tracks,
                    outcome,
                    source_deleted,
                    elapsed: started.elapsed(),
                };
                info!(
                    outcome = ?report.outcome,
                    video_samples = tracks.video_samples,
                    frames_dropped = tracks.video_frames_dropped,
                    audio_samples = ?tracks.audio_samples,
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    "Compression finished"
                );
                Ok(report)
            }
            Err(err) => {
                error!(error = %err, "Compression failed");
                reporter.fail(&err);
                Err(err)
            }
        }
    }

    fn prepare(&self) -> Result<VideoMetadata> {
        self.config.validate()?;
        self.options.validate()?;
        File::open(&self.source).map_err(|e| {
            Error::unreadable(format!("{}: {e}", self.source.display()))
        })?;
        self.collaborators.probe.probe(&self.source)
    }

    fn execute(
        &self,
        source: &VideoMetadata,
        reporter: &mut ProgressReporter,
    ) -> Result<(ResolvedParameters, TrackSummary)> {
        let params = ResolvedParameters::resolve(&self.options, source, &self.config.platform)?;
        info!(
            width = params.width,
            height = params.height,
            bitrate = params.bitrate,
            render_rotation = params.render_rotation.degrees(),
            transcode = params.transcode,
            "Output parameters"
        );

        let window = self.options.window().clamped(source.duration_us);
        let encoder = if params.transcode && !window.is_empty() {
            let resolver = CapabilityResolver::new(
                self.collaborators.codecs.clone(),
                self.config.platform.clone(),
            );
            Some(resolver.resolve(&self.config.pipeline.mime_type, params.width, params.height)?)
        } else {
            None
        };

        let mut demuxer = self.collaborators.containers.open_demuxer(&self.source)?;
        let result = self.write_destination(
            demuxer.as_mut(),
            &params,
            encoder.as_ref(),
            window,
            reporter,
        );
        demuxer.release();
        result.map(|tracks| (params, tracks))
    }

    fn write_destination(
        &self,
        demuxer: &mut dyn Demuxer,
        params: &ResolvedParameters,
        encoder: Option<&ResolvedEncoder>,
        window: TimeWindow,
        reporter: &mut ProgressReporter,
    ) -> Result<TrackSummary> {
        let settings = MovieSettings {
            rotation: params.container_rotation,
            width: params.width,
            height: params.height,
        };
        let mut muxer = self
            .collaborators
            .containers
            .create_muxer(&self.destination, settings)?;

        let written = self.write_tracks(demuxer, muxer.as_mut(), params, encoder, window, reporter);
        let finalized = muxer.finalize();

        match (written, finalized) {
            (Ok(tracks), Ok(())) => Ok(tracks),
            (Ok(_), Err(err)) => Err(err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(finalize_err)) => {
                warn!(error = %finalize_err, "Finalize failed after an earlier error");
                Err(err)
            }
        }
    }

    fn write_tracks(
        &self,
        demuxer: &mut dyn Demuxer,
        muxer: &mut dyn Muxer,
        params: &ResolvedParameters,
        encoder: Option<&ResolvedEncoder>,
        window: TimeWindow,
        reporter: &mut ProgressReporter,
    ) -> Result<TrackSummary> {
        let video_index = find_track(demuxer, false)
            .ok_or_else(|| Error::unreadable(format!("{} has no video track", self.source.display())))?;
        let video = Track::new(video_index, false, demuxer.track_format(video_index)?);
        let audio = find_track(demuxer, true)
            .map(|index| demuxer.track_format(index).map(|format| Track::new(index, true, format)))
            .transpose()?;

        if window.is_empty() {
            debug!(start_us = window.start_us, end_us = ?window.end_us, "Window selects nothing");
            let video_format = if params.transcode {
                MediaFormat::video(&self.config.pipeline.mime_type, params.width, params.height)
            } else {
                video.format().clone()
            };
            muxer.add_track(&video_format, false)?;
            if let Some(audio) = &audio {
                muxer.add_track(audio.format(), true)?;
            }
            return Ok(TrackSummary {
                audio_samples: audio.map(|_| 0),
                ..Default::default()
            });
        }

        let (first_video_time_us, video_samples, video_frames_dropped) = match encoder {
            Some(encoder) => {
                let request = TranscodeRequest {
                    width: params.width,
                    height: params.height,
                    bitrate: params.bitrate,
                    render_rotation: params.render_rotation,
                    window,
                };
                let outcome = TranscodePipeline::new(
                    self.config.pipeline.clone(),
                    self.collaborators.codecs.clone(),
                    self.collaborators.graphics.clone(),
                )
                .with_cancellation(self.cancel.clone())
                .run(demuxer, &video, muxer, encoder, &request, reporter)?;
                (
                    outcome.first_frame_time_us,
                    outcome.samples_written,
                    outcome.frames_dropped,
                )
            }
            None => {
                let outcome = TrackCopier::new()
                    .with_cancellation(self.cancel.clone())
                    .copy(demuxer, muxer, &video, window, Some(&mut *reporter))?;
                (outcome.first_sample_time_us, outcome.samples_written, 0)
            }
        };

        let audio_samples = match &audio {
            Some(audio) => {
                let audio_window =
                    TimeWindow::new(first_video_time_us.unwrap_or(window.start_us), window.end_us);
                let outcome = TrackCopier::new()
                    .with_cancellation(self.cancel.clone())
                    .copy(demuxer, muxer, audio, audio_window, None)?;
                Some(outcome.samples_written)
            }
            None => None,
        };

        Ok(TrackSummary {
            first_video_time_us,
            video_samples,
            video_frames_dropped,
            audio_samples,
        })
    }

    fn delete_source(&self) -> bool {
        match std::fs::remove_file(&self.source) {
            Ok(()) => {
                debug!(source = %self.source.display(), "Deleted source");
                true
            }
            Err(err) => {
                warn!(source = %self.source.display(), error = %err, "Failed to delete source");
                false
            }
        }
    }
}
