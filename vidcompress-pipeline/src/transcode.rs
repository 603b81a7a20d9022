//! Decode/render/encode loop for the video track.
//!
//! One thread drives both codecs. Each cycle feeds at most one compressed
//! sample to the decoder, then polls until neither codec has pending
//! output, encoder first. Decoded pictures go through the
//! [`FrameTransform`] and reach the encoder either through its input
//! surface or as raw YUV buffers, depending on the [`DeviceProfile`].

use crate::config::PipelineConfig;
use crate::nal::split_parameter_sets;
use crate::state::{next_step, CodecMachine, PipelinePhase, Step};
use crate::transform::{FrameTransform, GraphicsBackend, TransformSpec};
use crate::window::TimeWindow;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};
use vidcompress_containers::traits::{Demuxer, Muxer, SeekMode};
use vidcompress_core::cancel::CancellationToken;
use vidcompress_core::error::{CodecError, Result};
use vidcompress_core::format::{MediaFormat, Rotation, Track};
use vidcompress_core::progress::ProgressReporter;
use vidcompress_core::sample::{SampleFlags, SampleInfo};
use vidcompress_hwaccel::codec::{
    CodecCatalog, EncoderInputSurface, MediaCodec, OutputStatus, VideoDecoder, VideoEncoder,
};
use vidcompress_hwaccel::convert::convert_video_frame;
use vidcompress_hwaccel::resolver::{DeviceProfile, ResolvedEncoder};

/// Output parameters of one transcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranscodeRequest {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Target bitrate; 0 selects the configured fallback.
    pub bitrate: u32,
    /// Rotation applied while drawing frames.
    pub render_rotation: Rotation,
    /// Presentation times to keep.
    pub window: TimeWindow,
}

/// What a transcode produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranscodeOutcome {
    /// Destination video track index.
    pub destination_track: usize,
    /// Timestamp of the first frame rendered to the encoder.
    pub first_frame_time_us: Option<i64>,
    /// Frames submitted to the encoder.
    pub frames_rendered: usize,
    /// Decoded frames inside the window that never reached the encoder.
    pub frames_dropped: usize,
    /// Encoded samples written to the muxer.
    pub samples_written: usize,
}

/// Build the encoder's output format.
///
/// Raw-buffer encoders also get a stride and slice height.
pub fn encoder_output_format(
    config: &PipelineConfig,
    request: &TranscodeRequest,
    profile: &DeviceProfile,
) -> MediaFormat {
    let mut format = MediaFormat::video(&config.mime_type, request.width, request.height);
    format.color_format = Some(profile.color_format);
    format.bitrate = Some(if request.bitrate != 0 {
        request.bitrate
    } else {
        config.fallback_bitrate
    });
    format.frame_rate = Some(config.frame_rate);
    format.i_frame_interval = Some(config.i_frame_interval);
    if !profile.uses_surface_input() {
        format.stride = Some(request.width + config.stride_padding);
        format.slice_height = Some(request.height);
    }
    format
}

/// Re-encodes the video track of a source into a muxer.
pub struct TranscodePipeline {
    config: PipelineConfig,
    catalog: Arc<dyn CodecCatalog>,
    graphics: Arc<dyn GraphicsBackend>,
    cancel: CancellationToken,
}

impl TranscodePipeline {
    /// Create a pipeline.
    pub fn new(
        config: PipelineConfig,
        catalog: Arc<dyn CodecCatalog>,
        graphics: Arc<dyn GraphicsBackend>,
    ) -> Self {
        Self {
            config,
            catalog,
            graphics,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop between poll cycles once `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Configuration in use.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Transcode `track` from `demuxer` into `muxer`.
    ///
    /// Codecs, the input surface and the transform are released on every
    /// exit path, and the track is unselected. Progress is reported after
    /// every sample fed to the decoder.
    pub fn run(
        &self,
        demuxer: &mut dyn Demuxer,
        track: &Track,
        muxer: &mut dyn Muxer,
        encoder: &ResolvedEncoder,
        request: &TranscodeRequest,
        progress: &mut ProgressReporter,
    ) -> Result<TranscodeOutcome> {
        info!(
            encoder = %encoder.codec.name,
            color_format = %encoder.profile.color_format,
            width = request.width,
            height = request.height,
            bitrate = request.bitrate,
            "Starting video transcode"
        );

        demuxer.select_track(track.index())?;
        let result = self.run_selected(demuxer, track, muxer, encoder, request, progress);
        if let Err(err) = demuxer.unselect_track(track.index()) {
            warn!(track = track.index(), error = %err, "Failed to unselect video track");
        }

        match &result {
            Ok(outcome) => info!(
                frames = outcome.frames_rendered,
                dropped = outcome.frames_dropped,
                samples = outcome.samples_written,
                first_us = ?outcome.first_frame_time_us,
                "Video transcode finished"
            ),
            Err(err) if err.is_cancelled() => info!("Video transcode cancelled"),
            Err(err) => error!(error = %err, "Video transcode failed"),
        }
        result
    }

    fn run_selected(
        &self,
        demuxer: &mut dyn Demuxer,
        track: &Track,
        muxer: &mut dyn Muxer,
        encoder: &ResolvedEncoder,
        request: &TranscodeRequest,
        progress: &mut ProgressReporter,
    ) -> Result<TranscodeOutcome> {
        demuxer.seek_to(request.window.seek_target(), SeekMode::PreviousSync)?;
        let input_format = demuxer.track_format(track.index())?;
        let output_format = encoder_output_format(&self.config, request, &encoder.profile);
        debug!(?output_format, "Encoder output format");

        let mut session = Session::open(self, &input_format, &output_format, encoder, request)?;
        session.video_track = track.index();
        let result = session.drive(demuxer, muxer, progress);
        session.set_phase(if result.is_ok() {
            PipelinePhase::Done
        } else {
            PipelinePhase::Failed
        });
        result?;
        session.finish(muxer)
    }
}

/// Treat a transient dequeue error as an empty poll.
fn retry_input(stage: &'static str, result: Result<Option<usize>>) -> Result<Option<usize>> {
    match result {
        Err(err) if err.is_transient() => {
            trace!(stage, "Input dequeue asked to try again");
            Ok(None)
        }
        other => other,
    }
}

/// Treat a transient dequeue error as [`OutputStatus::TryAgainLater`].
fn retry_output(stage: &'static str, result: Result<OutputStatus>) -> Result<OutputStatus> {
    match result {
        Err(err) if err.is_transient() => {
            trace!(stage, "Output dequeue asked to try again");
            Ok(OutputStatus::TryAgainLater)
        }
        other => other,
    }
}

/// Frees a pipeline resource when dropped.
trait Release {
    fn release_resource(&mut self);
}

fn shutdown_codec<C: MediaCodec + ?Sized>(codec: &mut C) {
    if let Err(err) = codec.stop() {
        warn!(codec = codec.name(), error = %err, "Codec stop failed");
    }
    codec.release();
    trace!(codec = codec.name(), "Codec released");
}

impl Release for dyn VideoDecoder {
    fn release_resource(&mut self) {
        shutdown_codec(self);
    }
}

impl Release for dyn VideoEncoder {
    fn release_resource(&mut self) {
        shutdown_codec(self);
    }
}

impl Release for dyn EncoderInputSurface {
    fn release_resource(&mut self) {
        self.release();
    }
}

impl Release for dyn FrameTransform {
    fn release_resource(&mut self) {
        self.release();
    }
}

/// Owned resource released on drop.
struct Releasing<T: Release + ?Sized>(Box<T>);

impl<T: Release + ?Sized> Deref for Releasing<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: Release + ?Sized> DerefMut for Releasing<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T: Release + ?Sized> Drop for Releasing<T> {
    fn drop(&mut self) {
        self.0.release_resource();
    }
}

/// Live state of one transcode. Fields drop in declaration order, which
/// releases the transform, the input surface, the decoder and then the
/// encoder.
struct Session {
    transform: Releasing<dyn FrameTransform>,
    input_surface: Option<Releasing<dyn EncoderInputSurface>>,
    decoder: Releasing<dyn VideoDecoder>,
    encoder: Releasing<dyn VideoEncoder>,

    mime: String,
    poll_timeout_us: i64,
    cancel: CancellationToken,
    profile: DeviceProfile,
    width: u32,
    height: u32,
    window: TimeWindow,
    video_track: usize,

    decoder_state: CodecMachine,
    encoder_state: CodecMachine,
    feeding: bool,
    encoder_eos_pending: bool,
    phase: PipelinePhase,

    decoder_info: SampleInfo,
    encoder_info: SampleInfo,
    destination_track: Option<usize>,
    first_frame_time_us: Option<i64>,
    frames_rendered: usize,
    frames_dropped: usize,
    samples_written: usize,
}

impl Session {
    fn open(
        pipeline: &TranscodePipeline,
        input_format: &MediaFormat,
        output_format: &MediaFormat,
        resolved: &ResolvedEncoder,
        request: &TranscodeRequest,
    ) -> Result<Self> {
        let surface_input = resolved.profile.uses_surface_input();

        let mut encoder = Releasing(pipeline.catalog.create_encoder(&resolved.codec.name)?);
        encoder.configure(output_format)?;
        let input_surface = if surface_input {
            Some(Releasing(encoder.create_input_surface()?))
        } else {
            None
        };
        encoder.start()?;

        let transform = Releasing(pipeline.graphics.create_transform(&TransformSpec {
            width: request.width,
            height: request.height,
            rotation: request.render_rotation,
            surface_input,
        })?);

        let mut decoder = Releasing(pipeline.catalog.create_decoder(&input_format.mime)?);
        decoder.configure(input_format, transform.render_target())?;
        decoder.start()?;
        debug!(
            decoder = decoder.name(),
            encoder = encoder.name(),
            surface_input,
            "Codecs started"
        );

        Ok(Self {
            transform,
            input_surface,
            decoder,
            encoder,
            mime: pipeline.config.mime_type.clone(),
            poll_timeout_us: pipeline.config.poll_timeout_us,
            cancel: pipeline.cancel.clone(),
            profile: resolved.profile,
            width: request.width,
            height: request.height,
            window: request.window,
            video_track: 0,
            decoder_state: CodecMachine::new(),
            encoder_state: CodecMachine::new(),
            feeding: true,
            encoder_eos_pending: false,
            phase: PipelinePhase::Feeding,
            decoder_info: SampleInfo::default(),
            encoder_info: SampleInfo::default(),
            destination_track: None,
            first_frame_time_us: None,
            frames_rendered: 0,
            frames_dropped: 0,
            samples_written: 0,
        })
    }

    fn set_phase(&mut self, phase: PipelinePhase) {
        if self.phase != phase {
            debug!(from = ?self.phase, to = ?phase, "Pipeline phase");
            self.phase = phase;
        }
    }

    fn drive(
        &mut self,
        demuxer: &mut dyn Demuxer,
        muxer: &mut dyn Muxer,
        progress: &mut ProgressReporter,
    ) -> Result<()> {
        while !self.encoder_state.is_done() {
            self.cancel.check()?;

            if self.feeding {
                self.feed_decoder(demuxer, progress)?;
            }
            if self.encoder_eos_pending {
                self.signal_encoder_eos()?;
            }

            self.decoder_state.rearm();
            self.encoder_state.rearm();
            loop {
                match next_step(self.decoder_state.state(), self.encoder_state.state()) {
                    Step::Finish | Step::Idle => break,
                    Step::DrainEncoder => self.drain_encoder(muxer)?,
                    Step::DrainDecoder => self.drain_decoder()?,
                }
            }
            let phase = PipelinePhase::from_machines(&self.decoder_state, &self.encoder_state);
            self.set_phase(phase);
        }
        Ok(())
    }

    fn feed_decoder(
        &mut self,
        demuxer: &mut dyn Demuxer,
        progress: &mut ProgressReporter,
    ) -> Result<()> {
        match demuxer.sample_track_index() {
            Some(index) if index != self.video_track => {
                trace!(index, "Skipping sample of another track");
                demuxer.advance();
                Ok(())
            }
            Some(_) => {
                let polled = self.decoder.dequeue_input_buffer(self.poll_timeout_us);
                let Some(slot) = retry_input("decoder", polled)? else {
                    return Ok(());
                };
                let buffer = self.decoder.input_buffer(slot)?;
                match demuxer.read_sample_data(buffer)? {
                    Some(size) => {
                        let pts = demuxer.sample_time().unwrap_or(0);
                        self.decoder
                            .queue_input_buffer(slot, 0, size, pts, SampleFlags::empty())?;
                        trace!(pts, size, "Fed decoder");
                        demuxer.advance();
                        progress.report(pts);
                    }
                    None => self.queue_decoder_eos(slot)?,
                }
                Ok(())
            }
            None => {
                let polled = self.decoder.dequeue_input_buffer(self.poll_timeout_us);
                if let Some(slot) = retry_input("decoder", polled)? {
                    self.queue_decoder_eos(slot)?;
                }
                Ok(())
            }
        }
    }

    fn queue_decoder_eos(&mut self, slot: usize) -> Result<()> {
        self.decoder
            .queue_input_buffer(slot, 0, 0, 0, SampleFlags::END_OF_STREAM)?;
        self.feeding = false;
        self.decoder_state.end_input();
        debug!("Decoder input ended");
        Ok(())
    }

    fn drain_encoder(&mut self, muxer: &mut dyn Muxer) -> Result<()> {
        let polled = self
            .encoder
            .dequeue_output_buffer(&mut self.encoder_info, self.poll_timeout_us);
        let status = retry_output("encoder", polled)?;
        match status {
            OutputStatus::TryAgainLater => self.encoder_state.on_try_again(),
            OutputStatus::OutputBuffersChanged => self.encoder_state.on_output(),
            OutputStatus::OutputFormatChanged(format) => {
                if self.destination_track.is_none() {
                    let index = muxer.add_track(&format, false)?;
                    debug!(index, "Video track registered from encoder format");
                    self.destination_track = Some(index);
                }
                self.encoder_state.on_output();
            }
            OutputStatus::Buffer(index) => {
                let info = self.encoder_info;
                if info.size > 1 {
                    self.handle_encoded(muxer, index, &info)?;
                }
                self.encoder.release_output_buffer(index, false)?;
                if info.is_end_of_stream() {
                    debug!("Encoder reached end of stream");
                    self.encoder_state.on_end_of_stream();
                } else {
                    self.encoder_state.on_output();
                }
            }
        }
        Ok(())
    }

    fn handle_encoded(
        &mut self,
        muxer: &mut dyn Muxer,
        index: usize,
        info: &SampleInfo,
    ) -> Result<()> {
        let buffer = self.encoder.output_buffer(index)?;
        if !info.is_codec_config() {
            let track = self.destination_track.ok_or_else(|| {
                CodecError::Other("encoder produced frames before its format".into())
            })?;
            if muxer.write_sample_data(track, buffer, info, false)? {
                self.samples_written += 1;
            }
            return Ok(());
        }
        if self.destination_track.is_some() {
            return Ok(());
        }

        let csd = buffer.get(info.range()).ok_or(CodecError::MissingBuffer {
            stage: "encoder",
            index,
        })?;
        let mut format = MediaFormat::video(&self.mime, self.width, self.height);
        if let Some((sps, pps)) = split_parameter_sets(csd) {
            format = format.with_parameter_sets(sps.to_vec(), pps.to_vec());
        }
        let track = muxer.add_track(&format, false)?;
        debug!(index = track, "Video track registered from codec config");
        self.destination_track = Some(track);
        Ok(())
    }

    fn drain_decoder(&mut self) -> Result<()> {
        let polled = self
            .decoder
            .dequeue_output_buffer(&mut self.decoder_info, self.poll_timeout_us);
        let status = retry_output("decoder", polled)?;
        match status {
            OutputStatus::TryAgainLater => {
                self.decoder_state.on_try_again();
                return Ok(());
            }
            OutputStatus::OutputBuffersChanged => self.decoder_state.on_output(),
            OutputStatus::OutputFormatChanged(format) => {
                debug!(?format, "Decoder output format changed");
                self.decoder_state.on_output();
            }
            OutputStatus::Buffer(index) => self.handle_decoded(index)?,
        }
        self.encoder_state.rearm();
        Ok(())
    }

    fn handle_decoded(&mut self, index: usize) -> Result<()> {
        let mut info = self.decoder_info;
        let pts = info.presentation_time_us;
        let surface_input = self.profile.uses_surface_input();
        let mut render = if surface_input {
            info.size != 0
        } else {
            info.size != 0 || pts != 0
        };

        if self.window.has_ended(pts) {
            debug!(pts, "Reached end of window");
            self.feeding = false;
            render = false;
            info.flags |= SampleFlags::END_OF_STREAM;
        }
        if render && self.window.is_before_start(pts) {
            trace!(pts, "Dropping frame before window start");
            render = false;
        }

        self.decoder.release_output_buffer(index, render)?;
        if render {
            self.render_frame(pts)?;
        }

        if info.is_end_of_stream() {
            debug!(pts, "Decoder reached end of stream");
            self.decoder_state.on_end_of_stream();
            self.encoder_eos_pending = true;
            self.signal_encoder_eos()?;
        } else {
            self.decoder_state.on_output();
        }
        Ok(())
    }

    fn render_frame(&mut self, pts: i64) -> Result<()> {
        if let Err(err) = self.transform.await_new_image() {
            warn!(pts, error = %err, "Decoded frame not delivered, skipping");
            self.frames_dropped += 1;
            return Ok(());
        }

        if let Some(surface) = self.input_surface.as_mut() {
            let frame = self.transform.draw_image()?;
            surface.set_presentation_time(pts * 1000);
            surface.swap_buffers(frame)?;
        } else {
            let polled = self.encoder.dequeue_input_buffer(self.poll_timeout_us);
            let Some(slot) = retry_input("encoder", polled)? else {
                warn!(pts, "No encoder input buffer, dropping frame");
                self.frames_dropped += 1;
                return Ok(());
            };
            let frame = self.transform.draw_image()?;
            let buffer = self.encoder.input_buffer(slot)?;
            convert_video_frame(
                &frame.pixels,
                buffer,
                self.profile.color_format,
                self.width,
                self.height,
                self.profile.buffer_padding,
                self.profile.swap_chroma,
            )?;
            self.encoder.queue_input_buffer(
                slot,
                0,
                self.profile.buffer_size,
                pts,
                SampleFlags::empty(),
            )?;
        }

        self.first_frame_time_us.get_or_insert(pts);
        self.frames_rendered += 1;
        trace!(pts, frames = self.frames_rendered, "Frame rendered");
        Ok(())
    }

    fn signal_encoder_eos(&mut self) -> Result<()> {
        if self.input_surface.is_some() {
            self.encoder.signal_end_of_input_stream()?;
        } else {
            let polled = self.encoder.dequeue_input_buffer(self.poll_timeout_us);
            let Some(slot) = retry_input("encoder", polled)? else {
                trace!("No encoder input buffer for end of stream, retrying");
                return Ok(());
            };
            let pts = self.decoder_info.presentation_time_us;
            self.encoder
                .queue_input_buffer(slot, 0, 0, pts, SampleFlags::END_OF_STREAM)?;
        }
        self.encoder_eos_pending = false;
        self.encoder_state.end_input();
        debug!("Encoder input ended");
        Ok(())
    }

    fn finish(mut self, muxer: &mut dyn Muxer) -> Result<TranscodeOutcome> {
        let destination_track = match self.destination_track {
            Some(track) => track,
            None => {
                let format = MediaFormat::video(&self.mime, self.width, self.height);
                let track = muxer.add_track(&format, false)?;
                debug!(index = track, "Registered video track without encoded output");
                self.destination_track = Some(track);
                track
            }
        };
        Ok(TranscodeOutcome {
            destination_track,
            first_frame_time_us: self.first_frame_time_us,
            frames_rendered: self.frames_rendered,
            frames_dropped: self.frames_dropped,
            samples_written: self.samples_written,
        })
    }
}
