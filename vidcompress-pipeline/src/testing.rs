//! Scripted codecs and synthetic movies.
//!
//! [`FakeCodecs`] is a [`CodecCatalog`] whose decoder passes every sample
//! straight through as a flat test picture and whose encoder emits one
//! codec-config buffer followed by one buffer per submitted frame. Both can
//! be told to fail after a number of outputs. [`sample_movie`] builds a
//! [`MemorySource`] with matching video and audio tracks.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use vidcompress_containers::memory::MemorySource;
use vidcompress_core::error::{CodecError, Error, Result};
use vidcompress_core::format::{ColorFormat, MediaFormat, Rotation, MIME_VIDEO_AVC};
use vidcompress_core::sample::{SampleFlags, SampleInfo};
use vidcompress_hwaccel::codec::{
    CodecCatalog, CodecInfo, DecodedImage, EncoderInputSurface, MediaCodec, OutputStatus,
    RenderTarget, RenderedFrame, VideoDecoder, VideoEncoder,
};

/// MIME type of the synthetic audio track.
pub const MIME_AUDIO_AAC: &str = "audio/mp4a-latm";

/// Codec-config payload emitted by the fake encoder: SPS then PPS.
pub const FAKE_CODEC_CONFIG: [u8; 16] = [
    0, 0, 0, 1, 0x67, 0x42, 0x80, 0x1e, 0, 0, 0, 1, 0x68, 0xce, 0x3c, 0x80,
];

const DECODER_INPUT_SLOTS: usize = 4;
const ENCODER_INPUT_SLOTS: usize = 4;
const DEFAULT_INPUT_CAPACITY: usize = 64 * 1024;

/// Shape of a synthetic movie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieSpec {
    /// Video width.
    pub width: u32,
    /// Video height.
    pub height: u32,
    /// Rotation declared by the container.
    pub rotation: Option<Rotation>,
    /// Number of video frames.
    pub frame_count: usize,
    /// Time between video frames.
    pub frame_interval_us: i64,
    /// Every n-th frame is a keyframe.
    pub key_frame_interval: usize,
    /// Whether to add an audio track.
    pub audio: bool,
    /// Time between audio samples.
    pub audio_interval_us: i64,
}

impl Default for MovieSpec {
    fn default() -> Self {
        Self {
            width: 64,
            height: 48,
            rotation: None,
            frame_count: 30,
            frame_interval_us: 33_333,
            key_frame_interval: 10,
            audio: true,
            audio_interval_us: 23_220,
        }
    }
}

impl MovieSpec {
    /// Movie duration in microseconds.
    pub fn duration_us(&self) -> i64 {
        self.frame_count as i64 * self.frame_interval_us
    }
}

/// Build a source holding a video track and, optionally, an audio track.
///
/// The video track is always track 0.
pub fn sample_movie(spec: &MovieSpec) -> Result<MemorySource> {
    let duration_us = spec.duration_us();
    let mut source = MemorySource::new();

    let mut video_format =
        MediaFormat::video(MIME_VIDEO_AVC, spec.width, spec.height).with_duration_us(duration_us);
    video_format.rotation = spec.rotation;
    let video = source.add_track(video_format);
    for frame in 0..spec.frame_count {
        let key = spec.key_frame_interval == 0 || frame % spec.key_frame_interval == 0;
        let flags = if key {
            SampleFlags::KEY_FRAME
        } else {
            SampleFlags::empty()
        };
        let mut data = vec![0, 0, 0, 1, if key { 0x65 } else { 0x41 }];
        data.extend_from_slice(&(frame as u32).to_be_bytes());
        source.add_sample(video, frame as i64 * spec.frame_interval_us, flags, data)?;
    }

    if spec.audio && spec.audio_interval_us > 0 {
        let audio_format =
            MediaFormat::audio(MIME_AUDIO_AAC, 44_100, 2).with_duration_us(duration_us);
        let audio = source.add_track(audio_format);
        let mut pts = 0;
        let mut index = 0u32;
        while pts < duration_us {
            source.add_sample(audio, pts, SampleFlags::KEY_FRAME, index.to_be_bytes().to_vec())?;
            pts += spec.audio_interval_us;
            index += 1;
        }
    }
    Ok(source)
}

/// Flat RGBA picture whose shade depends on `seed`.
pub fn test_pattern(width: u32, height: u32, seed: i64) -> Vec<u8> {
    let shade = (seed.rem_euclid(200) + 28) as u8;
    (0..width as usize * height as usize)
        .flat_map(|_| [shade, shade / 2, 255 - shade, 255])
        .collect()
}

/// Failure and behavior switches for [`FakeCodecs`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodecFaults {
    /// Decoder fails after returning this many buffers.
    pub fail_decoder_after: Option<usize>,
    /// Encoder fails after returning this many buffers.
    pub fail_encoder_after: Option<usize>,
    /// Encoder creation fails.
    pub fail_encoder_creation: bool,
    /// Encoder announces its format change instead of emitting a
    /// codec-config buffer.
    pub format_change_first: bool,
    /// Every other decoder poll reports nothing.
    pub stutter: bool,
    /// The decoder answers this many input polls, and this many output
    /// polls, with a try-again error first.
    pub decoder_try_again: usize,
    /// The encoder answers this many output polls with a try-again error
    /// first.
    pub encoder_output_try_again: usize,
    /// The encoder answers this many input polls with a try-again error
    /// first.
    pub encoder_input_try_again: usize,
}

/// What the fake codecs saw.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodecLog {
    /// Decoders created.
    pub decoders_created: usize,
    /// Decoders released.
    pub decoders_released: usize,
    /// Encoders created.
    pub encoders_created: usize,
    /// Encoders released.
    pub encoders_released: usize,
    /// Input surfaces released.
    pub surfaces_released: usize,
    /// Samples queued into decoders.
    pub decoder_inputs: usize,
    /// Timestamps of frames submitted to encoders.
    pub encoder_frames: Vec<i64>,
    /// Size of the last frame submitted through an input surface.
    pub last_surface_frame: Option<(u32, u32)>,
    /// Sizes of raw buffers queued into encoders.
    pub raw_input_sizes: Vec<usize>,
    /// Whether an encoder received end of stream.
    pub encoder_end_of_stream: bool,
    /// Format the last encoder was configured with.
    pub encoder_format: Option<MediaFormat>,
    /// Format the last decoder was configured with.
    pub decoder_format: Option<MediaFormat>,
}

/// Scripted codec catalog.
#[derive(Clone)]
pub struct FakeCodecs {
    codecs: Vec<CodecInfo>,
    faults: CodecFaults,
    log: Arc<Mutex<CodecLog>>,
}

impl FakeCodecs {
    /// An AVC decoder plus the given encoders.
    pub fn new(encoders: Vec<CodecInfo>) -> Self {
        let mut codecs = vec![CodecInfo::decoder("OMX.fake.video.decoder.avc", MIME_VIDEO_AVC)];
        codecs.extend(encoders);
        Self {
            codecs,
            faults: CodecFaults::default(),
            log: Arc::new(Mutex::new(CodecLog::default())),
        }
    }

    /// A device whose encoder accepts surface input.
    pub fn surface() -> Self {
        Self::new(vec![CodecInfo::encoder(
            "OMX.qcom.video.encoder.avc",
            MIME_VIDEO_AVC,
            vec![ColorFormat::Surface, ColorFormat::Yuv420SemiPlanar],
        )])
    }

    /// A device whose only encoder takes raw buffers.
    pub fn raw(name: &str, color_formats: Vec<ColorFormat>) -> Self {
        Self::new(vec![CodecInfo::encoder(name, MIME_VIDEO_AVC, color_formats)])
    }

    /// Set fault switches.
    #[must_use]
    pub fn with_faults(mut self, faults: CodecFaults) -> Self {
        self.faults = faults;
        self
    }

    /// Snapshot of what the codecs saw.
    pub fn log(&self) -> CodecLog {
        self.log.lock().clone()
    }
}

impl CodecCatalog for FakeCodecs {
    fn codecs(&self) -> Vec<CodecInfo> {
        self.codecs.clone()
    }

    fn create_encoder(&self, name: &str) -> Result<Box<dyn VideoEncoder>> {
        if self.faults.fail_encoder_creation {
            return Err(CodecError::Config(format!("cannot instantiate {name}")).into());
        }
        let info = self
            .codecs
            .iter()
            .find(|c| c.is_encoder && c.name == name)
            .ok_or_else(|| Error::unsupported(format!("no encoder named {name}")))?;
        self.log.lock().encoders_created += 1;
        Ok(Box::new(FakeEncoder::new(
            info.name.clone(),
            self.faults,
            self.log.clone(),
        )))
    }

    fn create_decoder(&self, mime: &str) -> Result<Box<dyn VideoDecoder>> {
        let info = self
            .codecs
            .iter()
            .find(|c| !c.is_encoder && c.supports_type(mime))
            .ok_or_else(|| Error::unsupported(format!("no decoder for {mime}")))?;
        self.log.lock().decoders_created += 1;
        Ok(Box::new(FakeDecoder::new(
            info.name.clone(),
            self.faults,
            self.log.clone(),
        )))
    }
}

/// Slot bookkeeping shared by both fakes.
#[derive(Debug, Default)]
struct Slots {
    buffers: Vec<Vec<u8>>,
    free: Vec<usize>,
}

impl Slots {
    fn new(count: usize, capacity: usize) -> Self {
        Self {
            buffers: vec![vec![0; capacity]; count],
            free: (0..count).rev().collect(),
        }
    }

    fn take(&mut self) -> Option<usize> {
        self.free.pop()
    }

    fn buffer(&mut self, index: usize) -> Result<&mut [u8]> {
        if self.free.contains(&index) {
            return Err(CodecError::InvalidInputBuffer(index).into());
        }
        self.buffers
            .get_mut(index)
            .map(Vec::as_mut_slice)
            .ok_or_else(|| CodecError::InvalidInputBuffer(index).into())
    }

    fn give_back(&mut self, index: usize, size: usize) -> Result<()> {
        let capacity = self
            .buffers
            .get(index)
            .map(Vec::len)
            .ok_or(CodecError::InvalidInputBuffer(index))?;
        if self.free.contains(&index) || size > capacity {
            return Err(CodecError::InvalidInputBuffer(index).into());
        }
        self.free.push(index);
        Ok(())
    }
}

/// Decrement a scripted fault counter, reporting whether one was left.
fn take_one(counter: &mut usize) -> bool {
    if *counter == 0 {
        return false;
    }
    *counter -= 1;
    true
}

struct FakeDecoder {
    name: String,
    faults: CodecFaults,
    log: Arc<Mutex<CodecLog>>,
    width: u32,
    height: u32,
    target: Option<Arc<dyn RenderTarget>>,
    slots: Slots,
    pending: VecDeque<(i64, bool)>,
    in_flight: HashMap<usize, i64>,
    next_output: usize,
    outputs: usize,
    polls: usize,
    input_try_again: usize,
    output_try_again: usize,
    format_reported: bool,
    started: bool,
    released: bool,
}

impl FakeDecoder {
    fn new(name: String, faults: CodecFaults, log: Arc<Mutex<CodecLog>>) -> Self {
        Self {
            name,
            faults,
            log,
            width: 0,
            height: 0,
            target: None,
            slots: Slots::default(),
            pending: VecDeque::new(),
            in_flight: HashMap::new(),
            next_output: 0,
            outputs: 0,
            polls: 0,
            input_try_again: faults.decoder_try_again,
            output_try_again: faults.decoder_try_again,
            format_reported: false,
            started: false,
            released: false,
        }
    }

    fn ensure_started(&self) -> Result<()> {
        if self.started && !self.released {
            Ok(())
        } else {
            Err(CodecError::NotStarted.into())
        }
    }
}

impl MediaCodec for FakeDecoder {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&mut self) -> Result<()> {
        if self.target.is_none() {
            return Err(CodecError::Config("decoder started before configure".into()).into());
        }
        self.started = true;
        Ok(())
    }

    fn dequeue_input_buffer(&mut self, _timeout_us: i64) -> Result<Option<usize>> {
        self.ensure_started()?;
        if take_one(&mut self.input_try_again) {
            return Err(CodecError::TryAgain.into());
        }
        Ok(self.slots.take())
    }

    fn input_buffer(&mut self, index: usize) -> Result<&mut [u8]> {
        self.ensure_started()?;
        self.slots.buffer(index)
    }

    fn queue_input_buffer(
        &mut self,
        index: usize,
        _offset: usize,
        size: usize,
        presentation_time_us: i64,
        flags: SampleFlags,
    ) -> Result<()> {
        self.ensure_started()?;
        self.slots.give_back(index, size)?;
        let end_of_stream = flags.contains(SampleFlags::END_OF_STREAM);
        if !end_of_stream {
            self.log.lock().decoder_inputs += 1;
        }
        self.pending.push_back((presentation_time_us, end_of_stream));
        Ok(())
    }

    fn dequeue_output_buffer(
        &mut self,
        info: &mut SampleInfo,
        _timeout_us: i64,
    ) -> Result<OutputStatus> {
        self.ensure_started()?;
        if self
            .faults
            .fail_decoder_after
            .is_some_and(|limit| self.outputs >= limit)
        {
            return Err(CodecError::UnexpectedStatus {
                stage: "decoder",
                status: -1000,
            }
            .into());
        }
        if take_one(&mut self.output_try_again) {
            return Err(CodecError::TryAgain.into());
        }
        if !self.format_reported {
            self.format_reported = true;
            return Ok(OutputStatus::OutputFormatChanged(MediaFormat::video(
                "video/raw",
                self.width,
                self.height,
            )));
        }
        self.polls += 1;
        if self.faults.stutter && self.polls % 2 == 0 {
            return Ok(OutputStatus::TryAgainLater);
        }
        let Some((pts, end_of_stream)) = self.pending.pop_front() else {
            return Ok(OutputStatus::TryAgainLater);
        };

        let index = self.next_output;
        self.next_output += 1;
        self.outputs += 1;
        if end_of_stream {
            info.set(0, 0, 0, SampleFlags::END_OF_STREAM);
        } else {
            let size = self.width as usize * self.height as usize * 3 / 2;
            info.set(size, 0, pts, SampleFlags::empty());
        }
        self.in_flight.insert(index, pts);
        Ok(OutputStatus::Buffer(index))
    }

    fn release_output_buffer(&mut self, index: usize, render: bool) -> Result<()> {
        self.ensure_started()?;
        let pts = self.in_flight.remove(&index).ok_or(CodecError::MissingBuffer {
            stage: "decoder",
            index,
        })?;
        if render {
            if let Some(target) = &self.target {
                target.queue_image(DecodedImage {
                    width: self.width,
                    height: self.height,
                    presentation_time_us: pts,
                    pixels: Arc::from(test_pattern(self.width, self.height, pts)),
                })?;
            }
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.started = false;
        Ok(())
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.target = None;
            self.log.lock().decoders_released += 1;
        }
    }
}

impl VideoDecoder for FakeDecoder {
    fn configure(&mut self, format: &MediaFormat, target: Arc<dyn RenderTarget>) -> Result<()> {
        let (Some(width), Some(height)) = (format.width, format.height) else {
            return Err(CodecError::Config("decoder format lacks dimensions".into()).into());
        };
        self.width = width;
        self.height = height;
        self.slots = Slots::new(
            DECODER_INPUT_SLOTS,
            format.max_input_size.unwrap_or(DEFAULT_INPUT_CAPACITY),
        );
        self.target = Some(target);
        self.log.lock().decoder_format = Some(format.clone());
        Ok(())
    }
}

/// Frame or end-of-stream marker waiting inside the fake encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EncoderInput {
    Frame(i64),
    EndOfStream,
}

type EncoderQueue = Arc<Mutex<VecDeque<EncoderInput>>>;

struct FakeEncoder {
    name: String,
    faults: CodecFaults,
    log: Arc<Mutex<CodecLog>>,
    format: Option<MediaFormat>,
    queue: EncoderQueue,
    slots: Slots,
    in_flight: HashMap<usize, Vec<u8>>,
    next_output: usize,
    outputs: usize,
    input_try_again: usize,
    output_try_again: usize,
    config_sent: bool,
    has_surface: bool,
    started: bool,
    released: bool,
}

impl FakeEncoder {
    fn new(name: String, faults: CodecFaults, log: Arc<Mutex<CodecLog>>) -> Self {
        Self {
            name,
            faults,
            log,
            format: None,
            queue: Arc::new(Mutex::new(VecDeque::new())),
            slots: Slots::default(),
            in_flight: HashMap::new(),
            next_output: 0,
            outputs: 0,
            input_try_again: faults.encoder_input_try_again,
            output_try_again: faults.encoder_output_try_again,
            config_sent: false,
            has_surface: false,
            started: false,
            released: false,
        }
    }

    fn ensure_started(&self) -> Result<()> {
        if self.started && !self.released {
            Ok(())
        } else {
            Err(CodecError::NotStarted.into())
        }
    }

    fn emit(
        &mut self,
        info: &mut SampleInfo,
        data: Vec<u8>,
        pts: i64,
        flags: SampleFlags,
    ) -> OutputStatus {
        let index = self.next_output;
        self.next_output += 1;
        self.outputs += 1;
        info.set(data.len(), 0, pts, flags);
        self.in_flight.insert(index, data);
        OutputStatus::Buffer(index)
    }
}

impl MediaCodec for FakeEncoder {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&mut self) -> Result<()> {
        if self.format.is_none() {
            return Err(CodecError::Config("encoder started before configure".into()).into());
        }
        self.started = true;
        Ok(())
    }

    fn dequeue_input_buffer(&mut self, _timeout_us: i64) -> Result<Option<usize>> {
        self.ensure_started()?;
        if self.has_surface {
            return Err(CodecError::Other("encoder uses surface input".into()).into());
        }
        if take_one(&mut self.input_try_again) {
            return Err(CodecError::TryAgain.into());
        }
        Ok(self.slots.take())
    }

    fn input_buffer(&mut self, index: usize) -> Result<&mut [u8]> {
        self.ensure_started()?;
        self.slots.buffer(index)
    }

    fn queue_input_buffer(
        &mut self,
        index: usize,
        _offset: usize,
        size: usize,
        presentation_time_us: i64,
        flags: SampleFlags,
    ) -> Result<()> {
        self.ensure_started()?;
        self.slots.give_back(index, size)?;
        let mut log = self.log.lock();
        if flags.contains(SampleFlags::END_OF_STREAM) {
            log.encoder_end_of_stream = true;
            self.queue.lock().push_back(EncoderInput::EndOfStream);
        } else {
            log.raw_input_sizes.push(size);
            log.encoder_frames.push(presentation_time_us);
            self.queue
                .lock()
                .push_back(EncoderInput::Frame(presentation_time_us));
        }
        Ok(())
    }

    fn dequeue_output_buffer(
        &mut self,
        info: &mut SampleInfo,
        _timeout_us: i64,
    ) -> Result<OutputStatus> {
        self.ensure_started()?;
        if self
            .faults
            .fail_encoder_after
            .is_some_and(|limit| self.outputs >= limit)
        {
            return Err(CodecError::UnexpectedStatus {
                stage: "encoder",
                status: -1000,
            }
            .into());
        }
        if take_one(&mut self.output_try_again) {
            return Err(CodecError::TryAgain.into());
        }

        if !self.config_sent {
            self.config_sent = true;
            if self.faults.format_change_first {
                let format = self
                    .format
                    .clone()
                    .unwrap_or_else(|| MediaFormat::new(MIME_VIDEO_AVC))
                    .with_parameter_sets(
                        FAKE_CODEC_CONFIG[..8].to_vec(),
                        FAKE_CODEC_CONFIG[8..].to_vec(),
                    );
                return Ok(OutputStatus::OutputFormatChanged(format));
            }
            return Ok(self.emit(info, FAKE_CODEC_CONFIG.to_vec(), 0, SampleFlags::CODEC_CONFIG));
        }

        let next = self.queue.lock().pop_front();
        match next {
            Some(EncoderInput::Frame(pts)) => {
                let flags = if self.outputs <= 1 {
                    SampleFlags::KEY_FRAME
                } else {
                    SampleFlags::empty()
                };
                let mut data = vec![0, 0, 0, 1, if flags.is_empty() { 0x41 } else { 0x65 }];
                data.extend_from_slice(&pts.to_be_bytes());
                Ok(self.emit(info, data, pts, flags))
            }
            Some(EncoderInput::EndOfStream) => {
                Ok(self.emit(info, Vec::new(), 0, SampleFlags::END_OF_STREAM))
            }
            None => Ok(OutputStatus::TryAgainLater),
        }
    }

    fn release_output_buffer(&mut self, index: usize, _render: bool) -> Result<()> {
        self.ensure_started()?;
        self.in_flight
            .remove(&index)
            .map(|_| ())
            .ok_or_else(|| CodecError::MissingBuffer { stage: "encoder", index }.into())
    }

    fn stop(&mut self) -> Result<()> {
        self.started = false;
        Ok(())
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.log.lock().encoders_released += 1;
        }
    }
}

impl VideoEncoder for FakeEncoder {
    fn configure(&mut self, format: &MediaFormat) -> Result<()> {
        let (Some(width), Some(height)) = (format.width, format.height) else {
            return Err(CodecError::Config("encoder format lacks dimensions".into()).into());
        };
        if format.color_format.is_none() || format.bitrate.is_none() {
            return Err(
                CodecError::Config("encoder format lacks color format or bitrate".into()).into(),
            );
        }
        let capacity = width as usize * (height as usize + 16) * 2 + 4096;
        self.slots = Slots::new(ENCODER_INPUT_SLOTS, capacity);
        self.format = Some(format.clone());
        self.log.lock().encoder_format = Some(format.clone());
        Ok(())
    }

    fn create_input_surface(&mut self) -> Result<Box<dyn EncoderInputSurface>> {
        let format = self
            .format
            .as_ref()
            .ok_or_else(|| CodecError::Surface("input surface requested before configure".into()))?;
        if self.started {
            return Err(CodecError::Surface("input surface requested after start".into()).into());
        }
        self.has_surface = true;
        Ok(Box::new(FakeInputSurface {
            width: format.width.unwrap_or(0),
            height: format.height.unwrap_or(0),
            queue: self.queue.clone(),
            log: self.log.clone(),
            presentation_time_ns: 0,
            released: false,
        }))
    }

    fn signal_end_of_input_stream(&mut self) -> Result<()> {
        self.ensure_started()?;
        if !self.has_surface {
            return Err(CodecError::Other("encoder has no input surface".into()).into());
        }
        self.log.lock().encoder_end_of_stream = true;
        self.queue.lock().push_back(EncoderInput::EndOfStream);
        Ok(())
    }

    fn output_buffer(&self, index: usize) -> Result<&[u8]> {
        self.in_flight
            .get(&index)
            .map(Vec::as_slice)
            .ok_or_else(|| CodecError::MissingBuffer { stage: "encoder", index }.into())
    }
}

struct FakeInputSurface {
    width: u32,
    height: u32,
    queue: EncoderQueue,
    log: Arc<Mutex<CodecLog>>,
    presentation_time_ns: i64,
    released: bool,
}

impl EncoderInputSurface for FakeInputSurface {
    fn set_presentation_time(&mut self, nanos: i64) {
        self.presentation_time_ns = nanos;
    }

    fn swap_buffers(&mut self, frame: RenderedFrame) -> Result<()> {
        if self.released {
            return Err(CodecError::Surface("surface already released".into()).into());
        }
        if (frame.width, frame.height) != (self.width, self.height) {
            return Err(CodecError::Surface(format!(
                "frame is {}x{}, surface is {}x{}",
                frame.width, frame.height, self.width, self.height
            ))
            .into());
        }
        let pts = self.presentation_time_ns / 1000;
        let mut log = self.log.lock();
        log.encoder_frames.push(pts);
        log.last_surface_frame = Some((frame.width, frame.height));
        self.queue.lock().push_back(EncoderInput::Frame(pts));
        Ok(())
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.log.lock().surfaces_released += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_movie_layout() {
        let spec = MovieSpec {
            frame_count: 4,
            frame_interval_us: 100,
            audio_interval_us: 150,
            ..Default::default()
        };
        let source = sample_movie(&spec).unwrap();
        assert_eq!(source.tracks().len(), 2);
        assert_eq!(source.tracks()[0].width, Some(64));
        assert_eq!(source.tracks()[0].duration_us, Some(400));
        assert_eq!(source.track_samples(0).count(), 4);
        assert_eq!(source.track_samples(1).count(), 3);
        assert!(source.tracks()[1].is_audio());
    }

    #[test]
    fn test_catalog_lookup() {
        let codecs = FakeCodecs::surface();
        assert!(codecs.create_encoder("OMX.qcom.video.encoder.avc").is_ok());
        assert!(codecs.create_encoder("OMX.missing").is_err());
        assert!(codecs.create_decoder("video/avc").is_ok());
        assert!(codecs.create_decoder("video/hevc").is_err());
        let log = codecs.log();
        assert_eq!(log.encoders_created, 1);
        assert_eq!(log.decoders_created, 1);
    }

    #[test]
    fn test_encoder_emits_config_first() {
        let codecs = FakeCodecs::raw("OMX.fake.enc", vec![ColorFormat::Yuv420Planar]);
        let mut encoder = codecs.create_encoder("OMX.fake.enc").unwrap();
        let mut format = MediaFormat::video(MIME_VIDEO_AVC, 16, 16);
        format.color_format = Some(ColorFormat::Yuv420Planar);
        format.bitrate = Some(1000);
        encoder.configure(&format).unwrap();
        encoder.start().unwrap();

        let mut info = SampleInfo::default();
        let OutputStatus::Buffer(index) = encoder.dequeue_output_buffer(&mut info, 0).unwrap() else {
            panic!("expected codec config");
        };
        assert!(info.is_codec_config());
        assert_eq!(encoder.output_buffer(index).unwrap(), &FAKE_CODEC_CONFIG);
        encoder.release_output_buffer(index, false).unwrap();
        assert_eq!(
            encoder.dequeue_output_buffer(&mut info, 0).unwrap(),
            OutputStatus::TryAgainLater
        );

        let slot = encoder.dequeue_input_buffer(0).unwrap().unwrap();
        encoder
            .queue_input_buffer(slot, 0, 0, 7, SampleFlags::END_OF_STREAM)
            .unwrap();
        encoder.dequeue_output_buffer(&mut info, 0).unwrap();
        assert!(info.is_end_of_stream());
    }
}
