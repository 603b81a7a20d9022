//! Codec collaborator traits.
//!
//! Decoders and encoders are driven through a buffer-queue API: the caller
//! dequeues an input slot, fills it, queues it back, and polls for output
//! with a bounded timeout. Every poll overwrites a caller-owned
//! [`SampleInfo`] instead of returning a fresh one.

use std::sync::Arc;
use vidcompress_core::error::Result;
use vidcompress_core::format::{ColorFormat, MediaFormat};
use vidcompress_core::sample::{SampleFlags, SampleInfo};

/// Static description of one codec available on the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecInfo {
    /// Driver name, e.g. `OMX.qcom.video.encoder.avc`.
    pub name: String,
    /// Whether this is an encoder.
    pub is_encoder: bool,
    /// MIME types the codec handles.
    pub supported_types: Vec<String>,
    /// Input color formats in the order the driver advertises them.
    pub color_formats: Vec<ColorFormat>,
}

impl CodecInfo {
    /// Describe an encoder.
    pub fn encoder(
        name: impl Into<String>,
        mime: impl Into<String>,
        color_formats: Vec<ColorFormat>,
    ) -> Self {
        Self {
            name: name.into(),
            is_encoder: true,
            supported_types: vec![mime.into()],
            color_formats,
        }
    }

    /// Describe a decoder.
    pub fn decoder(name: impl Into<String>, mime: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_encoder: false,
            supported_types: vec![mime.into()],
            color_formats: Vec::new(),
        }
    }

    /// Check if the codec handles `mime`, ignoring case.
    pub fn supports_type(&self, mime: &str) -> bool {
        self.supported_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(mime))
    }

    /// Check if the codec accepts GPU surface input.
    pub fn supports_surface_input(&self) -> bool {
        self.color_formats.contains(&ColorFormat::Surface)
    }
}

/// Result of polling a codec for output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputStatus {
    /// Nothing ready within the timeout.
    TryAgainLater,
    /// The output buffer set was reallocated.
    OutputBuffersChanged,
    /// The codec now produces this format.
    OutputFormatChanged(MediaFormat),
    /// Output buffer `index` is ready; its metadata was written to the
    /// caller's [`SampleInfo`].
    Buffer(usize),
}

/// Operations shared by decoders and encoders.
pub trait MediaCodec: Send {
    /// Codec name.
    fn name(&self) -> &str;

    /// Start processing after configuration.
    fn start(&mut self) -> Result<()>;

    /// Wait up to `timeout_us` for a free input slot.
    fn dequeue_input_buffer(&mut self, timeout_us: i64) -> Result<Option<usize>>;

    /// Writable memory of a dequeued input slot.
    fn input_buffer(&mut self, index: usize) -> Result<&mut [u8]>;

    /// Hand a filled input slot back to the codec.
    fn queue_input_buffer(
        &mut self,
        index: usize,
        offset: usize,
        size: usize,
        presentation_time_us: i64,
        flags: SampleFlags,
    ) -> Result<()>;

    /// Wait up to `timeout_us` for output.
    fn dequeue_output_buffer(&mut self, info: &mut SampleInfo, timeout_us: i64) -> Result<OutputStatus>;

    /// Return an output buffer. Decoders render it to their target when
    /// `render` is set; encoders ignore the flag.
    fn release_output_buffer(&mut self, index: usize, render: bool) -> Result<()>;

    /// Stop processing.
    fn stop(&mut self) -> Result<()>;

    /// Free the codec. Idempotent.
    fn release(&mut self);
}

/// One decoded picture delivered to a [`RenderTarget`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Presentation timestamp in microseconds.
    pub presentation_time_us: i64,
    /// RGBA pixels, row-major.
    pub pixels: Arc<[u8]>,
}

/// Surface a decoder renders into.
pub trait RenderTarget: Send + Sync {
    /// Accept a rendered picture.
    fn queue_image(&self, image: DecodedImage) -> Result<()>;
}

/// Video decoder rendering to a surface.
pub trait VideoDecoder: MediaCodec {
    /// Configure with the source track format and an output surface.
    fn configure(&mut self, format: &MediaFormat, target: Arc<dyn RenderTarget>) -> Result<()>;
}

/// A frame produced by the frame transform, ready for the encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFrame {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// RGBA pixels, row-major.
    pub pixels: Vec<u8>,
}

/// GPU surface feeding an encoder.
pub trait EncoderInputSurface: Send {
    /// Timestamp of the next submitted frame, in nanoseconds.
    fn set_presentation_time(&mut self, nanos: i64);

    /// Submit a frame to the encoder.
    fn swap_buffers(&mut self, frame: RenderedFrame) -> Result<()>;

    /// Free the surface. Idempotent.
    fn release(&mut self);
}

/// Video encoder.
pub trait VideoEncoder: MediaCodec {
    /// Configure with the output format.
    fn configure(&mut self, format: &MediaFormat) -> Result<()>;

    /// Create the surface input path. Must be called between
    /// [`VideoEncoder::configure`] and [`MediaCodec::start`].
    fn create_input_surface(&mut self) -> Result<Box<dyn EncoderInputSurface>>;

    /// End the stream on the surface input path.
    fn signal_end_of_input_stream(&mut self) -> Result<()>;

    /// Read-only view of a dequeued output buffer.
    fn output_buffer(&self, index: usize) -> Result<&[u8]>;
}

/// The device's codec list and codec factory.
pub trait CodecCatalog: Send + Sync {
    /// All codecs, in the device's enumeration order.
    fn codecs(&self) -> Vec<CodecInfo>;

    /// Instantiate an encoder by name.
    fn create_encoder(&self, name: &str) -> Result<Box<dyn VideoEncoder>>;

    /// Instantiate a decoder for `mime`.
    fn create_decoder(&self, mime: &str) -> Result<Box<dyn VideoDecoder>>;
}
