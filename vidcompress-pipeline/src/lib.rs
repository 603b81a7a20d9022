//! Transcoding pipeline for vidcompress.
//!
//! Moves one source's video track through a decoder, a frame transform and
//! an encoder into a muxer, or copies compressed samples straight across
//! when no re-encode is needed.

mod config;
mod copier;
mod nal;
mod state;
mod transcode;
mod transform;
mod window;

pub mod testing;

pub use config::PipelineConfig;
pub use copier::{CopyOutcome, TrackCopier};
pub use nal::{split_parameter_sets, START_CODE};
pub use state::{next_step, CodecMachine, CodecState, PipelinePhase, Step};
pub use transcode::{encoder_output_format, TranscodeOutcome, TranscodePipeline, TranscodeRequest};
pub use transform::{
    draw_rotated, FrameTransform, GraphicsBackend, ImageQueue, SoftwareGraphics,
    SoftwareTransform, TransformSpec, DEFAULT_FRAME_WAIT,
};
pub use window::TimeWindow;
