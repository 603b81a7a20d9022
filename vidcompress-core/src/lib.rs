//! # Vidcompress Core
//!
//! Core types shared by every vidcompress component:
//! - Error taxonomy for compression jobs
//! - Buffer metadata (`SampleInfo`, `SampleFlags`)
//! - Track format descriptors and encoder color formats
//! - Progress values, sinks and the ordering-enforcing reporter
//! - Cooperative cancellation

pub mod cancel;
pub mod error;
pub mod format;
pub mod progress;
pub mod sample;

pub use cancel::CancellationToken;
pub use error::{CodecError, ContainerError, Error, MuxerError, Result};
pub use format::{ColorFormat, MediaFormat, Rotation, Track, MIME_VIDEO_AVC};
pub use progress::{
    CallbackSink, CompressionProgress, NullSink, Outcome, ProgressEvent, ProgressRecorder,
    ProgressReporter, ProgressSink,
};
pub use sample::{SampleFlags, SampleInfo};
