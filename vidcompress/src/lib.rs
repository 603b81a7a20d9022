//! # vidcompress
//!
//! Batch video compression: re-encode the video track of a file at a new
//! resolution, bitrate and rotation, copy its audio track, and report
//! progress as a `(processed, total)` duration pair.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::{mpsc, Arc};
//! use vidcompress::{Collaborators, CompressionOptions, Compressor, SoftwareGraphics};
//! # fn platform() -> (Arc<dyn vidcompress::ContainerFactory>, Arc<dyn vidcompress::CodecCatalog>) { unimplemented!() }
//!
//! fn main() -> vidcompress::Result<()> {
//!     let (containers, codecs) = platform();
//!     let compressor = Compressor::new(Collaborators::new(
//!         containers,
//!         codecs,
//!         Arc::new(SoftwareGraphics::new()),
//!     ));
//!
//!     let (tx, rx) = mpsc::channel::<vidcompress::ProgressEvent>();
//!     let handle = compressor.compress(
//!         "input.mp4",
//!         "output.mp4",
//!         CompressionOptions::new().bitrate(1_500_000),
//!         Box::new(tx),
//!     )?;
//!     for event in rx {
//!         println!("{event:?}");
//!     }
//!     let report = handle.join()?;
//!     println!("{}x{}", report.params.width, report.params.height);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several crates:
//! - `vidcompress-core`: errors, sample metadata, formats and progress
//! - `vidcompress-containers`: demuxer/muxer contracts and metadata probing
//! - `vidcompress-hwaccel`: codec contracts, encoder selection and vendor quirks
//! - `vidcompress-pipeline`: the transcode loop and the track copier
//!
//! This crate resolves output parameters and sequences one job.

mod compressor;
mod config;
mod job;
mod options;
mod params;

pub use vidcompress_core::{
    CancellationToken, CodecError, ContainerError, Error, MediaFormat, MuxerError, Result,
    Rotation, Track,
};
pub use vidcompress_core::progress::{
    CallbackSink, CompressionProgress, NullSink, Outcome, ProgressEvent, ProgressRecorder,
    ProgressSink,
};
pub use vidcompress_containers::{
    ContainerFactory, ContainerProbe, Demuxer, MetadataProbe, MovieSettings, Muxer, VideoMetadata,
};
pub use vidcompress_hwaccel::{CodecCatalog, DevicePlatform};
pub use vidcompress_pipeline::{GraphicsBackend, PipelineConfig, SoftwareGraphics, TimeWindow};

pub use compressor::{Collaborators, CompressionHandle, Compressor};
pub use config::CompressorConfig;
pub use job::{CompressionJob, CompressionReport, TrackSummary};
pub use options::CompressionOptions;
pub use params::{
    bitrate_for, normalize_rotation, resolve_height, resolve_width, round_to_standard,
    Orientation, ResolvedParameters, DEFAULT_BITRATE, STANDARD_HEIGHTS, STANDARD_WIDTHS,
};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string.
pub fn version() -> &'static str {
    VERSION
}
