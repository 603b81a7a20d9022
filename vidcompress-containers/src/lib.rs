//! Container collaborators for demuxing and muxing.
//!
//! The byte-level container format is supplied by the embedding
//! application through [`ContainerFactory`]. This crate defines the
//! contracts, a metadata probe built on them and an in-memory container
//! used by tests and by callers that already hold decoded sample tables.

pub mod memory;
pub mod probe;
pub mod traits;

pub use memory::{
    MemoryContainerFactory, MemoryDemuxer, MemoryMuxer, MemorySource, MuxedMovie,
    MuxedMovieHandle, MuxedSample, MuxedTrack, MuxerFaults, StoredSample,
};
pub use probe::{ContainerProbe, MetadataProbe, VideoMetadata};
pub use traits::{find_track, ContainerFactory, Demuxer, MovieSettings, Muxer, SeekMode};
