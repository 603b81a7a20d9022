//! Error types for the vidcompress library.
//!
//! The top-level [`Error`] mirrors the failure classes a compression job can
//! report. Codec, container and muxer faults carry their own enums so callers
//! can match on the stage that failed.

use thiserror::Error;

/// Main error type for the vidcompress library.
#[derive(Error, Debug)]
pub enum Error {
    /// Input path could not be opened or read.
    #[error("Unreadable source: {0}")]
    UnreadableSource(String),

    /// No usable encoder or color format for the target MIME type.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Fatal status from the decoder or encoder.
    #[error("Codec failure: {0}")]
    Codec(#[from] CodecError),

    /// Destination container failure (sample write or finalize).
    #[error("Muxer failure: {0}")]
    Muxer(#[from] MuxerError),

    /// Source container failure while reading samples.
    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    /// The requested window selected no video frames.
    #[error("Empty result: no video frames fall inside the requested window")]
    EmptyResult,

    /// Invalid parameter provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation was cancelled.
    #[error("Operation cancelled")]
    Cancelled,

    /// The worker thread running a job panicked.
    #[error("Worker panicked: {0}")]
    WorkerPanicked(String),

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Codec errors raised by decoders and encoders.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The codec could not be created or configured.
    #[error("Codec configuration error: {0}")]
    Config(String),

    /// Unexpected status returned while dequeuing a buffer.
    #[error("Unexpected status from {stage}: {status}")]
    UnexpectedStatus { stage: &'static str, status: i32 },

    /// Output buffer reported as ready but not accessible.
    #[error("Output buffer {index} was not available from {stage}")]
    MissingBuffer { stage: &'static str, index: usize },

    /// Input buffer index out of range or not dequeued.
    #[error("Invalid input buffer {0}")]
    InvalidInputBuffer(usize),

    /// Codec used after release or before start.
    #[error("Codec not started")]
    NotStarted,

    /// Codec reported that the operation should be retried.
    #[error("Try again later")]
    TryAgain,

    /// Surface or frame transform failure.
    #[error("Surface error: {0}")]
    Surface(String),

    /// Generic codec error message.
    #[error("{0}")]
    Other(String),
}

impl From<String> for CodecError {
    fn from(s: String) -> Self {
        CodecError::Other(s)
    }
}

impl From<&str> for CodecError {
    fn from(s: &str) -> Self {
        CodecError::Other(s.to_string())
    }
}

/// Source container errors.
#[derive(Error, Debug)]
pub enum ContainerError {
    /// Track index does not exist.
    #[error("Track {index} not found")]
    TrackNotFound { index: usize },

    /// A second track was selected while another one is active.
    #[error("Track {requested} selected while track {active} is active")]
    TrackAlreadySelected { active: usize, requested: usize },

    /// Read buffer is smaller than the sample.
    #[error("Buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },

    /// Seek operation failed.
    #[error("Seek failed: {0}")]
    SeekFailed(String),

    /// Track format lacks a required field.
    #[error("Missing format key: {0}")]
    MissingKey(&'static str),

    /// Generic container error message.
    #[error("{0}")]
    Other(String),
}

impl From<String> for ContainerError {
    fn from(s: String) -> Self {
        ContainerError::Other(s)
    }
}

impl From<&str> for ContainerError {
    fn from(s: &str) -> Self {
        ContainerError::Other(s.to_string())
    }
}

/// Destination container errors.
#[derive(Error, Debug)]
pub enum MuxerError {
    /// Sample written to an unregistered track.
    #[error("Track {0} was never added")]
    UnknownTrack(usize),

    /// Sample kind disagrees with the registered track.
    #[error("Track {0} is not of the declared kind")]
    KindMismatch(usize),

    /// Muxer already finalized.
    #[error("Muxer already finalized")]
    AlreadyFinalized,

    /// Writing a sample failed.
    #[error("Sample write failed: {0}")]
    Write(String),

    /// Finalizing the container failed.
    #[error("Finalize failed: {0}")]
    Finalize(String),

    /// I/O errors from the container writer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an invalid parameter error.
    pub fn invalid_param(msg: impl Into<String>) -> Self {
        Error::InvalidParameter(msg.into())
    }

    /// Create an unsupported format error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Error::UnsupportedFormat(msg.into())
    }

    /// Create an unreadable source error.
    pub fn unreadable(msg: impl Into<String>) -> Self {
        Error::UnreadableSource(msg.into())
    }

    /// `false` only for warning-class outcomes; the output file is still valid.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::EmptyResult)
    }

    /// Per-buffer anomalies that the poll loop retries instead of surfacing.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Codec(CodecError::TryAgain))
    }

    /// Check if this is a cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidParameter("width".into());
        assert_eq!(err.to_string(), "Invalid parameter: width");

        let err = Error::Codec(CodecError::UnexpectedStatus {
            stage: "encoder",
            status: -42,
        });
        assert_eq!(
            err.to_string(),
            "Codec failure: Unexpected status from encoder: -42"
        );
    }

    #[test]
    fn test_muxer_error_conversion() {
        let err: Error = MuxerError::AlreadyFinalized.into();
        assert!(matches!(err, Error::Muxer(MuxerError::AlreadyFinalized)));
    }

    #[test]
    fn test_empty_result_is_warning() {
        assert!(!Error::EmptyResult.is_fatal());
        assert!(Error::Cancelled.is_fatal());
        assert!(Error::unsupported("no encoder").is_fatal());
    }

    #[test]
    fn test_is_transient() {
        assert!(Error::Codec(CodecError::TryAgain).is_transient());
        assert!(!Error::Codec(CodecError::NotStarted).is_transient());
        assert!(!Error::EmptyResult.is_transient());
    }
}
