//! Error types for encoder selection and pixel conversion.

use thiserror::Error;
use vidcompress_core::error::{CodecError, Error as CoreError};

/// Hardware acceleration error.
#[derive(Error, Debug)]
pub enum HwAccelError {
    /// No encoder advertises the MIME type.
    #[error("No encoder available for {0}")]
    NoEncoder(String),

    /// The selected encoder advertises no usable color format.
    #[error("Encoder {codec} advertises no supported color format")]
    NoColorFormat {
        /// Encoder name.
        codec: String,
    },

    /// Codec instance could not be created.
    #[error("Failed to create codec {0}")]
    CodecCreation(String),

    /// Pixel conversion failed.
    #[error("Pixel conversion failed: {0}")]
    Conversion(String),

    /// Configuration error.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result type for hardware acceleration operations.
pub type Result<T> = std::result::Result<T, HwAccelError>;

impl From<HwAccelError> for CoreError {
    fn from(err: HwAccelError) -> Self {
        match err {
            HwAccelError::NoEncoder(_) | HwAccelError::NoColorFormat { .. } => {
                CoreError::UnsupportedFormat(err.to_string())
            }
            HwAccelError::CodecCreation(msg) => CoreError::Codec(CodecError::Config(msg)),
            HwAccelError::Conversion(msg) => CoreError::Codec(CodecError::Surface(msg)),
            HwAccelError::Config(msg) => CoreError::Config(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_failures_are_unsupported_format() {
        let err: CoreError = HwAccelError::NoEncoder("video/avc".into()).into();
        assert!(matches!(err, CoreError::UnsupportedFormat(_)));

        let err: CoreError = HwAccelError::NoColorFormat {
            codec: "OMX.test.enc".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Unsupported format: Encoder OMX.test.enc advertises no supported color format"
        );
    }

    #[test]
    fn test_creation_failure_is_codec_error() {
        let err: CoreError = HwAccelError::CodecCreation("OMX.broken".into()).into();
        assert!(matches!(err, CoreError::Codec(CodecError::Config(_))));
    }
}
