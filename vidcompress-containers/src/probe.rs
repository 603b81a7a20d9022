//! Source metadata probing.

use crate::traits::{find_track, ContainerFactory};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use vidcompress_core::error::{ContainerError, Error, Result};
use vidcompress_core::format::Rotation;

/// Properties of the source video needed to plan a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Display width in pixels.
    pub width: u32,
    /// Display height in pixels.
    pub height: u32,
    /// Rotation stored in the source container.
    pub rotation: Rotation,
    /// Duration in microseconds.
    pub duration_us: i64,
}

/// Reads [`VideoMetadata`] from a file.
pub trait MetadataProbe: Send + Sync {
    /// Inspect the file at `path`.
    fn probe(&self, path: &Path) -> Result<VideoMetadata>;
}

/// Probe that reads the video track format through a [`ContainerFactory`].
pub struct ContainerProbe {
    factory: Arc<dyn ContainerFactory>,
}

impl ContainerProbe {
    /// Create a probe over the given factory.
    pub fn new(factory: Arc<dyn ContainerFactory>) -> Self {
        Self { factory }
    }
}

impl MetadataProbe for ContainerProbe {
    fn probe(&self, path: &Path) -> Result<VideoMetadata> {
        let mut demuxer = self.factory.open_demuxer(path)?;
        let result = (|| {
            let index = find_track(demuxer.as_ref(), false)
                .ok_or_else(|| Error::unreadable(format!("{} has no video track", path.display())))?;
            let format = demuxer.track_format(index)?;
            let width = format.width.ok_or(ContainerError::MissingKey("width"))?;
            let height = format.height.ok_or(ContainerError::MissingKey("height"))?;
            Ok(VideoMetadata {
                width,
                height,
                rotation: format.rotation.unwrap_or_default(),
                duration_us: format.duration_us.unwrap_or(0),
            })
        })();
        demuxer.release();

        if let Ok(metadata) = &result {
            debug!(
                path = %path.display(),
                width = metadata.width,
                height = metadata.height,
                rotation = metadata.rotation.degrees(),
                duration_us = metadata.duration_us,
                "Probed source"
            );
        }
        result
    }
}
