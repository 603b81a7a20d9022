//! Compressor configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use vidcompress_core::error::{Error, Result};
use vidcompress_hwaccel::DevicePlatform;
use vidcompress_pipeline::PipelineConfig;

/// Settings shared by every job a [`Compressor`](crate::Compressor) runs.
///
/// Loadable from TOML:
///
/// ```toml
/// delete_source_on_success = false
///
/// [pipeline]
/// frame_rate = 25
///
/// [platform]
/// manufacturer = "samsung"
/// model = "GT-I9300"
/// os_version = 18
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressorConfig {
    /// Transcode loop tuning.
    pub pipeline: PipelineConfig,
    /// Device the codecs run on.
    pub platform: DevicePlatform,
    /// Remove the source file once a job completes.
    pub delete_source_on_success: bool,
}

impl Default for CompressorConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            platform: DevicePlatform::default(),
            delete_source_on_success: true,
        }
    }
}

impl CompressorConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::Config(format!("{} not found", path.display())));
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Set the device platform.
    #[must_use]
    pub fn with_platform(mut self, platform: DevicePlatform) -> Self {
        self.platform = platform;
        self
    }

    /// Set the pipeline tuning.
    #[must_use]
    pub fn with_pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Keep or delete the source after success.
    #[must_use]
    pub fn delete_source_on_success(mut self, delete: bool) -> Self {
        self.delete_source_on_success = delete;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.pipeline.validate()?;
        if self.platform.manufacturer.trim().is_empty() {
            return Err(Error::Config("platform manufacturer is empty".into()));
        }
        Ok(())
    }
}
