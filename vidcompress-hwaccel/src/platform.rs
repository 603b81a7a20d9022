//! Description of the device a job runs on.

use serde::{Deserialize, Serialize};

/// First OS version whose encoders accept GPU surface input.
pub const SURFACE_INPUT_MIN_VERSION: u32 = 18;

/// First OS version on which rotation moves from container metadata to the
/// rendered frame.
pub const ROTATION_RENDER_MIN_VERSION: u32 = 21;

/// Manufacturer, model and OS version of the running device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevicePlatform {
    /// Manufacturer, compared lowercase.
    pub manufacturer: String,
    /// Model name, informational only.
    pub model: String,
    /// OS API level.
    pub os_version: u32,
}

impl Default for DevicePlatform {
    fn default() -> Self {
        Self {
            manufacturer: "generic".to_string(),
            model: "generic".to_string(),
            os_version: ROTATION_RENDER_MIN_VERSION,
        }
    }
}

impl DevicePlatform {
    /// Describe a device. The manufacturer is normalized to lowercase.
    pub fn new(manufacturer: impl Into<String>, model: impl Into<String>, os_version: u32) -> Self {
        Self {
            manufacturer: manufacturer.into().to_lowercase(),
            model: model.into(),
            os_version,
        }
    }

    /// Lowercase manufacturer.
    pub fn manufacturer(&self) -> String {
        self.manufacturer.to_lowercase()
    }

    /// Whether encoders can take frames from a GPU surface.
    pub fn supports_surface_input(&self) -> bool {
        self.os_version >= SURFACE_INPUT_MIN_VERSION
    }

    /// Whether quarter-turn rotation is applied at render time.
    pub fn renders_rotation(&self) -> bool {
        self.os_version >= ROTATION_RENDER_MIN_VERSION
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_thresholds() {
        assert!(!DevicePlatform::new("lge", "G2", 17).supports_surface_input());
        assert!(DevicePlatform::new("lge", "G2", 18).supports_surface_input());
        assert!(!DevicePlatform::new("lge", "G2", 20).renders_rotation());
        assert!(DevicePlatform::new("lge", "G2", 21).renders_rotation());
    }

    #[test]
    fn test_manufacturer_is_lowercase() {
        let platform = DevicePlatform::new("Nokia", "X", 16);
        assert_eq!(platform.manufacturer, "nokia");

        let deserialized = DevicePlatform {
            manufacturer: "LGE".into(),
            ..Default::default()
        };
        assert_eq!(deserialized.manufacturer(), "lge");
    }
}
