//! Types shared by sensor implementations.

use serde::{Deserialize, Serialize};

/// Generic device information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Device name (e.g. "/dev/ttyUSB0", "MockSensor").
    pub name: String,

    /// Device model identifier.
    pub model: String,

    /// Number of template slots, when known.
    pub capacity: Option<u16>,

    /// Optional firmware version string.
    pub firmware_version: Option<String>,
}

impl DeviceInfo {
    /// Create a new DeviceInfo with required fields.
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            capacity: None,
            firmware_version: None,
        }
    }

    /// Set the template capacity.
    pub fn with_capacity(mut self, capacity: u16) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Set the firmware version.
    pub fn with_firmware_version(mut self, firmware_version: impl Into<String>) -> Self {
        self.firmware_version = Some(firmware_version.into());
        self
    }
}
