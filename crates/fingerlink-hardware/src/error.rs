//! Error types for sensor operations.
//!
//! Two layers are kept apart:
//!
//! - [`HardwareError`] covers the link to the device: disconnection,
//!   timeouts, malformed packets, I/O.
//! - [`SensorError`] covers what the sensor itself reports through a
//!   confirmation code, plus a [`SensorError::Link`] variant wrapping any
//!   [`HardwareError`] so callers handle a single error set.

use fingerlink_protocol::{ConfirmationCode, Instruction, ProtocolError, StreamError};

/// Result type alias for link-level operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Result type alias for sensor operations.
pub type SensorResult<T> = std::result::Result<T, SensorError>;

/// Errors that can occur on the link to a device.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Device is not connected or has been disconnected.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Operation timed out after specified duration.
    #[error("Operation timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Device communication error.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// Invalid data received from device.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Device initialization failed.
    #[error("Initialization failed: {message}")]
    InitializationFailed { message: String },

    /// Packet could not be interpreted.
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Byte stream failure.
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HardwareError {
    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    /// Create a new invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Create a new initialization failed error.
    pub fn initialization_failed(message: impl Into<String>) -> Self {
        Self::InitializationFailed {
            message: message.into(),
        }
    }
}

/// Rejections reported by the sensor, and link failures around them.
#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("Sensor failed to receive the command packet")]
    PacketReceive,

    #[error("No finger on the sensor")]
    NoFinger,

    #[error("Failed to capture a finger image")]
    ImageFail,

    #[error("Finger image too messy to process")]
    ImageMessy,

    #[error("Too few feature points in finger image")]
    FeatureFail,

    #[error("Fingerprints do not match")]
    NoMatch,

    #[error("No matching fingerprint in library")]
    NotFound,

    #[error("Failed to combine feature buffers into a model")]
    EnrollMismatch,

    #[error("Template slot out of range")]
    BadLocation,

    #[error("Failed to read template from library")]
    DbReadFail,

    #[error("Failed to upload feature buffer")]
    UploadFeatureFail,

    #[error("Sensor could not receive the following data packets")]
    PacketResponseFail,

    #[error("Failed to upload image")]
    UploadFail,

    #[error("Failed to delete template")]
    DeleteFail,

    #[error("Failed to clear template library")]
    DbClearFail,

    #[error("No valid primary image")]
    InvalidImage,

    #[error("Error writing to flash")]
    FlashError,

    #[error("Invalid register number")]
    InvalidRegister,

    #[error("Unknown confirmation code 0x{0:02X}")]
    Unknown(u8),

    /// No acknowledgement arrived for a command.
    #[error("No acknowledgement for {instruction} within {timeout_ms}ms")]
    AckTimeout {
        instruction: Instruction,
        timeout_ms: u64,
    },

    /// The link to the sensor failed.
    #[error(transparent)]
    Link(#[from] HardwareError),
}

impl SensorError {
    /// Map a confirmation code to an error; `None` for success.
    pub fn from_code(code: ConfirmationCode) -> Option<Self> {
        let error = match code {
            ConfirmationCode::Ok => return None,
            ConfirmationCode::PacketReceiveError => Self::PacketReceive,
            ConfirmationCode::NoFinger => Self::NoFinger,
            ConfirmationCode::ImageFail => Self::ImageFail,
            ConfirmationCode::ImageMessy => Self::ImageMessy,
            ConfirmationCode::FeatureFail => Self::FeatureFail,
            ConfirmationCode::NoMatch => Self::NoMatch,
            ConfirmationCode::NotFound => Self::NotFound,
            ConfirmationCode::EnrollMismatch => Self::EnrollMismatch,
            ConfirmationCode::BadLocation => Self::BadLocation,
            ConfirmationCode::DbReadFail => Self::DbReadFail,
            ConfirmationCode::UploadFeatureFail => Self::UploadFeatureFail,
            ConfirmationCode::PacketResponseFail => Self::PacketResponseFail,
            ConfirmationCode::UploadFail => Self::UploadFail,
            ConfirmationCode::DeleteFail => Self::DeleteFail,
            ConfirmationCode::DbClearFail => Self::DbClearFail,
            ConfirmationCode::InvalidImage => Self::InvalidImage,
            ConfirmationCode::FlashError => Self::FlashError,
            ConfirmationCode::InvalidRegister => Self::InvalidRegister,
            ConfirmationCode::Unknown(value) => Self::Unknown(value),
        };
        Some(error)
    }

    /// Confirmation code behind this error, if it came from the sensor.
    pub fn code(&self) -> Option<ConfirmationCode> {
        let code = match self {
            Self::PacketReceive => ConfirmationCode::PacketReceiveError,
            Self::NoFinger => ConfirmationCode::NoFinger,
            Self::ImageFail => ConfirmationCode::ImageFail,
            Self::ImageMessy => ConfirmationCode::ImageMessy,
            Self::FeatureFail => ConfirmationCode::FeatureFail,
            Self::NoMatch => ConfirmationCode::NoMatch,
            Self::NotFound => ConfirmationCode::NotFound,
            Self::EnrollMismatch => ConfirmationCode::EnrollMismatch,
            Self::BadLocation => ConfirmationCode::BadLocation,
            Self::DbReadFail => ConfirmationCode::DbReadFail,
            Self::UploadFeatureFail => ConfirmationCode::UploadFeatureFail,
            Self::PacketResponseFail => ConfirmationCode::PacketResponseFail,
            Self::UploadFail => ConfirmationCode::UploadFail,
            Self::DeleteFail => ConfirmationCode::DeleteFail,
            Self::DbClearFail => ConfirmationCode::DbClearFail,
            Self::InvalidImage => ConfirmationCode::InvalidImage,
            Self::FlashError => ConfirmationCode::FlashError,
            Self::InvalidRegister => ConfirmationCode::InvalidRegister,
            Self::Unknown(value) => ConfirmationCode::Unknown(*value),
            Self::AckTimeout { .. } | Self::Link(_) => return None,
        };
        Some(code)
    }

    /// Whether the failure lies in the link rather than the sensor's answer.
    pub fn is_link(&self) -> bool {
        matches!(self, Self::AckTimeout { .. } | Self::Link(_))
    }
}

impl From<ProtocolError> for SensorError {
    fn from(error: ProtocolError) -> Self {
        Self::Link(HardwareError::Protocol(error))
    }
}

impl From<StreamError> for SensorError {
    fn from(error: StreamError) -> Self {
        Self::Link(HardwareError::Stream(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_disconnected_error() {
        let error = HardwareError::disconnected("/dev/ttyUSB0");
        assert!(matches!(error, HardwareError::Disconnected { .. }));
        assert_eq!(error.to_string(), "Device disconnected: /dev/ttyUSB0");
    }

    #[test]
    fn test_timeout_error() {
        let error = HardwareError::timeout(3000);
        assert_eq!(error.to_string(), "Operation timeout after 3000ms");
    }

    #[rstest]
    #[case(0x01)]
    #[case(0x02)]
    #[case(0x0A)]
    #[case(0x0C)]
    #[case(0x15)]
    #[case(0x18)]
    #[case(0x77)]
    fn test_code_mapping_is_reversible(#[case] byte: u8) {
        let code = ConfirmationCode::from(byte);
        let error = SensorError::from_code(code).unwrap();
        assert_eq!(error.code(), Some(code));
        assert!(!error.is_link());
    }

    #[test]
    fn test_ok_is_not_an_error() {
        assert!(SensorError::from_code(ConfirmationCode::Ok).is_none());
    }

    #[test]
    fn test_link_errors() {
        let error = SensorError::from(StreamError::Closed);
        assert!(error.is_link());
        assert_eq!(error.code(), None);
        assert_eq!(error.to_string(), "Stream error: Stream closed");

        let error = SensorError::AckTimeout {
            instruction: Instruction::GenImg,
            timeout_ms: 1000,
        };
        assert_eq!(
            error.to_string(),
            "No acknowledgement for GenImg(0x01) within 1000ms"
        );
    }
}
