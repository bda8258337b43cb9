//! Runtime configuration for sensor sessions.
//!
//! Both structs deserialize with every field optional, so a config file only
//! needs to name the values it overrides:
//!
//! ```
//! use fingerlink_core::EnrollmentConfig;
//! use std::time::Duration;
//!
//! let config = EnrollmentConfig::default()
//!     .max_attempts(5)
//!     .transfer_timeout(Duration::from_secs(4));
//!
//! assert_eq!(config.max_attempts, 5);
//! assert_eq!(config.transfer_timeout_duration(), Duration::from_secs(4));
//! ```

use crate::constants::*;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How retrieved templates are rendered when published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateEncoding {
    /// Full template as lower-case hex.
    #[default]
    Hex,
    /// SHA-256 digest of the template, hex encoded.
    Sha256,
}

impl std::str::FromStr for TemplateEncoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hex" => Ok(TemplateEncoding::Hex),
            "sha256" | "digest" => Ok(TemplateEncoding::Sha256),
            other => Err(Error::Config(format!("Unknown template encoding: {other}"))),
        }
    }
}

/// Timing and retry parameters for enrollment, verification and downloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrollmentConfig {
    /// Deadline for a whole template transfer, in milliseconds.
    pub transfer_timeout_ms: u64,

    /// Deadline for a command acknowledgement, in milliseconds.
    pub ack_timeout_ms: u64,

    /// Transfer attempts per template.
    pub max_attempts: u8,

    /// Pause between failed transfer attempts, in milliseconds.
    pub retry_delay_ms: u64,

    /// Pause between identifiers during bulk download, in milliseconds.
    pub bulk_pacing_ms: u64,

    /// Maximum wait for finger placement or removal, in milliseconds.
    pub placement_timeout_ms: u64,

    /// Settle delay before polling for removal, in milliseconds.
    pub removal_settle_ms: u64,

    /// Interval between capture polls, in milliseconds.
    pub poll_interval_ms: u64,

    /// Number of model slots on the sensor.
    pub sensor_capacity: u16,

    /// Largest packet payload accepted by the reader.
    pub max_payload: usize,

    /// Rendering of published templates.
    pub template_encoding: TemplateEncoding,
}

impl Default for EnrollmentConfig {
    fn default() -> Self {
        Self {
            transfer_timeout_ms: DEFAULT_TRANSFER_TIMEOUT_MS,
            ack_timeout_ms: DEFAULT_ACK_TIMEOUT_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            bulk_pacing_ms: DEFAULT_BULK_PACING_MS,
            placement_timeout_ms: DEFAULT_PLACEMENT_TIMEOUT_MS,
            removal_settle_ms: DEFAULT_REMOVAL_SETTLE_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            sensor_capacity: DEFAULT_SENSOR_CAPACITY,
            max_payload: DEFAULT_MAX_PAYLOAD,
            template_encoding: TemplateEncoding::Hex,
        }
    }
}

impl EnrollmentConfig {
    /// Set the transfer deadline
    pub fn transfer_timeout(mut self, timeout: Duration) -> Self {
        self.transfer_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the number of transfer attempts
    pub fn max_attempts(mut self, attempts: u8) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the delay between transfer attempts
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Set the placement/removal deadline
    pub fn placement_timeout(mut self, timeout: Duration) -> Self {
        self.placement_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the sensor capacity
    pub fn sensor_capacity(mut self, capacity: u16) -> Self {
        self.sensor_capacity = capacity;
        self
    }

    /// Set the template rendering
    pub fn template_encoding(mut self, encoding: TemplateEncoding) -> Self {
        self.template_encoding = encoding;
        self
    }

    pub fn transfer_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.transfer_timeout_ms)
    }

    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    pub fn retry_delay_duration(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn bulk_pacing(&self) -> Duration {
        Duration::from_millis(self.bulk_pacing_ms)
    }

    pub fn placement_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.placement_timeout_ms)
    }

    pub fn removal_settle(&self) -> Duration {
        Duration::from_millis(self.removal_settle_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Check the values that would make the flows spin or never finish.
    ///
    /// # Errors
    /// Returns `Error::Config` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::Config("max_attempts must be at least 1".into()));
        }
        if self.transfer_timeout_ms == 0 || self.ack_timeout_ms == 0 {
            return Err(Error::Config("timeouts must be non-zero".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(Error::Config("poll_interval_ms must be non-zero".into()));
        }
        if self.sensor_capacity == 0 {
            return Err(Error::Config("sensor_capacity must be non-zero".into()));
        }
        if self.max_payload < TEMPLATE_SIZE / 4 {
            return Err(Error::Config(format!(
                "max_payload must be at least {}",
                TEMPLATE_SIZE / 4
            )));
        }
        Ok(())
    }
}

/// Serial link parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Port path, e.g. `/dev/ttyUSB0`
    pub port: String,

    /// Baud rate
    pub baud_rate: u32,

    /// Sensor device address
    pub address: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            address: DEFAULT_DEVICE_ADDRESS,
        }
    }
}

impl SerialConfig {
    /// Create a serial configuration for the given port path
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            ..Default::default()
        }
    }

    /// Set the baud rate
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set the device address
    pub fn address(mut self, address: u32) -> Self {
        self.address = address;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enrollment_config_defaults() {
        let config = EnrollmentConfig::default();

        assert_eq!(config.transfer_timeout_duration(), Duration::from_secs(10));
        assert_eq!(config.ack_timeout(), Duration::from_secs(1));
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.removal_settle(), Duration::from_secs(2));
        assert_eq!(config.sensor_capacity, 300);
        assert_eq!(config.max_payload, 1024);
        assert_eq!(config.template_encoding, TemplateEncoding::Hex);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_enrollment_config_fluent_api() {
        let config = EnrollmentConfig::default()
            .max_attempts(7)
            .retry_delay(Duration::from_millis(10))
            .placement_timeout(Duration::from_secs(3))
            .sensor_capacity(20)
            .template_encoding(TemplateEncoding::Sha256);

        assert_eq!(config.max_attempts, 7);
        assert_eq!(config.retry_delay_duration(), Duration::from_millis(10));
        assert_eq!(config.placement_timeout_duration(), Duration::from_secs(3));
        assert_eq!(config.sensor_capacity, 20);
        assert_eq!(config.template_encoding, TemplateEncoding::Sha256);
    }

    #[test]
    fn test_enrollment_config_validation() {
        assert!(EnrollmentConfig::default().max_attempts(0).validate().is_err());
        assert!(EnrollmentConfig::default().sensor_capacity(0).validate().is_err());

        let config = EnrollmentConfig {
            max_payload: 16,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_config_file() {
        let config: EnrollmentConfig =
            serde_json::from_str(r#"{"max_attempts": 9, "template_encoding": "sha256"}"#).unwrap();

        assert_eq!(config.max_attempts, 9);
        assert_eq!(config.template_encoding, TemplateEncoding::Sha256);
        assert_eq!(config.transfer_timeout_ms, DEFAULT_TRANSFER_TIMEOUT_MS);
    }

    #[test]
    fn test_template_encoding_parse() {
        assert_eq!("HEX".parse::<TemplateEncoding>().unwrap(), TemplateEncoding::Hex);
        assert_eq!(
            "digest".parse::<TemplateEncoding>().unwrap(),
            TemplateEncoding::Sha256
        );
        assert!("base32".parse::<TemplateEncoding>().is_err());
    }

    #[test]
    fn test_serial_config_builder() {
        let config = SerialConfig::new("/dev/ttyS1")
            .baud_rate(115_200)
            .address(0x1234_5678);

        assert_eq!(config.port, "/dev/ttyS1");
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.address, 0x1234_5678);
        assert_eq!(SerialConfig::default().baud_rate, DEFAULT_BAUD_RATE);
    }
}
