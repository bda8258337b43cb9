//! Fingerprint sensor drivers.
//!
//! This crate provides the production driver for R30x-family optical
//! modules, which speak the `EF 01` packet protocol over a serial port.
//! For the mock used in development and testing, see
//! `fingerlink_hardware::mock`.
//!
//! - [`port`] bridges a blocking serial port into a [`ChannelStream`](fingerlink_protocol::ChannelStream)
//! - [`sensor`] implements [`SensorDevice`](fingerlink_hardware::SensorDevice) on top of any byte stream
//! - [`devices`] dispatches between the real and the mock sensor
//!
//! ```no_run
//! use fingerlink_biometric::open_serial_sensor;
//! use fingerlink_core::{EnrollmentConfig, SerialConfig};
//! use fingerlink_hardware::SensorDevice;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let serial = SerialConfig::new("/dev/ttyUSB0");
//!     let (mut sensor, _bridge) = open_serial_sensor(&serial, &EnrollmentConfig::default())?;
//!     println!("{} templates stored", sensor.template_count().await?);
//!     Ok(())
//! }
//! ```

pub mod devices;
pub mod port;
pub mod sensor;

pub use devices::AnySensorDevice;
pub use port::{SerialBridge, open_port};
pub use sensor::{SerialSensor, open_serial_sensor};
