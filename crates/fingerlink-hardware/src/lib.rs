//! Sensor abstraction layer for the fingerprint module.
//!
//! This crate defines what the enrollment flows may ask of a fingerprint
//! sensor, independent of how the sensor is reached:
//!
//! - **Async-first**: operations are native `async fn` in traits (Edition 2024).
//! - **Tagged outcomes**: expected negative answers (no finger, mismatch,
//!   no match) are outcome variants, not errors.
//! - **One error set**: every rejection the sensor can report maps to a
//!   [`SensorError`] variant; link failures are wrapped as [`HardwareError`].
//!
//! # Sensor Device
//!
//! ```no_run
//! use fingerlink_core::FeatureSlot;
//! use fingerlink_hardware::{CaptureOutcome, SensorDevice, SensorResult};
//!
//! async fn capture_into_first_slot<S: SensorDevice>(sensor: &mut S) -> SensorResult<bool> {
//!     match sensor.capture_image().await? {
//!         CaptureOutcome::Captured => {
//!             sensor.image_to_feature(FeatureSlot::First).await?;
//!             Ok(true)
//!         }
//!         CaptureOutcome::NoFinger => Ok(false),
//!     }
//! }
//! ```
//!
//! # Mock Implementation
//!
//! [`mock::MockSensor`] simulates the module in memory, including template
//! uploads over its own byte stream, so flows can be tested end to end
//! without a serial port. The real driver lives in `fingerlink-biometric`.

pub mod error;
pub mod mock;
pub mod traits;
pub mod types;

pub use error::{HardwareError, Result, SensorError, SensorResult};
pub use traits::{BuildOutcome, CaptureOutcome, SearchOutcome, SensorDevice};
pub use types::DeviceInfo;
