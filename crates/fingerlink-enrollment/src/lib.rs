//! Enrollment, verification and template download flows.
//!
//! Everything in this crate drives a sensor through the
//! [`SensorDevice`](fingerlink_hardware::SensorDevice) trait and reports
//! progress through a [`Reporter`]:
//!
//! - [`EnrollmentCoordinator`] - two-capture enrollment state machine that
//!   stores the model, bumps the enrolled count and retrieves the template
//! - [`VerificationFlow`] - capture once and search the sensor library
//! - [`DownloadDriver`] - retried single-template and bulk retrieval
//! - [`EnrolledCounter`] - durable count of enrolled templates
//!
//! # Example
//!
//! ```
//! use fingerlink_core::{EnrollmentConfig, TemplateId};
//! use fingerlink_enrollment::{ChannelReporter, EnrolledCounter, EnrollmentCoordinator};
//! use fingerlink_hardware::mock::MockSensor;
//! use fingerlink_storage::MemoryStore;
//!
//! # #[tokio::main(flavor = "current_thread", start_paused = true)]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let (mut sensor, handle) = MockSensor::new();
//! handle.script_enrollment(vec![7; 64], vec![7; 64]).await;
//!
//! let (reporter, _events) = ChannelReporter::new();
//! let counter = EnrolledCounter::load(MemoryStore::new()).await?;
//! let mut coordinator = EnrollmentCoordinator::new(EnrollmentConfig::default(), counter);
//!
//! let enrollment = coordinator
//!     .enroll(&mut sensor, &reporter, TemplateId::new(1)?)
//!     .await?;
//! assert_eq!(enrollment.enrolled_count, 1);
//! # Ok(())
//! # }
//! ```

pub mod coordinator;
pub mod counter;
pub mod download;
pub mod error;
mod placement;
pub mod report;
pub mod state;
pub mod verification;

pub use coordinator::{Enrollment, EnrollmentCoordinator};
pub use counter::EnrolledCounter;
pub use download::{BulkFailure, BulkReport, DownloadDriver};
pub use error::{DownloadError, EnrollmentError, VerificationError};
pub use report::{ChannelReporter, Envelope, ReportEvent, Reporter};
pub use state::{EnrollmentSession, EnrollmentState, StateTransition};
pub use verification::{Verification, VerificationFlow};
