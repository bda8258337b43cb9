use std::time::Duration;

use fingerlink_core::{EnrollmentConfig, FeatureSlot, Stage, TemplateId};
use fingerlink_hardware::{SearchOutcome, SensorDevice};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::VerificationError;
use crate::placement::{WaitFailure, wait_for_finger};
use crate::report::Reporter;

/// Outcome of a verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Verification {
    Matched { id: TemplateId, confidence: u16 },
    NotFound,
}

/// Capture a finger once and search the sensor library for it.
#[derive(Debug, Clone)]
pub struct VerificationFlow {
    poll_interval: Duration,
    placement_timeout: Duration,
}

impl VerificationFlow {
    pub fn new(config: &EnrollmentConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            placement_timeout: config.placement_timeout_duration(),
        }
    }

    /// Run one verification.
    ///
    /// `NoFinger` is polled through until the placement timeout; every other
    /// sensor error ends the flow. The search itself is not retried.
    pub async fn verify<S, R>(
        &self,
        sensor: &mut S,
        reporter: &R,
    ) -> Result<Verification, VerificationError>
    where
        S: SensorDevice,
        R: Reporter + ?Sized,
    {
        let result = self.run(sensor, reporter).await;

        match &result {
            Ok(Verification::Matched { id, confidence }) => {
                info!(%id, confidence, "Fingerprint matched");
                let message = format!("Match found with ID: {id}");
                reporter.publish_status(Stage::Success, &message);
                reporter.publish_result(id.as_u16(), true, &message);
            }
            Ok(Verification::NotFound) => {
                info!("No matching fingerprint");
                reporter.publish_status(Stage::Error, "No match found");
                reporter.publish_result(0, false, "No match found");
            }
            Err(e) => {
                warn!(error = %e, "Verification failed");
                reporter.publish_status(Stage::Error, &e.to_string());
                reporter.publish_result(0, false, &e.to_string());
            }
        }

        result
    }

    async fn run<S, R>(
        &self,
        sensor: &mut S,
        reporter: &R,
    ) -> Result<Verification, VerificationError>
    where
        S: SensorDevice,
        R: Reporter + ?Sized,
    {
        reporter.publish_status(Stage::PlaceFinger, "Place finger for verification...");

        wait_for_finger(sensor, self.poll_interval, self.placement_timeout)
            .await
            .map_err(|failure| match failure {
                WaitFailure::TimedOut => VerificationError::PlacementTimeout {
                    waited_ms: self.placement_timeout.as_millis() as u64,
                },
                WaitFailure::Sensor(e) => VerificationError::Sensor(e),
            })?;

        sensor.image_to_feature(FeatureSlot::First).await?;

        Ok(match sensor.search().await? {
            SearchOutcome::Matched { id, confidence } => Verification::Matched { id, confidence },
            SearchOutcome::NotFound => Verification::NotFound,
        })
    }
}
