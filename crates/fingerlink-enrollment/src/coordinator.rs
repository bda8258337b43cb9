//! Two-capture enrollment.
//!
//! [`EnrollmentCoordinator::enroll`] walks an [`EnrollmentSession`] through
//! the states in [`crate::state`], reporting a status on every state entry:
//!
//! | State | Sensor work | On failure |
//! |---|---|---|
//! | AwaitFirstPlacement | poll `capture_image` | timeout or sensor error |
//! | CaptureFirst | `image_to_feature(First)` | sensor error |
//! | AwaitRemoval | settle, poll until no finger | timeout or link error |
//! | AwaitSecondPlacement | poll `capture_image` | timeout or sensor error |
//! | CaptureSecond | `image_to_feature(Second)` | sensor error |
//! | BuildModel | `build_model` | mismatch, never retried |
//! | PersistModel | `store_model(id)`, count + 1 | sensor or storage error |
//! | RetrieveTemplate | `download_one(id)` | retrieval error |
//!
//! A stored model stays in the sensor library when a later step fails.

use std::time::Duration;

use fingerlink_core::{EnrollmentConfig, FeatureSlot, Stage, TemplateId, TemplatePayload};
use fingerlink_hardware::{BuildOutcome, SensorDevice};
use fingerlink_storage::DurableStore;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::counter::EnrolledCounter;
use crate::download::DownloadDriver;
use crate::error::EnrollmentError;
use crate::placement::{WaitFailure, wait_for_finger, wait_for_removal};
use crate::report::Reporter;
use crate::state::{EnrollmentSession, EnrollmentState, StateTransition};

/// A finished enrollment.
#[derive(Debug, Clone)]
pub struct Enrollment {
    pub id: TemplateId,
    pub template: TemplatePayload,
    /// Enrolled count after this enrollment was persisted.
    pub enrolled_count: u64,
    pub history: Vec<StateTransition>,
}

/// Runs enrollments and owns the enrolled count.
#[derive(Debug)]
pub struct EnrollmentCoordinator<D: DurableStore> {
    config: EnrollmentConfig,
    counter: EnrolledCounter<D>,
    downloader: DownloadDriver,
}

impl<D: DurableStore> EnrollmentCoordinator<D> {
    pub fn new(config: EnrollmentConfig, counter: EnrolledCounter<D>) -> Self {
        let downloader = DownloadDriver::new(&config);
        Self {
            config,
            counter,
            downloader,
        }
    }

    pub fn config(&self) -> &EnrollmentConfig {
        &self.config
    }

    pub fn counter(&self) -> &EnrolledCounter<D> {
        &self.counter
    }

    pub fn counter_mut(&mut self) -> &mut EnrolledCounter<D> {
        &mut self.counter
    }

    pub fn downloader_mut(&mut self) -> &mut DownloadDriver {
        &mut self.downloader
    }

    /// Enroll a finger at `id`.
    ///
    /// On success the model is stored, the enrolled count is incremented and
    /// persisted, and the template has been published. On failure an error
    /// status and a failed result are published before returning.
    pub async fn enroll<S, R>(
        &mut self,
        sensor: &mut S,
        reporter: &R,
        id: TemplateId,
    ) -> Result<Enrollment, EnrollmentError>
    where
        S: SensorDevice,
        R: Reporter + ?Sized,
    {
        let mut session = EnrollmentSession::new(id);
        info!(%id, "Starting enrollment");

        let result = match TemplateId::with_capacity(id.as_u16(), self.config.sensor_capacity) {
            Ok(_) => self.run(sensor, reporter, &mut session).await,
            Err(e) => Err(EnrollmentError::from(e)),
        };

        match result {
            Ok(template) => {
                reporter.publish_result(id.as_u16(), true, "Enrollment complete.");
                info!(%id, count = self.counter.get(), "Enrollment complete");
                Ok(Enrollment {
                    id,
                    template,
                    enrolled_count: self.counter.get(),
                    history: session.history().to_vec(),
                })
            }
            Err(e) => {
                let state = session.state();
                session.abort();
                if e.model_stored() {
                    warn!(%id, error = %e, "Enrollment failed after model was stored");
                } else {
                    error!(%id, %state, error = %e, "Enrollment failed");
                }
                reporter.publish_status(Stage::Error, &e.to_string());
                reporter.publish_result(id.as_u16(), false, &e.to_string());
                Err(e)
            }
        }
    }

    async fn run<S, R>(
        &mut self,
        sensor: &mut S,
        reporter: &R,
        session: &mut EnrollmentSession,
    ) -> Result<TemplatePayload, EnrollmentError>
    where
        S: SensorDevice,
        R: Reporter + ?Sized,
    {
        let id = session.id();
        let poll = self.config.poll_interval();
        let placement = self.config.placement_timeout_duration();

        advance(session, reporter, EnrollmentState::AwaitFirstPlacement)?;
        wait_for_finger(sensor, poll, placement)
            .await
            .map_err(|f| wait_error(EnrollmentState::AwaitFirstPlacement, f, placement))?;

        advance(session, reporter, EnrollmentState::CaptureFirst)?;
        sensor
            .image_to_feature(FeatureSlot::First)
            .await
            .map_err(|e| EnrollmentError::sensor(EnrollmentState::CaptureFirst, e))?;

        advance(session, reporter, EnrollmentState::AwaitRemoval)?;
        sleep(self.config.removal_settle()).await;
        wait_for_removal(sensor, poll, placement)
            .await
            .map_err(|f| wait_error(EnrollmentState::AwaitRemoval, f, placement))?;

        advance(session, reporter, EnrollmentState::AwaitSecondPlacement)?;
        wait_for_finger(sensor, poll, placement)
            .await
            .map_err(|f| wait_error(EnrollmentState::AwaitSecondPlacement, f, placement))?;

        advance(session, reporter, EnrollmentState::CaptureSecond)?;
        sensor
            .image_to_feature(FeatureSlot::Second)
            .await
            .map_err(|e| EnrollmentError::sensor(EnrollmentState::CaptureSecond, e))?;

        advance(session, reporter, EnrollmentState::BuildModel)?;
        match sensor.build_model().await {
            Ok(BuildOutcome::Built) => debug!(%id, "Model built"),
            Ok(BuildOutcome::Mismatch) => return Err(EnrollmentError::Mismatch),
            Err(e) => return Err(EnrollmentError::sensor(EnrollmentState::BuildModel, e)),
        }

        advance(session, reporter, EnrollmentState::PersistModel)?;
        sensor
            .store_model(id)
            .await
            .map_err(|e| EnrollmentError::sensor(EnrollmentState::PersistModel, e))?;
        let count = self.counter.increment().await?;
        reporter.publish_status(Stage::Stored, "Model stored.");
        reporter.publish_count(count);

        advance(session, reporter, EnrollmentState::RetrieveTemplate)?;
        let template = self
            .downloader
            .download_one(sensor, reporter, id.as_u16(), self.config.max_attempts)
            .await
            .map_err(|source| EnrollmentError::Retrieval { id, source })?;

        advance(session, reporter, EnrollmentState::Complete)?;
        Ok(template)
    }
}

/// Enter `next` and report its status.
fn advance<R: Reporter + ?Sized>(
    session: &mut EnrollmentSession,
    reporter: &R,
    next: EnrollmentState,
) -> Result<(), EnrollmentError> {
    let transition = session.transition_to(next)?;
    debug!(from = %transition.from, to = %transition.to, "Enrollment state change");

    if let Some((stage, message)) = next.entry_status() {
        reporter.publish_status(stage, message);
    }
    Ok(())
}

fn wait_error(state: EnrollmentState, failure: WaitFailure, waited: Duration) -> EnrollmentError {
    match failure {
        WaitFailure::TimedOut => EnrollmentError::PlacementTimeout {
            state,
            waited_ms: waited.as_millis() as u64,
        },
        WaitFailure::Sensor(e) => EnrollmentError::sensor(state, e),
    }
}
