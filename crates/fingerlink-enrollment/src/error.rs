//! Errors returned by the enrollment, verification and download flows.

use fingerlink_core::TemplateId;
use fingerlink_hardware::SensorError;
use fingerlink_storage::StorageError;
use thiserror::Error;

use crate::state::EnrollmentState;

/// Template retrieval failures.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Identifier 0 (or out of range); rejected before talking to the sensor.
    #[error("Invalid template id {0}")]
    InvalidId(u16),

    /// Every attempt failed.
    #[error("Template {id} not retrieved after {attempts} attempts: {last}")]
    Exhausted {
        id: TemplateId,
        attempts: u8,
        last: String,
    },

    /// The sensor holds no templates, or the upper bound is 0.
    #[error("No templates to download")]
    NothingToDownload,
}

/// Enrollment failures, tagged with the state they happened in.
#[derive(Debug, Error)]
pub enum EnrollmentError {
    #[error("Invalid enrollment transition from {from} to {to}")]
    InvalidTransition {
        from: EnrollmentState,
        to: EnrollmentState,
    },

    #[error("Template id out of range: {0}")]
    InvalidId(#[from] fingerlink_core::Error),

    #[error("No finger change detected within {waited_ms}ms ({state})")]
    PlacementTimeout { state: EnrollmentState, waited_ms: u64 },

    #[error("Sensor error in {state}: {source}")]
    Sensor {
        state: EnrollmentState,
        #[source]
        source: SensorError,
    },

    /// The two captures did not come from the same finger.
    #[error("Fingerprints did not match")]
    Mismatch,

    /// The model was stored but the enrolled count could not be persisted.
    #[error("Failed to persist enrolled count: {0}")]
    Counter(#[from] StorageError),

    /// The model was stored but its template could not be read back.
    #[error("Template {id} stored but not retrieved: {source}")]
    Retrieval {
        id: TemplateId,
        #[source]
        source: DownloadError,
    },
}

impl EnrollmentError {
    pub fn sensor(state: EnrollmentState, source: SensorError) -> Self {
        Self::Sensor { state, source }
    }

    /// Whether the sensor library was modified before the failure.
    pub fn model_stored(&self) -> bool {
        matches!(self, Self::Counter(_) | Self::Retrieval { .. })
    }
}

/// Verification failures. A search without a match is not an error.
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("No finger placed within {waited_ms}ms")]
    PlacementTimeout { waited_ms: u64 },

    #[error("Sensor error: {0}")]
    Sensor(#[from] SensorError),
}
