//! Enrollment state machine.
//!
//! # States
//!
//! - `Idle`: session created, nothing reported yet
//! - `AwaitFirstPlacement`: polling the sensor for a finger
//! - `CaptureFirst`: converting the first image into feature slot 1
//! - `AwaitRemoval`: waiting for the finger to be lifted
//! - `AwaitSecondPlacement`: polling for the same finger again
//! - `CaptureSecond`: converting the second image into feature slot 2
//! - `BuildModel`: combining both slots into a model
//! - `PersistModel`: storing the model and counting it
//! - `RetrieveTemplate`: downloading the stored template
//! - `Complete` / `Failed`: terminal
//!
//! # Valid Transitions
//!
//! - Idle → AwaitFirstPlacement → CaptureFirst → AwaitRemoval
//! - AwaitRemoval → AwaitSecondPlacement → CaptureSecond → BuildModel
//! - BuildModel → PersistModel → RetrieveTemplate → Complete
//! - any non-terminal state → Failed
//!
//! ```
//! use fingerlink_core::TemplateId;
//! use fingerlink_enrollment::{EnrollmentSession, EnrollmentState};
//!
//! let mut session = EnrollmentSession::new(TemplateId::new(4).unwrap());
//! session.transition_to(EnrollmentState::AwaitFirstPlacement).unwrap();
//! assert!(session.transition_to(EnrollmentState::BuildModel).is_err());
//! ```

use std::fmt;

use fingerlink_core::{Stage, TemplateId};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::EnrollmentError;

/// Phase of one enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentState {
    Idle,
    AwaitFirstPlacement,
    CaptureFirst,
    AwaitRemoval,
    AwaitSecondPlacement,
    CaptureSecond,
    BuildModel,
    PersistModel,
    RetrieveTemplate,
    Complete,
    Failed,
}

impl fmt::Display for EnrollmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EnrollmentState::Idle => "Idle",
            EnrollmentState::AwaitFirstPlacement => "AwaitFirstPlacement",
            EnrollmentState::CaptureFirst => "CaptureFirst",
            EnrollmentState::AwaitRemoval => "AwaitRemoval",
            EnrollmentState::AwaitSecondPlacement => "AwaitSecondPlacement",
            EnrollmentState::CaptureSecond => "CaptureSecond",
            EnrollmentState::BuildModel => "BuildModel",
            EnrollmentState::PersistModel => "PersistModel",
            EnrollmentState::RetrieveTemplate => "RetrieveTemplate",
            EnrollmentState::Complete => "Complete",
            EnrollmentState::Failed => "Failed",
        };
        f.write_str(name)
    }
}

impl EnrollmentState {
    /// Check if transition to `target` is allowed from this state.
    ///
    /// ```
    /// use fingerlink_enrollment::EnrollmentState;
    ///
    /// assert!(EnrollmentState::BuildModel.can_transition_to(&EnrollmentState::PersistModel));
    /// assert!(EnrollmentState::BuildModel.can_transition_to(&EnrollmentState::Failed));
    /// assert!(!EnrollmentState::Complete.can_transition_to(&EnrollmentState::Failed));
    /// ```
    pub fn can_transition_to(&self, target: &EnrollmentState) -> bool {
        use EnrollmentState::*;

        if *target == Failed {
            return !self.is_terminal();
        }

        matches!(
            (self, target),
            (Idle, AwaitFirstPlacement)
                | (AwaitFirstPlacement, CaptureFirst)
                | (CaptureFirst, AwaitRemoval)
                | (AwaitRemoval, AwaitSecondPlacement)
                | (AwaitSecondPlacement, CaptureSecond)
                | (CaptureSecond, BuildModel)
                | (BuildModel, PersistModel)
                | (PersistModel, RetrieveTemplate)
                | (RetrieveTemplate, Complete)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, EnrollmentState::Complete | EnrollmentState::Failed)
    }

    /// Status reported when the state is entered; `None` for states that
    /// report nothing on entry.
    pub fn entry_status(&self) -> Option<(Stage, &'static str)> {
        let status = match self {
            EnrollmentState::Idle | EnrollmentState::Failed => return None,
            EnrollmentState::AwaitFirstPlacement => (Stage::PlaceFinger, "Place your finger."),
            EnrollmentState::CaptureFirst => (Stage::ImageTaken, "First image captured."),
            EnrollmentState::AwaitRemoval => (Stage::RemoveFinger, "Remove your finger."),
            EnrollmentState::AwaitSecondPlacement => {
                (Stage::PlaceFingerAgain, "Place the same finger again.")
            }
            EnrollmentState::CaptureSecond => (Stage::ImageTakenAgain, "Second image captured."),
            EnrollmentState::BuildModel => (Stage::CreatingModel, "Creating model."),
            EnrollmentState::PersistModel => (Stage::ModelCreated, "Model created."),
            EnrollmentState::RetrieveTemplate => {
                (Stage::DownloadingTemplate, "Downloading template...")
            }
            EnrollmentState::Complete => (Stage::Success, "Enrollment complete."),
        };
        Some(status)
    }
}

/// One recorded state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    pub from: EnrollmentState,
    pub to: EnrollmentState,
    pub at: Instant,
}

/// Transient state of a single in-flight enrollment.
///
/// Owned by one `enroll` call and dropped when it returns.
#[derive(Debug, Clone)]
pub struct EnrollmentSession {
    id: TemplateId,
    state: EnrollmentState,
    history: Vec<StateTransition>,
}

impl EnrollmentSession {
    pub fn new(id: TemplateId) -> Self {
        Self {
            id,
            state: EnrollmentState::Idle,
            history: Vec::with_capacity(10),
        }
    }

    pub fn id(&self) -> TemplateId {
        self.id
    }

    pub fn state(&self) -> EnrollmentState {
        self.state
    }

    /// Transitions so far, oldest first.
    pub fn history(&self) -> &[StateTransition] {
        &self.history
    }

    /// Move to `next`, recording the transition.
    ///
    /// # Errors
    /// Returns `EnrollmentError::InvalidTransition` if `next` is not reachable
    /// from the current state; the session is left unchanged.
    pub fn transition_to(
        &mut self,
        next: EnrollmentState,
    ) -> Result<StateTransition, EnrollmentError> {
        if !self.state.can_transition_to(&next) {
            return Err(EnrollmentError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }

        let transition = StateTransition {
            from: self.state,
            to: next,
            at: Instant::now(),
        };
        self.state = next;
        self.history.push(transition);
        Ok(transition)
    }

    /// Mark the session failed unless it already ended.
    pub fn abort(&mut self) -> Option<StateTransition> {
        self.transition_to(EnrollmentState::Failed).ok()
    }
}
