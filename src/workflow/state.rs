use std::fmt;

use serde::{Deserialize, Serialize};

use super::photo::{CapturedPhoto, PredictionResult};
use crate::error::WorkflowError;

/// The five phases of the capture/review/submit workflow.
///
/// A photo flows through: IDLE → REVIEWING → SUBMITTING → SUCCEEDED → IDLE.
/// Retake and failed submissions return to IDLE early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Idle,
    Reviewing,
    Submitting,
    Succeeded,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "IDLE"),
            Phase::Reviewing => write!(f, "REVIEWING"),
            Phase::Submitting => write!(f, "SUBMITTING"),
            Phase::Succeeded => write!(f, "SUCCEEDED"),
            Phase::Failed => write!(f, "FAILED"),
        }
    }
}

/// Inputs accepted by [`StateMachine::next`].
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A photo was captured or picked.
    Acquire(CapturedPhoto),
    /// The user discarded the photo under review.
    Retake,
    /// Upload is about to start.
    BeginSubmit,
    /// The prediction came back and was stored.
    Succeed(PredictionResult),
    /// The submission failed; `hold` keeps the workflow in FAILED.
    Fail { reason: String, hold: bool },
    /// The success cue ran to completion.
    CueElapsed,
    /// The success cue was torn down before it finished.
    CueCancelled,
    /// The user acknowledged a held failure.
    Dismiss,
}

impl Event {
    fn name(&self) -> &'static str {
        match self {
            Event::Acquire(_) => "acquire",
            Event::Retake => "retake",
            Event::BeginSubmit => "begin-submit",
            Event::Succeed(_) => "succeed",
            Event::Fail { .. } => "fail",
            Event::CueElapsed => "cue-elapsed",
            Event::CueCancelled => "cue-cancelled",
            Event::Dismiss => "dismiss",
        }
    }
}

/// The single record the presentation layer renders from.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowState {
    phase: Phase,
    photo: Option<CapturedPhoto>,
    prediction: Option<PredictionResult>,
    failure: Option<String>,
    history: Vec<Phase>,
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            photo: None,
            prediction: None,
            failure: None,
            history: vec![Phase::Idle],
        }
    }
}

impl WorkflowState {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn photo(&self) -> Option<&CapturedPhoto> {
        self.photo.as_ref()
    }

    pub fn prediction(&self) -> Option<&PredictionResult> {
        self.prediction.as_ref()
    }

    /// Message of the held failure, only set while FAILED.
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Phases of the current cycle, starting with the IDLE it began in.
    ///
    /// Acquiring a new photo starts a new cycle, so this never grows past
    /// one capture-to-IDLE round trip.
    pub fn history(&self) -> &[Phase] {
        &self.history
    }

    fn reset(&mut self) {
        self.photo = None;
        self.prediction = None;
        self.failure = None;
    }
}

/// Applies events to a [`WorkflowState`].
pub struct StateMachine;

impl StateMachine {
    /// Apply `event` to `state` and return the phase it lands in.
    ///
    /// Illegal (phase, event) pairs are rejected and leave `state` untouched.
    pub fn next(state: &mut WorkflowState, event: Event) -> Result<Phase, WorkflowError> {
        let phase = state.phase;
        let name = event.name();

        let next = match (phase, event) {
            (Phase::Idle, Event::Acquire(photo)) => {
                state.reset();
                state.history.clear();
                state.history.push(Phase::Idle);
                state.photo = Some(photo);
                Phase::Reviewing
            }
            (Phase::Reviewing, Event::Retake) => {
                state.reset();
                Phase::Idle
            }
            (Phase::Reviewing, Event::BeginSubmit) => Phase::Submitting,
            (Phase::Submitting, Event::Succeed(result)) => {
                state.prediction = Some(result);
                Phase::Succeeded
            }
            (Phase::Submitting, Event::Fail { reason, hold }) => {
                state.reset();
                if hold {
                    state.failure = Some(reason);
                    Phase::Failed
                } else {
                    Phase::Idle
                }
            }
            (Phase::Succeeded, Event::CueElapsed | Event::CueCancelled)
            | (Phase::Failed, Event::Dismiss) => {
                state.reset();
                Phase::Idle
            }
            _ => return Err(WorkflowError::InvalidTransition { phase, event: name }),
        };

        log::debug!("workflow {phase} --{name}--> {next}");
        state.phase = next;
        state.history.push(next);
        Ok(next)
    }
}
