use std::path::PathBuf;

use thiserror::Error;

use crate::prediction::PredictionError;
use crate::workflow::{Phase, PhotoSource};

#[derive(Debug, Error)]
pub enum CarscanError {
    #[error("Permission denied for {0}")]
    PermissionDenied(PhotoSource),

    #[error("Photo selection was cancelled")]
    PickerCancelled,

    #[error("Photo path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Prediction error: {0}")]
    Prediction(#[from] PredictionError),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Feedback cue error: {0}")]
    Feedback(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rejections produced by the workflow state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("expected phase {expected}, workflow is {actual}")]
    InvalidPhase { expected: Phase, actual: Phase },

    #[error("cannot apply {event} while {phase}")]
    InvalidTransition { phase: Phase, event: &'static str },
}
