mod cue;
mod photo;
mod runner;
mod state;
mod zoom;

pub use photo::{
    CameraSettings, CapturedPhoto, Facing, FlashMode, PhotoSource, PredictionResult, StoredImage,
};
pub use runner::{FailurePolicy, SubmitOutcome, Workflow, WorkflowConfig};
pub use state::Phase;
pub use zoom::{PinchGesture, Platform, ZoomSensitivity, next_zoom};
