//! Wire types for the prediction endpoint.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::workflow::PredictionResult;

/// Body returned by the prediction endpoint on HTTP 200.
///
/// Both fields are required; a body missing either one is treated as a
/// failed submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    /// Predicted class label, e.g. `"SUV"`.
    pub prediction: String,
    /// Free-form payload (confidence, alternatives, ...), stored verbatim.
    pub details: Value,
}

impl From<PredictionResponse> for PredictionResult {
    fn from(resp: PredictionResponse) -> Self {
        Self {
            label: resp.prediction,
            details: resp.details,
        }
    }
}
