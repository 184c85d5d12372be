//! Error types for the prediction client.

use thiserror::Error;

/// Ways a prediction request can fail.
///
/// Every variant is terminal for the attempt; nothing here is retried.
#[derive(Debug, Error)]
pub enum PredictionError {
    /// The endpoint answered with anything other than HTTP 200.
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// HTTP 200 with a body that lacks `prediction` or `details`.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The photo file could not be read for upload.
    #[error("cannot read photo: {0}")]
    Photo(#[from] std::io::Error),

    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}
