pub mod client;
pub mod error;
pub mod types;

use async_trait::async_trait;

pub use client::PredictionClient;
pub use error::PredictionError;
pub use types::PredictionResponse;

use crate::workflow::CapturedPhoto;

/// Anything that can classify a captured photo.
#[async_trait]
pub trait PredictionService: Send + Sync {
    async fn predict(&self, photo: &CapturedPhoto) -> Result<PredictionResponse, PredictionError>;
}
