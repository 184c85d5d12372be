use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};

use super::PredictionService;
use super::error::PredictionError;
use super::types::PredictionResponse;
use crate::workflow::CapturedPhoto;

const UPLOAD_FIELD: &str = "file";
const UPLOAD_FILE_NAME: &str = "capturedImage.jpg";
const UPLOAD_MIME: &str = "image/jpeg";

pub struct PredictionClient {
    client: Client,
    url: String,
}

impl PredictionClient {
    pub fn new(url: String, timeout: Duration) -> Result<Self, PredictionError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn upload_form(photo: &CapturedPhoto) -> Result<Form, PredictionError> {
        let bytes = tokio::fs::read(photo.local_path()).await?;
        let part = Part::bytes(bytes)
            .file_name(UPLOAD_FILE_NAME)
            .mime_str(UPLOAD_MIME)?;
        Ok(Form::new().part(UPLOAD_FIELD, part))
    }
}

#[async_trait]
impl PredictionService for PredictionClient {
    async fn predict(&self, photo: &CapturedPhoto) -> Result<PredictionResponse, PredictionError> {
        let form = Self::upload_form(photo).await?;
        log::info!("uploading {} to {}", photo.uri(), self.url);

        let response = self.client.post(&self.url).multipart(form).send().await?;
        let status = response.status();

        if status != StatusCode::OK {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(PredictionError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        serde_json::from_str::<PredictionResponse>(&body)
            .map_err(|e| PredictionError::Malformed(e.to_string()))
    }
}
