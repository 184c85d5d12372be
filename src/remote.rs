//! HTTP backends for the per-user result store and the push relay.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::CarscanError;
use crate::services::{PushNotification, PushRelay, RemoteStore};
use crate::workflow::StoredImage;

/// Location of a user's image list inside the database.
pub fn images_path(uid: &str) -> String {
    format!("users/{uid}/images")
}

fn http_client(timeout: Duration) -> Result<Client, CarscanError> {
    Ok(Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(timeout)
        .build()?)
}

// Realtime-Database REST answers a POST with the generated child key.
#[derive(Debug, Deserialize)]
struct PushedKey {
    name: String,
}

/// Per-user store backed by a Realtime-Database-style REST API.
///
/// `POST {base}/users/{uid}/images.json` appends a child with an
/// auto-generated key.
pub struct RealtimeDbStore {
    client: Client,
    base_url: String,
}

impl RealtimeDbStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CarscanError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl RemoteStore for RealtimeDbStore {
    async fn append_image(&self, uid: &str, record: &StoredImage) -> Result<String, CarscanError> {
        let url = format!("{}/{}.json", self.base_url, images_path(uid));
        let response = self.client.post(&url).json(record).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CarscanError::Store(format!("status {status}: {message}")));
        }

        let key: PushedKey = response.json().await?;
        log::info!("stored prediction under {}/{}", images_path(uid), key.name);
        Ok(key.name)
    }
}

/// Posts notifications to the push relay. Without a URL it only logs.
pub struct PushRelayClient {
    client: Client,
    url: Option<String>,
}

impl PushRelayClient {
    pub fn new(url: Option<String>, timeout: Duration) -> Result<Self, CarscanError> {
        Ok(Self {
            client: http_client(timeout)?,
            url: url.filter(|u| !u.is_empty()),
        })
    }
}

#[async_trait]
impl PushRelay for PushRelayClient {
    async fn notify(&self, notification: &PushNotification) -> Result<(), CarscanError> {
        let Some(url) = &self.url else {
            log::debug!("no push relay configured, skipping \"{}\"", notification.title);
            return Ok(());
        };

        // The relay's answer carries nothing we act on.
        self.client
            .post(url)
            .json(notification)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
