//! carscan configuration loaded from `carscan.toml`.
//!
//! [`CarscanConfig`] holds every tunable. Keys missing from the file fall back
//! to defaults. Endpoint and credential environment variables take precedence
//! over the file.

use std::path::Path;
use std::time::Duration;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::workflow::{FailurePolicy, Platform, WorkflowConfig, ZoomSensitivity};

const CONFIG_FILE: &str = "carscan.toml";

/// Top-level configuration loaded from `carscan.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarscanConfig {
    /// Prediction endpoint receiving the multipart upload.
    #[serde(default = "default_prediction_url")]
    pub prediction_url: String,

    /// Push relay endpoint. Empty disables notifications.
    #[serde(default)]
    pub push_url: String,

    #[serde(default)]
    pub app_id: String,

    #[serde(default)]
    pub app_token: String,

    /// Base URL of the per-user results database.
    #[serde(default)]
    pub database_url: String,

    /// Signed-in user. Empty means results stay local.
    #[serde(default)]
    pub user_uid: String,

    /// How long the success cue stays up before navigating away.
    #[serde(default = "default_success_cue_ms")]
    pub success_cue_ms: u64,

    /// Route opened once a prediction has been stored.
    #[serde(default = "default_results_route")]
    pub results_route: String,

    /// Selects the pinch-to-zoom sensitivity.
    #[serde(default)]
    pub platform: Platform,

    /// Keep failed submissions on screen until dismissed.
    #[serde(default)]
    pub hold_failures: bool,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_prediction_url() -> String {
    "http://localhost:8000/predict".to_string()
}

fn default_success_cue_ms() -> u64 {
    3000
}

fn default_results_route() -> String {
    "Library".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for CarscanConfig {
    fn default() -> Self {
        Self {
            prediction_url: default_prediction_url(),
            push_url: String::new(),
            app_id: String::new(),
            app_token: String::new(),
            database_url: String::new(),
            user_uid: String::new(),
            success_cue_ms: default_success_cue_ms(),
            results_route: default_results_route(),
            platform: Platform::default(),
            hold_failures: false,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl CarscanConfig {
    /// Load `carscan.toml` from the current directory, or defaults if absent.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<CarscanConfig>(&contents)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let overrides: [(&str, &mut String); 6] = [
            ("CARSCAN_PREDICTION_URL", &mut self.prediction_url),
            ("CARSCAN_PUSH_URL", &mut self.push_url),
            ("CARSCAN_APP_ID", &mut self.app_id),
            ("CARSCAN_APP_TOKEN", &mut self.app_token),
            ("CARSCAN_DATABASE_URL", &mut self.database_url),
            ("CARSCAN_USER_UID", &mut self.user_uid),
        ];
        for (key, field) in overrides {
            if let Some(value) = lookup(key)
                && !value.is_empty()
            {
                *field = value;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.prediction_url.trim().is_empty() {
            bail!("prediction_url must not be empty");
        }
        if !self.user_uid.is_empty() && self.database_url.is_empty() {
            bail!("database_url is required when user_uid is set");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn workflow(&self) -> WorkflowConfig {
        WorkflowConfig {
            success_cue: Duration::from_millis(self.success_cue_ms),
            results_route: self.results_route.clone(),
            failure_policy: if self.hold_failures {
                FailurePolicy::HoldUntilDismissed
            } else {
                FailurePolicy::ResetImmediately
            },
            sensitivity: ZoomSensitivity::for_platform(self.platform),
            app_id: self.app_id.clone(),
            app_token: self.app_token.clone(),
        }
    }

    /// Copy of the config safe to print.
    pub fn masked(&self) -> Self {
        let mut masked = self.clone();
        if !masked.app_token.is_empty() {
            masked.app_token = "****".to_string();
        }
        masked
    }
}
