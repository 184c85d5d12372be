use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CarscanError;

/// Where a photo came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoSource {
    Camera,
    Library,
}

impl fmt::Display for PhotoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhotoSource::Camera => write!(f, "camera"),
            PhotoSource::Library => write!(f, "photo library"),
        }
    }
}

/// Reference to an image produced by the camera or the library picker.
///
/// Never mutated after creation; a retake replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedPhoto {
    uri: String,
    source: PhotoSource,
}

impl CapturedPhoto {
    pub fn new(uri: impl Into<String>, source: PhotoSource) -> Self {
        Self {
            uri: uri.into(),
            source,
        }
    }

    /// Builds a `file://` reference for a path on the local filesystem.
    ///
    /// The URI is the only handle kept on the photo, so a path that is not
    /// valid UTF-8 is rejected rather than stored lossily.
    pub fn from_path(path: &Path, source: PhotoSource) -> Result<Self, CarscanError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| CarscanError::NonUtf8Path(path.to_path_buf()))?;
        Ok(Self::new(format!("file://{path_str}"), source))
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn source(&self) -> PhotoSource {
        self.source
    }

    /// Filesystem path behind the reference, with any `file://` scheme stripped.
    pub fn local_path(&self) -> PathBuf {
        PathBuf::from(self.uri.strip_prefix("file://").unwrap_or(&self.uri))
    }
}

/// Label and free-form details returned by the prediction service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub label: String,
    pub details: Value,
}

/// Record written to the remote or local store after a successful prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredImage {
    pub image_uri: String,
    pub prediction: String,
    pub details: Value,
    #[serde(skip)]
    pub stored_at: Option<DateTime<Utc>>,
}

impl StoredImage {
    pub fn new(photo: &CapturedPhoto, prediction: &str, details: &Value) -> Self {
        Self {
            image_uri: photo.uri().to_string(),
            prediction: prediction.to_string(),
            details: details.clone(),
            stored_at: None,
        }
    }
}

/// Which way the camera faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Facing {
    #[default]
    Back,
    Front,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlashMode {
    #[default]
    Off,
    On,
}

/// Settings handed to the camera on every capture.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CameraSettings {
    pub facing: Facing,
    pub flash: FlashMode,
    pub zoom: f64,
}

impl CameraSettings {
    pub fn toggle_flash(&mut self) {
        self.flash = match self.flash {
            FlashMode::Off => FlashMode::On,
            FlashMode::On => FlashMode::Off,
        };
    }

    pub fn flip(&mut self) {
        self.facing = match self.facing {
            Facing::Back => Facing::Front,
            Facing::Front => Facing::Back,
        };
    }
}
