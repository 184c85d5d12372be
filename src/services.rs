//! Collaborators the workflow talks to, and the implementations the CLI uses.
//!
//! Every collaborator is a `Send + Sync` trait object so the workflow can hand
//! `Arc` clones to fire-and-forget tasks.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use console::Term;
use serde::Serialize;
use serde_json::Value;

use crate::error::CarscanError;
use crate::prediction::PredictionService;
use crate::workflow::{CameraSettings, CapturedPhoto, PhotoSource, StoredImage};

/// Answer to a permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

#[async_trait]
pub trait Camera: Send + Sync {
    async fn request_permission(&self) -> Permission;
    async fn capture(&self, settings: &CameraSettings) -> Result<CapturedPhoto, CarscanError>;
}

#[async_trait]
pub trait LibraryPicker: Send + Sync {
    async fn request_permission(&self) -> Permission;
    /// `None` when the user backs out of the picker.
    async fn pick(&self) -> Result<Option<CapturedPhoto>, CarscanError>;
}

/// The signed-in user, if any.
pub trait AuthContext: Send + Sync {
    fn uid(&self) -> Option<String>;
}

/// Append-only per-user result store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Append `record` under the user's image list and return the generated key.
    async fn append_image(&self, uid: &str, record: &StoredImage) -> Result<String, CarscanError>;
}

/// Results kept on the device when nobody is signed in.
pub trait LocalStore: Send + Sync {
    fn add_image(&self, photo: &CapturedPhoto, prediction: &str, details: &Value);
}

pub trait Navigator: Send + Sync {
    fn navigate_to(&self, route: &str);
}

/// Audible confirmation after a camera capture.
#[async_trait]
pub trait FeedbackCue: Send + Sync {
    async fn play_capture_sound(&self) -> Result<(), CarscanError>;
}

/// Payload posted to the push relay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushNotification {
    #[serde(rename = "subID")]
    pub sub_id: String,
    #[serde(rename = "appId")]
    pub app_id: String,
    #[serde(rename = "appToken")]
    pub app_token: String,
    pub title: String,
    pub message: String,
}

#[async_trait]
pub trait PushRelay: Send + Sync {
    async fn notify(&self, notification: &PushNotification) -> Result<(), CarscanError>;
}

/// Everything a workflow instance needs from the outside world.
#[derive(Clone)]
pub struct Services {
    pub camera: Arc<dyn Camera>,
    pub picker: Arc<dyn LibraryPicker>,
    pub predictor: Arc<dyn PredictionService>,
    pub auth: Arc<dyn AuthContext>,
    pub remote_store: Arc<dyn RemoteStore>,
    pub local_store: Arc<dyn LocalStore>,
    pub navigator: Arc<dyn Navigator>,
    pub feedback: Arc<dyn FeedbackCue>,
    pub push: Arc<dyn PushRelay>,
}

/// Treats an existing image file as the camera's output.
pub struct FileCamera {
    path: PathBuf,
}

impl FileCamera {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl Camera for FileCamera {
    // Reading a local file needs no grant; a missing file fails in `capture`.
    async fn request_permission(&self) -> Permission {
        Permission::Granted
    }

    async fn capture(&self, settings: &CameraSettings) -> Result<CapturedPhoto, CarscanError> {
        log::debug!(
            "capturing {} (facing {:?}, flash {:?}, zoom {:.2})",
            self.path.display(),
            settings.facing,
            settings.flash,
            settings.zoom
        );
        let path = tokio::fs::canonicalize(&self.path).await?;
        CapturedPhoto::from_path(&path, PhotoSource::Camera)
    }
}

/// Picks a file from disk; a missing file counts as a cancelled pick.
pub struct FilePicker {
    path: PathBuf,
}

impl FilePicker {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl LibraryPicker for FilePicker {
    async fn request_permission(&self) -> Permission {
        Permission::Granted
    }

    async fn pick(&self) -> Result<Option<CapturedPhoto>, CarscanError> {
        match tokio::fs::canonicalize(&self.path).await {
            Ok(path) => CapturedPhoto::from_path(&path, PhotoSource::Library).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Fixed user identity taken from config or the command line.
pub struct StaticAuth(Option<String>);

impl StaticAuth {
    pub fn new(uid: Option<String>) -> Self {
        Self(uid.filter(|u| !u.is_empty()))
    }
}

impl AuthContext for StaticAuth {
    fn uid(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Process-lifetime image list used when nobody is signed in.
#[derive(Default)]
pub struct InMemoryImageStore {
    images: Mutex<Vec<StoredImage>>,
}

impl InMemoryImageStore {
    pub fn images(&self) -> Vec<StoredImage> {
        self.images
            .lock()
            .map(|images| images.clone())
            .unwrap_or_default()
    }
}

impl LocalStore for InMemoryImageStore {
    fn add_image(&self, photo: &CapturedPhoto, prediction: &str, details: &Value) {
        let mut record = StoredImage::new(photo, prediction, details);
        record.stored_at = Some(Utc::now());
        match self.images.lock() {
            Ok(mut images) => images.push(record),
            Err(e) => log::error!("local image store poisoned: {e}"),
        }
    }
}

/// Records the requested route; the CLI prints it once the workflow is done.
#[derive(Default)]
pub struct RouteLog {
    routes: Mutex<Vec<String>>,
}

impl RouteLog {
    pub fn last(&self) -> Option<String> {
        self.routes.lock().ok().and_then(|r| r.last().cloned())
    }
}

impl Navigator for RouteLog {
    fn navigate_to(&self, route: &str) {
        log::info!("navigating to {route}");
        if let Ok(mut routes) = self.routes.lock() {
            routes.push(route.to_string());
        }
    }
}

/// Rings the terminal bell.
pub struct TerminalBell;

#[async_trait]
impl FeedbackCue for TerminalBell {
    async fn play_capture_sound(&self) -> Result<(), CarscanError> {
        Term::stderr()
            .write_str("\x07")
            .map_err(|e| CarscanError::Feedback(e.to_string()))
    }
}
