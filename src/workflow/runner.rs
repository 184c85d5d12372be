use std::sync::Arc;
use std::time::Duration;

use crate::error::{CarscanError, WorkflowError};
use crate::prediction::{PredictionError, PredictionResponse};
use crate::services::{Permission, PushNotification, Services};

use super::cue::SuccessCue;
use super::photo::{CameraSettings, CapturedPhoto, PhotoSource, PredictionResult, StoredImage};
use super::state::{Event, Phase, StateMachine, WorkflowState};
use super::zoom::{PinchGesture, ZoomLevel, ZoomSensitivity, pinch_delta};

const PUSH_TITLE: &str = "Prediction Successful!";

/// What to do with the workflow when a submission fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Drop the photo and go straight back to IDLE.
    #[default]
    ResetImmediately,
    /// Stay in FAILED until [`Workflow::dismiss_failure`] is called.
    HoldUntilDismissed,
}

/// Tunables for a [`Workflow`] instance.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub success_cue: Duration,
    pub results_route: String,
    pub failure_policy: FailurePolicy,
    pub sensitivity: ZoomSensitivity,
    pub app_id: String,
    pub app_token: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            success_cue: Duration::from_secs(3),
            results_route: "Library".to_string(),
            failure_policy: FailurePolicy::default(),
            sensitivity: ZoomSensitivity::default(),
            app_id: String::new(),
            app_token: String::new(),
        }
    }
}

/// Result of a call to [`Workflow::submit`].
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Succeeded(PredictionResult),
    /// The attempt failed; the message is what was logged.
    Failed(String),
    /// The workflow was not reviewing a photo, nothing was sent.
    Ignored,
}

/// Drives one photo at a time from capture to stored prediction.
pub struct Workflow {
    state: WorkflowState,
    settings: CameraSettings,
    zoom: ZoomLevel,
    services: Services,
    config: WorkflowConfig,
    cue: Option<SuccessCue>,
    last_failure: Option<String>,
}

impl Workflow {
    pub fn new(services: Services, config: WorkflowConfig) -> Self {
        Self {
            state: WorkflowState::default(),
            settings: CameraSettings::default(),
            zoom: ZoomLevel::default(),
            services,
            config,
            cue: None,
            last_failure: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn photo(&self) -> Option<&CapturedPhoto> {
        self.state.photo()
    }

    pub fn prediction(&self) -> Option<&PredictionResult> {
        self.state.prediction()
    }

    pub fn history(&self) -> &[Phase] {
        self.state.history()
    }

    /// Message of the most recent failed submission, kept across resets.
    pub fn last_failure(&self) -> Option<&str> {
        self.last_failure.as_deref()
    }

    pub fn zoom(&self) -> f64 {
        self.zoom.get()
    }

    pub fn camera_settings(&self) -> CameraSettings {
        CameraSettings {
            zoom: self.zoom.get(),
            ..self.settings
        }
    }

    pub fn toggle_flash(&mut self) {
        self.settings.toggle_flash();
    }

    pub fn flip_camera(&mut self) {
        self.settings.flip();
    }

    /// Accumulate a normalized zoom delta. The level stays within `[0, 1]`.
    pub fn adjust_zoom(&mut self, delta: f64) -> f64 {
        self.zoom.apply(delta)
    }

    pub fn pinch(&mut self, gesture: PinchGesture) -> f64 {
        self.adjust_zoom(pinch_delta(gesture, self.config.sensitivity))
    }

    /// Capture or pick a photo and move to REVIEWING.
    ///
    /// Permission refusal and a cancelled pick leave the phase unchanged.
    pub async fn acquire_photo(
        &mut self,
        source: PhotoSource,
    ) -> Result<CapturedPhoto, CarscanError> {
        self.expect_phase(Phase::Idle)?;

        let photo = match source {
            PhotoSource::Camera => {
                let camera = Arc::clone(&self.services.camera);
                if camera.request_permission().await == Permission::Denied {
                    log::warn!("camera permission denied");
                    return Err(CarscanError::PermissionDenied(source));
                }
                camera.capture(&self.camera_settings()).await?
            }
            PhotoSource::Library => {
                let picker = Arc::clone(&self.services.picker);
                if picker.request_permission().await == Permission::Denied {
                    log::warn!("photo library permission denied");
                    return Err(CarscanError::PermissionDenied(source));
                }
                picker.pick().await?.ok_or(CarscanError::PickerCancelled)?
            }
        };

        StateMachine::next(&mut self.state, Event::Acquire(photo.clone()))?;
        log::info!("reviewing {} from {source}", photo.uri());

        if source == PhotoSource::Camera {
            self.dispatch_capture_sound();
        }
        Ok(photo)
    }

    /// Discard the photo under review.
    pub fn retake(&mut self) -> Result<(), CarscanError> {
        self.expect_phase(Phase::Reviewing)?;
        StateMachine::next(&mut self.state, Event::Retake)?;
        Ok(())
    }

    // Returns `None` unless REVIEWING, so at most one submission is in flight.
    fn begin_submit(&mut self) -> Option<CapturedPhoto> {
        if self.phase() != Phase::Reviewing {
            log::warn!("submit ignored while {}", self.phase());
            return None;
        }
        StateMachine::next(&mut self.state, Event::BeginSubmit).ok()?;
        self.state.photo().cloned()
    }

    /// Upload the photo under review and store the prediction.
    ///
    /// Failures never escape as errors: they are logged, the workflow resets
    /// (or holds in FAILED, per [`FailurePolicy`]) and the outcome says so.
    pub async fn submit(&mut self) -> SubmitOutcome {
        let Some(photo) = self.begin_submit() else {
            return SubmitOutcome::Ignored;
        };

        let predictor = Arc::clone(&self.services.predictor);
        let response = predictor.predict(&photo).await;
        self.finish_submit(&photo, response).await
    }

    async fn finish_submit(
        &mut self,
        photo: &CapturedPhoto,
        response: Result<PredictionResponse, PredictionError>,
    ) -> SubmitOutcome {
        let result = match response {
            Ok(resp) => PredictionResult::from(resp),
            Err(e) => return self.fail(format!("prediction failed: {e}")),
        };

        let uid = self.services.auth.uid();
        if let Err(e) = self.persist(uid.as_deref(), photo, &result).await {
            return self.fail(format!("storing prediction failed: {e}"));
        }

        if let Err(e) = StateMachine::next(&mut self.state, Event::Succeed(result.clone())) {
            return self.fail(e.to_string());
        }
        log::info!("predicted {} for {}", result.label, photo.uri());

        self.cue = Some(SuccessCue::schedule(self.config.success_cue));
        if let Some(uid) = uid {
            self.dispatch_push(uid, &result.label);
        }
        SubmitOutcome::Succeeded(result)
    }

    async fn persist(
        &self,
        uid: Option<&str>,
        photo: &CapturedPhoto,
        result: &PredictionResult,
    ) -> Result<(), CarscanError> {
        match uid {
            Some(uid) => {
                let record = StoredImage::new(photo, &result.label, &result.details);
                self.services.remote_store.append_image(uid, &record).await?;
            }
            None => {
                self.services
                    .local_store
                    .add_image(photo, &result.label, &result.details);
            }
        }
        Ok(())
    }

    fn fail(&mut self, reason: String) -> SubmitOutcome {
        log::error!("submission failed: {reason}");
        let hold = self.config.failure_policy == FailurePolicy::HoldUntilDismissed;
        if let Err(e) = StateMachine::next(
            &mut self.state,
            Event::Fail {
                reason: reason.clone(),
                hold,
            },
        ) {
            log::error!("cannot record failure: {e}");
        }
        self.last_failure = Some(reason.clone());
        SubmitOutcome::Failed(reason)
    }

    /// Wait for the success cue, then return to IDLE and open the results view.
    ///
    /// Returns `false` when no cue was pending. Dropping the returned future
    /// early leaves the cue pending, so it can still be awaited or cancelled.
    pub async fn complete_success_cue(&mut self) -> bool {
        let Some(cue) = self.cue.as_mut() else {
            return false;
        };
        let elapsed = cue.elapsed().await;
        self.cue = None;
        if !elapsed {
            return false;
        }
        if let Err(e) = StateMachine::next(&mut self.state, Event::CueElapsed) {
            log::error!("success cue finished out of phase: {e}");
            return false;
        }
        self.services.navigator.navigate_to(&self.config.results_route);
        true
    }

    /// Abort a pending success cue and return to IDLE without navigating.
    pub fn cancel_success_cue(&mut self) {
        if let Some(cue) = self.cue.take() {
            cue.cancel();
            if let Err(e) = StateMachine::next(&mut self.state, Event::CueCancelled) {
                log::error!("cannot cancel success cue: {e}");
            }
        }
    }

    /// Acknowledge a failure held under [`FailurePolicy::HoldUntilDismissed`].
    pub fn dismiss_failure(&mut self) -> Result<(), CarscanError> {
        self.expect_phase(Phase::Failed)?;
        StateMachine::next(&mut self.state, Event::Dismiss)?;
        Ok(())
    }

    fn expect_phase(&self, expected: Phase) -> Result<(), WorkflowError> {
        let actual = self.phase();
        if actual == expected {
            Ok(())
        } else {
            Err(WorkflowError::InvalidPhase { expected, actual })
        }
    }

    fn dispatch_capture_sound(&self) {
        let feedback = Arc::clone(&self.services.feedback);
        tokio::spawn(async move {
            if let Err(e) = feedback.play_capture_sound().await {
                log::warn!("capture sound failed: {e}");
            }
        });
    }

    fn dispatch_push(&self, uid: String, label: &str) {
        let push = Arc::clone(&self.services.push);
        let notification = PushNotification {
            sub_id: uid,
            app_id: self.config.app_id.clone(),
            app_token: self.config.app_token.clone(),
            title: PUSH_TITLE.to_string(),
            message: format!("Predicted car: {label}"),
        };
        tokio::spawn(async move {
            if let Err(e) = push.notify(&notification).await {
                log::warn!("push notification failed: {e}");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::PredictionService;
    use crate::remote::images_path;
    use crate::services::{
        AuthContext, Camera, FeedbackCue, LibraryPicker, LocalStore, Navigator, PushRelay,
        RemoteStore,
    };
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    // --- Mock collaborators ---

    struct MockCamera {
        permission: Permission,
        uri: String,
        captures: AtomicUsize,
        last_settings: Mutex<Option<CameraSettings>>,
    }

    #[async_trait]
    impl Camera for MockCamera {
        async fn request_permission(&self) -> Permission {
            self.permission
        }

        async fn capture(&self, settings: &CameraSettings) -> Result<CapturedPhoto, CarscanError> {
            self.captures.fetch_add(1, Ordering::SeqCst);
            *self.last_settings.lock().unwrap() = Some(*settings);
            Ok(CapturedPhoto::new(self.uri.clone(), PhotoSource::Camera))
        }
    }

    struct MockPicker {
        permission: Permission,
        uri: Option<String>,
    }

    #[async_trait]
    impl LibraryPicker for MockPicker {
        async fn request_permission(&self) -> Permission {
            self.permission
        }

        async fn pick(&self) -> Result<Option<CapturedPhoto>, CarscanError> {
            Ok(self
                .uri
                .clone()
                .map(|uri| CapturedPhoto::new(uri, PhotoSource::Library)))
        }
    }

    enum Reply {
        Prediction(&'static str, Value),
        Status(u16),
        Malformed,
    }

    struct MockPredictor {
        reply: Reply,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PredictionService for MockPredictor {
        async fn predict(
            &self,
            _photo: &CapturedPhoto,
        ) -> Result<PredictionResponse, PredictionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Reply::Prediction(label, details) => Ok(PredictionResponse {
                    prediction: label.to_string(),
                    details: details.clone(),
                }),
                Reply::Status(status) => Err(PredictionError::ApiError {
                    status: *status,
                    message: "mock error".into(),
                }),
                Reply::Malformed => Err(PredictionError::Malformed("missing field".into())),
            }
        }
    }

    struct MockAuth(Option<&'static str>);

    impl AuthContext for MockAuth {
        fn uid(&self) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    #[derive(Default)]
    struct MockRemote {
        fail: bool,
        writes: Mutex<Vec<(String, StoredImage)>>,
    }

    #[async_trait]
    impl RemoteStore for MockRemote {
        async fn append_image(
            &self,
            uid: &str,
            record: &StoredImage,
        ) -> Result<String, CarscanError> {
            if self.fail {
                return Err(CarscanError::Store("permission denied".into()));
            }
            self.writes
                .lock()
                .unwrap()
                .push((images_path(uid), record.clone()));
            Ok("-Nkey".into())
        }
    }

    #[derive(Default)]
    struct MockLocal {
        images: Mutex<Vec<(CapturedPhoto, String, Value)>>,
    }

    impl LocalStore for MockLocal {
        fn add_image(&self, photo: &CapturedPhoto, prediction: &str, details: &Value) {
            self.images
                .lock()
                .unwrap()
                .push((photo.clone(), prediction.to_string(), details.clone()));
        }
    }

    #[derive(Default)]
    struct MockNavigator {
        routes: Mutex<Vec<String>>,
    }

    impl Navigator for MockNavigator {
        fn navigate_to(&self, route: &str) {
            self.routes.lock().unwrap().push(route.to_string());
        }
    }

    #[derive(Default)]
    struct MockFeedback {
        fail: bool,
        plays: AtomicUsize,
    }

    #[async_trait]
    impl FeedbackCue for MockFeedback {
        async fn play_capture_sound(&self) -> Result<(), CarscanError> {
            self.plays.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(CarscanError::Feedback("no audio device".into()))
            } else {
                Ok(())
            }
        }
    }

    #[derive(Default)]
    struct MockPush {
        fail: bool,
        sent: Mutex<Vec<PushNotification>>,
    }

    #[async_trait]
    impl PushRelay for MockPush {
        async fn notify(&self, notification: &PushNotification) -> Result<(), CarscanError> {
            self.sent.lock().unwrap().push(notification.clone());
            if self.fail {
                Err(CarscanError::Store("relay down".into()))
            } else {
                Ok(())
            }
        }
    }

    // --- Harness ---

    struct Harness {
        camera: Arc<MockCamera>,
        predictor: Arc<MockPredictor>,
        remote: Arc<MockRemote>,
        local: Arc<MockLocal>,
        navigator: Arc<MockNavigator>,
        feedback: Arc<MockFeedback>,
        push: Arc<MockPush>,
        services: Services,
    }

    struct Setup {
        reply: Reply,
        uid: Option<&'static str>,
        camera_permission: Permission,
        picker_permission: Permission,
        picked: Option<&'static str>,
        remote_fails: bool,
        sound_fails: bool,
        push_fails: bool,
    }

    impl Default for Setup {
        fn default() -> Self {
            Self {
                reply: Reply::Prediction("Sedan", json!({"confidence": 0.81})),
                uid: None,
                camera_permission: Permission::Granted,
                picker_permission: Permission::Granted,
                picked: Some("file://library/b.jpg"),
                remote_fails: false,
                sound_fails: false,
                push_fails: false,
            }
        }
    }

    impl Harness {
        fn new(setup: Setup) -> Self {
            let camera = Arc::new(MockCamera {
                permission: setup.camera_permission,
                uri: "file://tmp/a.jpg".into(),
                captures: AtomicUsize::new(0),
                last_settings: Mutex::new(None),
            });
            let picker = Arc::new(MockPicker {
                permission: setup.picker_permission,
                uri: setup.picked.map(str::to_string),
            });
            let predictor = Arc::new(MockPredictor {
                reply: setup.reply,
                calls: AtomicUsize::new(0),
            });
            let remote = Arc::new(MockRemote {
                fail: setup.remote_fails,
                ..Default::default()
            });
            let local = Arc::new(MockLocal::default());
            let navigator = Arc::new(MockNavigator::default());
            let feedback = Arc::new(MockFeedback {
                fail: setup.sound_fails,
                ..Default::default()
            });
            let push = Arc::new(MockPush {
                fail: setup.push_fails,
                ..Default::default()
            });

            let services = Services {
                camera: camera.clone(),
                picker,
                predictor: predictor.clone(),
                auth: Arc::new(MockAuth(setup.uid)),
                remote_store: remote.clone(),
                local_store: local.clone(),
                navigator: navigator.clone(),
                feedback: feedback.clone(),
                push: push.clone(),
            };

            Self {
                camera,
                predictor,
                remote,
                local,
                navigator,
                feedback,
                push,
                services,
            }
        }

        fn workflow(&self) -> Workflow {
            self.workflow_with(WorkflowConfig::default())
        }

        fn workflow_with(&self, config: WorkflowConfig) -> Workflow {
            Workflow::new(self.services.clone(), config)
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    // --- Acquisition ---

    #[tokio::test]
    async fn camera_capture_moves_to_reviewing_and_plays_sound() {
        let h = Harness::new(Setup::default());
        let mut wf = h.workflow();

        let photo = wf.acquire_photo(PhotoSource::Camera).await.unwrap();
        assert_eq!(photo.uri(), "file://tmp/a.jpg");
        assert_eq!(wf.phase(), Phase::Reviewing);
        assert_eq!(wf.photo(), Some(&photo));

        settle().await;
        assert_eq!(h.feedback.plays.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn library_pick_does_not_play_sound() {
        let h = Harness::new(Setup::default());
        let mut wf = h.workflow();

        let photo = wf.acquire_photo(PhotoSource::Library).await.unwrap();
        assert_eq!(photo.source(), PhotoSource::Library);
        assert_eq!(wf.phase(), Phase::Reviewing);

        settle().await;
        assert_eq!(h.feedback.plays.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn sound_failure_does_not_block_review() {
        let h = Harness::new(Setup {
            sound_fails: true,
            ..Default::default()
        });
        let mut wf = h.workflow();

        wf.acquire_photo(PhotoSource::Camera).await.unwrap();
        settle().await;
        assert_eq!(h.feedback.plays.load(Ordering::SeqCst), 1);
        assert_eq!(wf.phase(), Phase::Reviewing);
    }

    #[tokio::test]
    async fn denied_camera_permission_leaves_idle() {
        let h = Harness::new(Setup {
            camera_permission: Permission::Denied,
            ..Default::default()
        });
        let mut wf = h.workflow();

        let err = wf.acquire_photo(PhotoSource::Camera).await.unwrap_err();
        assert!(matches!(err, CarscanError::PermissionDenied(PhotoSource::Camera)));
        assert_eq!(wf.phase(), Phase::Idle);
        assert_eq!(h.camera.captures.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn denied_library_permission_leaves_idle() {
        let h = Harness::new(Setup {
            picker_permission: Permission::Denied,
            ..Default::default()
        });
        let mut wf = h.workflow();

        let err = wf.acquire_photo(PhotoSource::Library).await.unwrap_err();
        assert!(matches!(err, CarscanError::PermissionDenied(PhotoSource::Library)));
        assert_eq!(wf.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn cancelled_pick_leaves_idle() {
        let h = Harness::new(Setup {
            picked: None,
            ..Default::default()
        });
        let mut wf = h.workflow();

        let err = wf.acquire_photo(PhotoSource::Library).await.unwrap_err();
        assert!(matches!(err, CarscanError::PickerCancelled));
        assert_eq!(wf.phase(), Phase::Idle);
        assert!(wf.photo().is_none());
    }

    #[tokio::test]
    async fn acquire_requires_idle() {
        let h = Harness::new(Setup::default());
        let mut wf = h.workflow();
        wf.acquire_photo(PhotoSource::Camera).await.unwrap();

        let err = wf.acquire_photo(PhotoSource::Library).await.unwrap_err();
        assert!(matches!(
            err,
            CarscanError::Workflow(WorkflowError::InvalidPhase {
                expected: Phase::Idle,
                actual: Phase::Reviewing
            })
        ));
    }

    #[tokio::test]
    async fn capture_uses_current_camera_settings() {
        let h = Harness::new(Setup::default());
        let mut wf = h.workflow();
        wf.toggle_flash();
        wf.flip_camera();
        wf.adjust_zoom(0.4);

        wf.acquire_photo(PhotoSource::Camera).await.unwrap();
        let settings = (*h.camera.last_settings.lock().unwrap()).unwrap();
        assert_eq!(settings.flash, crate::workflow::FlashMode::On);
        assert_eq!(settings.facing, crate::workflow::Facing::Front);
        assert!((settings.zoom - 0.4).abs() < 1e-12);
    }

    // --- Retake ---

    #[tokio::test]
    async fn retake_returns_to_idle_for_both_sources() {
        for source in [PhotoSource::Camera, PhotoSource::Library] {
            let h = Harness::new(Setup::default());
            let mut wf = h.workflow();

            wf.acquire_photo(source).await.unwrap();
            wf.retake().unwrap();

            assert_eq!(wf.phase(), Phase::Idle);
            assert!(wf.photo().is_none());
            assert!(wf.prediction().is_none());
            assert_eq!(h.predictor.calls.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn retake_outside_review_is_rejected() {
        let h = Harness::new(Setup::default());
        let mut wf = h.workflow();
        assert!(wf.retake().is_err());
        assert_eq!(wf.phase(), Phase::Idle);
    }

    // --- Submission ---

    #[tokio::test(start_paused = true)]
    async fn anonymous_success_stores_locally_then_returns_to_idle() {
        let h = Harness::new(Setup::default());
        let mut wf = h.workflow();
        let photo = wf.acquire_photo(PhotoSource::Camera).await.unwrap();

        let outcome = wf.submit().await;
        assert_eq!(
            outcome,
            SubmitOutcome::Succeeded(PredictionResult {
                label: "Sedan".into(),
                details: json!({"confidence": 0.81}),
            })
        );
        assert_eq!(wf.phase(), Phase::Succeeded);
        assert_eq!(wf.prediction().unwrap().label, "Sedan");

        {
            let images = h.local.images.lock().unwrap();
            assert_eq!(images.len(), 1);
            assert_eq!(images[0].0, photo);
            assert_eq!(images[0].1, "Sedan");
            assert_eq!(images[0].2, json!({"confidence": 0.81}));
        }
        assert!(h.remote.writes.lock().unwrap().is_empty());

        let start = Instant::now();
        assert!(wf.complete_success_cue().await);
        assert!(start.elapsed() >= Duration::from_secs(3));

        assert_eq!(wf.phase(), Phase::Idle);
        assert!(wf.photo().is_none());
        assert!(wf.prediction().is_none());
        assert_eq!(*h.navigator.routes.lock().unwrap(), vec!["Library".to_string()]);
        // Anonymous users get no push notification.
        assert!(h.push.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn server_error_resets_without_store_write() {
        let h = Harness::new(Setup {
            reply: Reply::Status(500),
            ..Default::default()
        });
        let mut wf = h.workflow();
        wf.acquire_photo(PhotoSource::Camera).await.unwrap();

        let outcome = wf.submit().await;
        assert!(matches!(outcome, SubmitOutcome::Failed(msg) if msg.contains("500")));
        assert_eq!(wf.phase(), Phase::Idle);
        assert!(wf.photo().is_none());
        assert_eq!(
            wf.history(),
            &[Phase::Idle, Phase::Reviewing, Phase::Submitting, Phase::Idle]
        );
        assert!(h.local.images.lock().unwrap().is_empty());
        assert!(h.remote.writes.lock().unwrap().is_empty());
        assert!(wf.last_failure().unwrap().contains("500"));
        assert!(!wf.complete_success_cue().await);
        assert!(h.navigator.routes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_response_is_a_failure() {
        let h = Harness::new(Setup {
            reply: Reply::Malformed,
            ..Default::default()
        });
        let mut wf = h.workflow();
        wf.acquire_photo(PhotoSource::Library).await.unwrap();

        assert!(matches!(wf.submit().await, SubmitOutcome::Failed(_)));
        assert_eq!(wf.phase(), Phase::Idle);
        assert!(h.local.images.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn remote_store_failure_is_a_failure() {
        let h = Harness::new(Setup {
            uid: Some("abc123"),
            remote_fails: true,
            ..Default::default()
        });
        let mut wf = h.workflow();
        wf.acquire_photo(PhotoSource::Camera).await.unwrap();

        let outcome = wf.submit().await;
        assert!(matches!(outcome, SubmitOutcome::Failed(msg) if msg.contains("storing")));
        assert_eq!(wf.phase(), Phase::Idle);
        assert!(h.local.images.lock().unwrap().is_empty());
        settle().await;
        assert!(h.push.sent.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn submit_while_submitting_is_ignored() {
        let h = Harness::new(Setup::default());
        let mut wf = h.workflow();
        wf.acquire_photo(PhotoSource::Camera).await.unwrap();

        let photo = wf.begin_submit().unwrap();
        assert_eq!(wf.phase(), Phase::Submitting);

        assert_eq!(wf.submit().await, SubmitOutcome::Ignored);
        assert!(wf.begin_submit().is_none());
        assert_eq!(h.predictor.calls.load(Ordering::SeqCst), 0);
        assert_eq!(wf.phase(), Phase::Submitting);

        let response = h.predictor.predict(&photo).await;
        let outcome = wf.finish_submit(&photo, response).await;
        assert!(matches!(outcome, SubmitOutcome::Succeeded(_)));
        assert_eq!(h.predictor.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.local.images.lock().unwrap().len(), 1);

        assert!(wf.complete_success_cue().await);
        assert_eq!(wf.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn repeated_submit_sends_one_request() {
        let h = Harness::new(Setup::default());
        let mut wf = h.workflow();
        wf.acquire_photo(PhotoSource::Camera).await.unwrap();

        assert!(matches!(wf.submit().await, SubmitOutcome::Succeeded(_)));
        assert_eq!(wf.submit().await, SubmitOutcome::Ignored);
        assert_eq!(h.predictor.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.local.images.lock().unwrap().len(), 1);
        assert_eq!(wf.phase(), Phase::Succeeded);
    }

    #[tokio::test]
    async fn submit_from_idle_is_ignored() {
        let h = Harness::new(Setup::default());
        let mut wf = h.workflow();
        assert_eq!(wf.submit().await, SubmitOutcome::Ignored);
        assert_eq!(h.predictor.calls.load(Ordering::SeqCst), 0);
        assert_eq!(wf.history(), &[Phase::Idle]);
    }

    #[tokio::test(start_paused = true)]
    async fn signed_in_user_gets_remote_write_push_and_navigation() {
        let h = Harness::new(Setup {
            uid: Some("abc123"),
            reply: Reply::Prediction("SUV", json!({"confidence": 0.92})),
            ..Default::default()
        });
        let mut wf = h.workflow_with(WorkflowConfig {
            app_id: "17".into(),
            app_token: "secret".into(),
            ..Default::default()
        });

        let photo = wf.acquire_photo(PhotoSource::Camera).await.unwrap();
        assert_eq!(photo.uri(), "file://tmp/a.jpg");

        let outcome = wf.submit().await;
        assert!(matches!(outcome, SubmitOutcome::Succeeded(ref r) if r.label == "SUV"));

        {
            let writes = h.remote.writes.lock().unwrap();
            assert_eq!(writes.len(), 1);
            let (location, record) = &writes[0];
            assert_eq!(location, "users/abc123/images");
            assert_eq!(
                serde_json::to_value(record).unwrap(),
                json!({
                    "imageUri": "file://tmp/a.jpg",
                    "prediction": "SUV",
                    "details": {"confidence": 0.92}
                })
            );
        }
        assert!(h.local.images.lock().unwrap().is_empty());

        assert!(wf.complete_success_cue().await);
        assert_eq!(*h.navigator.routes.lock().unwrap(), vec!["Library".to_string()]);
        assert_eq!(wf.phase(), Phase::Idle);

        let sent = h.push.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].sub_id, "abc123");
        assert_eq!(sent[0].app_id, "17");
        assert_eq!(sent[0].title, "Prediction Successful!");
        assert_eq!(sent[0].message, "Predicted car: SUV");
    }

    #[tokio::test(start_paused = true)]
    async fn push_failure_does_not_affect_success() {
        let h = Harness::new(Setup {
            uid: Some("abc123"),
            push_fails: true,
            ..Default::default()
        });
        let mut wf = h.workflow();
        wf.acquire_photo(PhotoSource::Camera).await.unwrap();

        assert!(matches!(wf.submit().await, SubmitOutcome::Succeeded(_)));
        settle().await;
        assert_eq!(h.push.sent.lock().unwrap().len(), 1);
        assert_eq!(wf.phase(), Phase::Succeeded);
        assert!(wf.complete_success_cue().await);
        assert_eq!(wf.phase(), Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn new_photo_after_success_has_no_stale_prediction() {
        let h = Harness::new(Setup::default());
        let mut wf = h.workflow();
        wf.acquire_photo(PhotoSource::Camera).await.unwrap();
        wf.submit().await;
        wf.complete_success_cue().await;

        wf.acquire_photo(PhotoSource::Library).await.unwrap();
        assert_eq!(wf.phase(), Phase::Reviewing);
        assert!(wf.prediction().is_none());
    }

    // --- Success cue teardown ---

    #[tokio::test(start_paused = true)]
    async fn cancelled_cue_never_navigates() {
        let h = Harness::new(Setup::default());
        let mut wf = h.workflow();
        wf.acquire_photo(PhotoSource::Camera).await.unwrap();
        wf.submit().await;

        wf.cancel_success_cue();
        assert_eq!(wf.phase(), Phase::Idle);
        assert!(!wf.complete_success_cue().await);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(h.navigator.routes.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_cue_wait_can_still_be_cancelled() {
        let h = Harness::new(Setup::default());
        let mut wf = h.workflow();
        wf.acquire_photo(PhotoSource::Camera).await.unwrap();
        wf.submit().await;

        let waited = tokio::time::timeout(Duration::from_secs(1), wf.complete_success_cue()).await;
        assert!(waited.is_err());
        assert_eq!(wf.phase(), Phase::Succeeded);

        wf.cancel_success_cue();
        assert_eq!(wf.phase(), Phase::Idle);
        assert!(wf.photo().is_none());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(h.navigator.routes.lock().unwrap().is_empty());
        wf.acquire_photo(PhotoSource::Library).await.unwrap();
        assert_eq!(wf.phase(), Phase::Reviewing);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_cue_wait_can_be_resumed() {
        let h = Harness::new(Setup::default());
        let mut wf = h.workflow();
        wf.acquire_photo(PhotoSource::Camera).await.unwrap();
        wf.submit().await;

        let waited = tokio::time::timeout(Duration::from_secs(1), wf.complete_success_cue()).await;
        assert!(waited.is_err());

        let start = Instant::now();
        assert!(wf.complete_success_cue().await);
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert_eq!(wf.phase(), Phase::Idle);
        assert_eq!(*h.navigator.routes.lock().unwrap(), vec!["Library".to_string()]);
        assert!(!wf.complete_success_cue().await);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_workflow_never_navigates() {
        let h = Harness::new(Setup::default());
        let mut wf = h.workflow();
        wf.acquire_photo(PhotoSource::Camera).await.unwrap();
        wf.submit().await;
        drop(wf);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(h.navigator.routes.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn custom_cue_duration_and_route() {
        let h = Harness::new(Setup::default());
        let mut wf = h.workflow_with(WorkflowConfig {
            success_cue: Duration::from_millis(500),
            results_route: "History".into(),
            ..Default::default()
        });
        wf.acquire_photo(PhotoSource::Camera).await.unwrap();
        wf.submit().await;

        let start = Instant::now();
        assert!(wf.complete_success_cue().await);
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(500));
        assert!(waited < Duration::from_secs(3));
        assert_eq!(*h.navigator.routes.lock().unwrap(), vec!["History".to_string()]);
    }

    // --- Held failures ---

    #[tokio::test]
    async fn held_failure_waits_for_dismiss() {
        let h = Harness::new(Setup {
            reply: Reply::Status(503),
            ..Default::default()
        });
        let mut wf = h.workflow_with(WorkflowConfig {
            failure_policy: FailurePolicy::HoldUntilDismissed,
            ..Default::default()
        });
        wf.acquire_photo(PhotoSource::Camera).await.unwrap();

        assert!(matches!(wf.submit().await, SubmitOutcome::Failed(_)));
        assert_eq!(wf.phase(), Phase::Failed);
        assert!(wf.photo().is_none());
        assert!(wf.acquire_photo(PhotoSource::Camera).await.is_err());

        wf.dismiss_failure().unwrap();
        assert_eq!(wf.phase(), Phase::Idle);
        assert!(wf.dismiss_failure().is_err());
    }

    // --- Zoom ---

    #[tokio::test]
    async fn zoom_is_clamped_for_any_sequence() {
        let h = Harness::new(Setup::default());
        let mut wf = h.workflow();

        for delta in [0.3, 0.9, -0.2, -5.0, 0.05, 2.0, -0.01, f64::NAN] {
            let z = wf.adjust_zoom(delta);
            assert!((0.0..=1.0).contains(&z));
        }
        assert_eq!(wf.adjust_zoom(10.0), 1.0);
        assert_eq!(wf.adjust_zoom(-10.0), 0.0);
    }

    #[tokio::test]
    async fn pinch_uses_injected_sensitivity() {
        let h = Harness::new(Setup::default());
        let mut ios = h.workflow();
        let mut android = h.workflow_with(WorkflowConfig {
            sensitivity: ZoomSensitivity::for_platform(crate::workflow::Platform::Android),
            ..Default::default()
        });

        let gesture = PinchGesture {
            velocity: 20.0,
            scale: 1.0,
        };
        assert!((ios.pinch(gesture) - 0.01).abs() < 1e-12);
        assert_eq!(android.pinch(gesture), 1.0);
        assert_eq!(ios.zoom(), ios.camera_settings().zoom);
    }
}
