//! Application state: the active screen, the asset library, and the scene on
//! display, driven through the screen state machine.

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::capture::{BoxedStream, Camera, CaptureError, CaptureSession, DEFAULT_JPEG_QUALITY};
use crate::library::{AssetLibrary, LibraryError};
use crate::models::{CapturedImage, ObjectDescription, StoredObject};
use crate::reconstruct::{InferenceBackend, ReconstructionClient, ReconstructionError};
use crate::router::{Action, Screen, TransitionError, WELCOME_DELAY};
use crate::scene::{self, ArError, ArRuntime, ExportError, ExportFormat, ExportedFile, Pose, Ray, Scene};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Reconstruction(#[from] ReconstructionError),

    #[error(transparent)]
    Library(#[from] LibraryError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Ar(#[from] ArError),

    #[error("No scene is open")]
    NoActiveScene,

    #[error("No capture session is open")]
    NoCaptureSession,

    #[error("Stored object not found: {0}")]
    NotFound(Uuid),
}

/// A message the user has to acknowledge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    CameraUnavailable(String),
    ReconstructionFailed(String),
    ExportFailed(String),
    /// The saved library could not be read and was moved to `backup_key`.
    LibraryRecovered { backup_key: String },
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CameraUnavailable(msg) => write!(f, "Camera access denied: {}", msg),
            Self::ReconstructionFailed(msg) => write!(f, "Error: {}", msg),
            Self::ExportFailed(msg) => write!(f, "Failed to export model: {}", msg),
            Self::LibraryRecovered { backup_key } => write!(
                f,
                "Your saved library could not be read. A copy was kept under {}",
                backup_key
            ),
        }
    }
}

/// The description on display and the scene built from it.
#[derive(Debug, Clone)]
pub struct ActiveScene {
    pub description: ObjectDescription,
    pub scene: Scene,
}

impl ActiveScene {
    fn new(description: ObjectDescription) -> Self {
        let scene = Scene::materialize(&description);
        Self { description, scene }
    }
}

pub struct App {
    screen: Screen,
    library: AssetLibrary,
    /// Open only while on the capture screen.
    capture: Option<CaptureSession<BoxedStream>>,
    active: Option<ActiveScene>,
    notice: Option<Notice>,
    jpeg_quality: u8,
}

impl App {
    pub fn new(library: AssetLibrary) -> Self {
        Self {
            screen: Screen::Welcome,
            library,
            capture: None,
            active: None,
            notice: None,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn library(&self) -> &AssetLibrary {
        &self.library
    }

    pub fn capture_session(&self) -> Option<&CaptureSession<BoxedStream>> {
        self.capture.as_ref()
    }

    pub fn active(&self) -> Option<&ActiveScene> {
        self.active.as_ref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    pub fn notify(&mut self, notice: Notice) {
        tracing::warn!("{}", notice);
        self.notice = Some(notice);
    }

    fn go(&mut self, action: Action) -> Result<Screen, TransitionError> {
        let next = self.screen.transition(action)?;
        tracing::info!(from = self.screen.as_str(), to = next.as_str(), "Screen change");
        self.screen = next;
        Ok(next)
    }

    /// Leave the welcome screen.
    pub fn finish_welcome(&mut self) -> Result<(), AppError> {
        self.go(Action::WelcomeElapsed)?;
        Ok(())
    }

    /// Advance time-driven transitions. The welcome screen gives way to Home once
    /// [`WELCOME_DELAY`] has passed since launch.
    pub fn tick(&mut self, since_launch: Duration) {
        if self.screen == Screen::Welcome && since_launch >= WELCOME_DELAY {
            let _ = self.go(Action::WelcomeElapsed);
        }
    }

    /// Explicit navigation to Home. An open camera is released and an unsaved
    /// scene is discarded.
    pub fn go_home(&mut self) -> Result<(), AppError> {
        self.go(Action::GoHome)?;
        self.release_camera();
        self.active = None;
        Ok(())
    }

    pub fn open_library(&mut self) -> Result<(), AppError> {
        self.go(Action::OpenLibrary)?;
        Ok(())
    }

    /// Move to the capture screen and open the rear camera. If the camera is
    /// unavailable the user is notified and the app stays on Home.
    pub fn start_scan<C>(&mut self, camera: &mut C) -> Result<(), AppError>
    where
        C: Camera,
        C::Stream: Send + 'static,
    {
        self.screen.transition(Action::StartScan)?;
        match CaptureSession::start_with_quality(camera, self.jpeg_quality) {
            Ok(session) => {
                self.go(Action::StartScan)?;
                self.capture = Some(session.boxed());
                Ok(())
            }
            Err(e) => {
                self.notify(Notice::CameraUnavailable(e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Press the shutter on the open capture session.
    pub fn capture_frame(&mut self) -> Result<&CapturedImage, AppError> {
        let session = self.capture.as_mut().ok_or(AppError::NoCaptureSession)?;
        Ok(session.capture()?)
    }

    /// Release the camera, discard the captured images, and return Home.
    pub fn cancel_scan(&mut self) -> Result<(), AppError> {
        self.go(Action::CancelCapture)?;
        self.release_camera();
        Ok(())
    }

    fn release_camera(&mut self) {
        if let Some(session) = self.capture.take() {
            session.cancel();
        }
    }

    /// Close the capture session, move to Processing, and run the reconstruction.
    ///
    /// With fewer than two images nothing changes, the session stays open, and no
    /// request is sent. On success the description becomes the active scene and
    /// the viewer opens. On failure, or if this future is dropped before the
    /// request settles, the user is notified and the app returns to Home with
    /// nothing retained.
    pub async fn complete_scan<B: InferenceBackend>(
        &mut self,
        client: &ReconstructionClient<B>,
    ) -> Result<&ActiveScene, AppError> {
        self.screen.transition(Action::CompleteCapture)?;
        let session = self.capture.as_mut().ok_or(AppError::NoCaptureSession)?;
        let images = session.complete()?;
        self.capture = None;
        self.go(Action::CompleteCapture)?;

        let mut pending = PendingReconstruction {
            app: &mut *self,
            settled: false,
        };
        let result = client.reconstruct(&images).await;
        pending.settled = true;
        drop(pending);
        drop(images);

        match result {
            Ok(description) => {
                self.go(Action::ReconstructionSucceeded)?;
                Ok(self.active.insert(ActiveScene::new(description)))
            }
            Err(e) => {
                self.fail_reconstruction(e.to_string());
                Err(e.into())
            }
        }
    }

    fn fail_reconstruction(&mut self, message: String) {
        self.active = None;
        self.notify(Notice::ReconstructionFailed(message));
        if let Err(e) = self.go(Action::ReconstructionFailed) {
            tracing::error!("{}", e);
        }
    }

    /// Save the active scene to the library and show the library.
    pub fn save_active(&mut self) -> Result<StoredObject, AppError> {
        self.screen.transition(Action::SaveScene)?;
        let active = self.active.as_ref().ok_or(AppError::NoActiveScene)?;
        let stored = self.library.add(&active.description)?;
        self.go(Action::SaveScene)?;
        Ok(stored)
    }

    /// Open a stored object in the viewer.
    pub fn open_stored(&mut self, id: Uuid) -> Result<&ActiveScene, AppError> {
        self.screen.transition(Action::SelectStored)?;
        let description = self
            .library
            .get(id)
            .ok_or(AppError::NotFound(id))?
            .params
            .clone();
        self.go(Action::SelectStored)?;
        Ok(self.active.insert(ActiveScene::new(description)))
    }

    pub fn delete_stored(&mut self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.library.remove(id)?)
    }

    /// Export the active scene. Failures are reported to the user and leave the
    /// scene untouched so the export can be retried.
    pub fn export_active(&mut self, format: ExportFormat) -> Result<ExportedFile, AppError> {
        let active = self.active.as_ref().ok_or(AppError::NoActiveScene)?;
        match scene::export(&active.scene, format) {
            Ok(file) => Ok(file),
            Err(e) => {
                self.notify(Notice::ExportFailed(e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Place the active scene on the surface hit by `ray`.
    pub fn place_in_ar(&mut self, runtime: &mut impl ArRuntime, ray: &Ray) -> Result<Pose, AppError> {
        let active = self.active.as_mut().ok_or(AppError::NoActiveScene)?;
        Ok(scene::place(runtime, &mut active.scene, ray)?)
    }
}

/// Returns the app to Home if a reconstruction is abandoned before it settles.
struct PendingReconstruction<'a> {
    app: &'a mut App,
    settled: bool,
}

impl Drop for PendingReconstruction<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!("Reconstruction dropped before it finished");
            self.app
                .fail_reconstruction("Reconstruction was cancelled".to_string());
        }
    }
}
