//! The screen state machine.
//!
//! Exactly one [`Screen`] is active. Every change goes through
//! [`Screen::transition`], which rejects anything not listed in its table.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// How long the welcome screen stays up before moving to Home.
pub const WELCOME_DELAY: Duration = Duration::from_millis(3500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Welcome,
    Home,
    Capture,
    Processing,
    Viewer,
    Library,
}

impl Screen {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::Home => "home",
            Self::Capture => "capture",
            Self::Processing => "processing",
            Self::Viewer => "viewer",
            Self::Library => "library",
        }
    }

    /// The screen reached by performing `action` here.
    pub fn transition(self, action: Action) -> Result<Screen, TransitionError> {
        use Action::*;
        use Screen::*;

        let next = match (self, action) {
            (Welcome, WelcomeElapsed) => Home,
            (Home, StartScan) => Capture,
            (Home, OpenLibrary) => Library,
            (Capture, CancelCapture) => Home,
            (Capture, CompleteCapture) => Processing,
            (Processing, ReconstructionSucceeded) => Viewer,
            (Processing, ReconstructionFailed) => Home,
            (Viewer, SaveScene) => Library,
            (Library, SelectStored) => Viewer,
            // The outstanding request cannot be abandoned.
            (Processing, GoHome) => return Err(TransitionError { from: self, action }),
            (_, GoHome) => Home,
            _ => return Err(TransitionError { from: self, action }),
        };
        Ok(next)
    }
}

/// Something that can move the app between screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    WelcomeElapsed,
    StartScan,
    CancelCapture,
    CompleteCapture,
    ReconstructionSucceeded,
    ReconstructionFailed,
    SaveScene,
    OpenLibrary,
    SelectStored,
    GoHome,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Cannot {action:?} from the {} screen", .from.as_str())]
pub struct TransitionError {
    pub from: Screen,
    pub action: Action,
}

/// Status line shown while a reconstruction is running.
pub fn processing_status(elapsed: Duration) -> &'static str {
    match elapsed.as_secs() {
        0..=1 => "EXTRACTING SPATIAL DATA...",
        2..=3 => "MAPPING GEOMETRIC PRIMITIVES...",
        _ => "SYNTHESIZING DIGITAL TWIN...",
    }
}
