//! Session state machine.
//!
//! Tracks the coarse UI lifecycle ([`UiState`]) and the status progression of
//! the current scan attempt. Every input returns the [`Effect`]s it caused;
//! the machine itself never talks to listeners, which keeps it free of I/O and
//! easy to drive from tests.
//!
//! ```text
//!            configure
//!               │
//!               ▼
//!  ┌──────── LOADING ────────┐
//!  │ ready                   │ load failed
//!  ▼                         ▼
//! NONE ◄──── attempt ───── ERROR
//!  │  ▲                      ▲
//!  │  └──── attempt ─────┐   │ terminal camera error
//!  │ ScanSuccessful      │   │
//!  ▼                     │   │
//! SUCCESS ───────────────┘   │
//!  NONE ─────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::config::SessionConfig;
use crate::engine::{EngineHandle, ScanSource};
use crate::error::{EngineError, ErrorCode, HostError, ScanResult};
use crate::experience::{CameraExperience, CameraExperienceState, ExperienceTimeline};
use crate::feedback::{FeedbackCode, FeedbackMessage};
use crate::status::{RecognitionResults, RecognitionStatus};
use crate::translations::{self, Translations};

/// Coarse UI lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UiState {
    /// Idle, waiting for the user.
    None,
    /// Engine bootstrap in progress.
    Loading,
    /// Fatal error surface.
    Error,
    /// Last attempt succeeded.
    Success,
}

impl UiState {
    /// Parse the wire form (`NONE`, `LOADING`, `ERROR`, `SUCCESS`).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "NONE" => Some(Self::None),
            "LOADING" => Some(Self::Loading),
            "ERROR" => Some(Self::Error),
            "SUCCESS" => Some(Self::Success),
            _ => None,
        }
    }
}

/// What put the machine into [`UiState::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorOrigin {
    /// Configuration or engine bootstrap failure.
    Bootstrap,
    /// Terminal camera failure during an attempt.
    Attempt,
    /// Host override through `set_ui_state`.
    External,
}

/// What a rendering host should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Presentation {
    /// Nothing at all.
    Hidden,
    /// Loading screen.
    Loading,
    /// Action buttons, ready for the user.
    Idle,
    /// Error rendered inside the component.
    InlineError,
    /// Error rendered as a blocking modal.
    ModalError,
    /// Success screen.
    Success,
}

/// Lifecycle transition worth an outbound event.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Engine loaded.
    Ready(EngineHandle),
    /// Configuration or engine bootstrap failed.
    BootstrapFailed(EngineError),
    /// A scan attempt began.
    AttemptStarted(ScanSource),
    /// The attempt produced a result.
    AttemptSucceeded(RecognitionResults),
    /// The attempt ended without result.
    AttemptFailed {
        /// Public error code.
        code: ErrorCode,
        /// Whether the session left the idle state.
        fatal: bool,
        /// Human readable description.
        message: String,
        /// Recognizer the attempt ran with.
        recognizer_name: String,
    },
}

/// Output of a state machine step.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Lifecycle transition, mapped to an outbound event.
    Transition(Transition),
    /// User feedback to publish.
    Feedback(FeedbackMessage),
    /// Camera overlay change.
    Experience(CameraExperienceState),
}

/// Subset of [`SessionConfig`] the state machine acts on.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    /// Overlay flavour for camera attempts.
    pub experience: CameraExperience,
    /// Suppress loading and error screens.
    pub hide_loading_and_error_ui: bool,
    /// Present errors as modals.
    pub show_modal_windows: bool,
    /// Recognizer name reported when the engine names none.
    pub recognizer_name: String,
    /// Feedback texts.
    pub translations: Translations,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            experience: CameraExperience::CardSingleSide,
            hide_loading_and_error_ui: false,
            show_modal_windows: false,
            recognizer_name: String::new(),
            translations: Translations::default(),
        }
    }
}

impl From<&SessionConfig> for SessionOptions {
    fn from(config: &SessionConfig) -> Self {
        Self {
            experience: CameraExperience::select(&config.recognizers),
            hide_loading_and_error_ui: config.hide_loading_and_error_ui,
            show_modal_windows: config.show_modal_windows,
            recognizer_name: config.primary_recognizer_name().to_string(),
            translations: config.translations.clone(),
        }
    }
}

/// State of the attempt in flight.
#[derive(Debug, Clone)]
struct Attempt {
    source: ScanSource,
    last_status: Option<RecognitionStatus>,
}

/// State machine for one configured session.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    options: SessionOptions,
    ui_state: UiState,
    error_origin: Option<ErrorOrigin>,
    engine_ready: bool,
    bootstrap_error: bool,
    attempt: Option<Attempt>,
    last_status: Option<RecognitionStatus>,
    timeline: ExperienceTimeline,
}

impl SessionStateMachine {
    /// Create a machine in [`UiState::Loading`].
    #[must_use]
    pub fn new(options: SessionOptions) -> Self {
        Self {
            options,
            ui_state: UiState::Loading,
            error_origin: None,
            engine_ready: false,
            bootstrap_error: false,
            attempt: None,
            last_status: None,
            timeline: ExperienceTimeline::new(),
        }
    }

    /// Current UI state.
    #[must_use]
    pub const fn ui_state(&self) -> UiState {
        self.ui_state
    }

    /// Why the machine is in [`UiState::Error`], if it is.
    #[must_use]
    pub const fn error_origin(&self) -> Option<ErrorOrigin> {
        self.error_origin
    }

    /// Whether the engine reported ready.
    #[must_use]
    pub const fn is_engine_ready(&self) -> bool {
        self.engine_ready
    }

    /// Source of the attempt in flight.
    #[must_use]
    pub fn active_attempt(&self) -> Option<ScanSource> {
        self.attempt.as_ref().map(|attempt| attempt.source)
    }

    /// Last status handled, kept after the attempt ends.
    #[must_use]
    pub const fn recognition_status(&self) -> Option<&RecognitionStatus> {
        self.last_status.as_ref()
    }

    /// Overlay state currently shown.
    #[must_use]
    pub const fn experience_state(&self) -> CameraExperienceState {
        self.timeline.current()
    }

    /// Whether an overlay state waits for its turn.
    #[must_use]
    pub const fn has_pending_experience(&self) -> bool {
        self.timeline.has_pending()
    }

    /// Options the machine was built with.
    #[must_use]
    pub const fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// What a rendering host should show.
    #[must_use]
    pub const fn presentation(&self) -> Presentation {
        let hide = self.options.hide_loading_and_error_ui;
        match self.ui_state {
            UiState::None => Presentation::Idle,
            UiState::Success => Presentation::Success,
            UiState::Loading if hide => Presentation::Hidden,
            UiState::Loading => Presentation::Loading,
            UiState::Error => match self.error_origin {
                Some(ErrorOrigin::External) if self.options.show_modal_windows => {
                    Presentation::ModalError
                }
                Some(ErrorOrigin::External) => Presentation::Hidden,
                Some(ErrorOrigin::Bootstrap) | None if hide => Presentation::Hidden,
                _ if self.options.show_modal_windows => Presentation::ModalError,
                _ => Presentation::InlineError,
            },
        }
    }

    /// Engine finished loading.
    ///
    /// Ignored after a bootstrap failure: the session stays failed until it
    /// is rebuilt.
    pub fn engine_ready(&mut self, handle: EngineHandle) -> Vec<Effect> {
        if self.bootstrap_error {
            tracing::debug!("Engine ready after bootstrap failure ignored");
            return Vec::new();
        }
        if self.engine_ready {
            tracing::trace!("Duplicate engine ready ignored");
            return Vec::new();
        }
        self.engine_ready = true;
        self.enter(UiState::None, None);
        vec![Effect::Transition(Transition::Ready(handle))]
    }

    /// Configuration or engine bootstrap failed.
    pub fn bootstrap_failed(&mut self, error: EngineError) -> Vec<Effect> {
        if self.bootstrap_error {
            tracing::trace!(code = %error.code, "Repeated bootstrap failure ignored");
            return Vec::new();
        }
        self.bootstrap_error = true;
        tracing::warn!(code = %error.code, message = %error.message, "Engine bootstrap failed");
        self.engine_ready = false;
        self.clear_attempt();
        self.enter(UiState::Error, Some(ErrorOrigin::Bootstrap));
        vec![Effect::Transition(Transition::BootstrapFailed(error))]
    }

    /// Begin a scan attempt, superseding any attempt in flight.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::EngineNotReady`] before the engine reported ready.
    pub fn start_attempt(&mut self, source: ScanSource) -> ScanResult<Vec<Effect>> {
        if !self.engine_ready {
            return Err(HostError::EngineNotReady);
        }
        self.clear_attempt();
        self.last_status = None;
        self.attempt = Some(Attempt {
            source,
            last_status: None,
        });
        self.enter(UiState::None, None);
        Ok(vec![Effect::Transition(Transition::AttemptStarted(source))])
    }

    /// Drop the attempt in flight without emitting anything.
    ///
    /// Returns whether an attempt was active.
    pub fn cancel_attempt(&mut self) -> bool {
        let active = self.attempt.is_some();
        if active {
            tracing::debug!("Scan attempt cancelled");
        }
        self.clear_attempt();
        active
    }

    /// Handle a recognition status for the attempt in flight.
    pub fn process(&mut self, status: RecognitionStatus, now_ms: u64) -> Vec<Effect> {
        let Some(attempt) = self.attempt.as_mut() else {
            tracing::trace!(status = status.name(), "Status without active attempt dropped");
            return Vec::new();
        };
        if attempt.last_status.as_ref() == Some(&status) {
            tracing::trace!(status = status.name(), "Duplicate status dropped");
            return Vec::new();
        }
        attempt.last_status = Some(status.clone());
        let source = attempt.source;
        self.last_status = Some(status.clone());
        tracing::debug!(status = status.name(), %source, "Recognition status");

        let mut effects = Vec::new();
        if source == ScanSource::Camera {
            if let Some(next) = self.options.experience.state_for(&status) {
                let shown = if matches!(status, RecognitionStatus::ScanSuccessful(_)) {
                    self.timeline.force(next, now_ms)
                } else {
                    self.timeline.request(next, now_ms)
                };
                effects.extend(shown.map(Effect::Experience));
            }
        }

        match status {
            RecognitionStatus::ScanSuccessful(mut results) => {
                results.image_capture |= source == ScanSource::Image;
                self.attempt = None;
                self.enter(UiState::Success, None);
                effects.push(Effect::Transition(Transition::AttemptSucceeded(results)));
            }
            RecognitionStatus::EmptyResult { recognizer_name } => {
                let name = if recognizer_name.is_empty() {
                    self.options.recognizer_name.clone()
                } else {
                    recognizer_name
                };
                self.fail_softly(
                    &mut effects,
                    ErrorCode::EmptyResult,
                    name,
                    FeedbackCode::ScanUnsuccessful,
                    translations::SCAN_UNSUCCESSFUL,
                );
            }
            RecognitionStatus::NoImageFileFound => {
                let name = self.options.recognizer_name.clone();
                self.fail_softly(
                    &mut effects,
                    ErrorCode::NoImageFileFound,
                    name,
                    FeedbackCode::ScanUnsuccessful,
                    translations::NO_IMAGE_FILE,
                );
            }
            RecognitionStatus::UnknownError => {
                let name = self.options.recognizer_name.clone();
                self.fail_softly(
                    &mut effects,
                    ErrorCode::GenericScanError,
                    name,
                    FeedbackCode::GenericScanError,
                    translations::GENERIC_SCAN_ERROR,
                );
            }
            RecognitionStatus::CameraNotFound | RecognitionStatus::CameraUnavailable => {
                effects.push(Effect::Feedback(self.feedback(
                    FeedbackCode::CameraDisabled,
                    translations::CAMERA_DISABLED,
                )));
            }
            RecognitionStatus::DetectionFailed if source == ScanSource::Image => {
                effects.push(Effect::Feedback(self.feedback(
                    FeedbackCode::ScanUnsuccessful,
                    translations::SCAN_UNSUCCESSFUL,
                )));
            }
            ref terminal if terminal.is_terminal_camera_error() => {
                let (code, feedback_code, key) = match terminal {
                    RecognitionStatus::CameraNotAllowed => (
                        ErrorCode::CameraNotAllowed,
                        FeedbackCode::CameraNotAllowed,
                        translations::CAMERA_NOT_ALLOWED,
                    ),
                    RecognitionStatus::CameraInUse => (
                        ErrorCode::CameraInUse,
                        FeedbackCode::CameraInUse,
                        translations::CAMERA_IN_USE,
                    ),
                    _ => (
                        ErrorCode::CameraGenericError,
                        FeedbackCode::CameraGenericError,
                        translations::CAMERA_GENERIC_ERROR,
                    ),
                };
                let message = self.options.translations.get(key).to_string();
                self.clear_attempt();
                self.enter(UiState::Error, Some(ErrorOrigin::Attempt));
                effects.push(Effect::Feedback(FeedbackMessage::error(
                    feedback_code,
                    message.clone(),
                )));
                effects.push(Effect::Transition(Transition::AttemptFailed {
                    code,
                    fatal: true,
                    message,
                    recognizer_name: self.options.recognizer_name.clone(),
                }));
            }
            _ => {}
        }
        effects
    }

    /// Promote a coalesced overlay state whose predecessor expired.
    pub fn tick(&mut self, now_ms: u64) -> Vec<Effect> {
        self.timeline
            .tick(now_ms)
            .map(Effect::Experience)
            .into_iter()
            .collect()
    }

    /// Host override of the UI state. Recognition and overlay state are kept.
    pub fn set_ui_state(&mut self, state: UiState) {
        let origin = (state == UiState::Error).then_some(ErrorOrigin::External);
        self.enter(state, origin);
    }

    fn fail_softly(
        &mut self,
        effects: &mut Vec<Effect>,
        code: ErrorCode,
        recognizer_name: String,
        feedback_code: FeedbackCode,
        key: &str,
    ) {
        let feedback = self.feedback(feedback_code, key);
        self.attempt = None;
        self.timeline.reset();
        self.enter(UiState::None, None);
        effects.push(Effect::Transition(Transition::AttemptFailed {
            code,
            fatal: false,
            message: feedback.message.clone(),
            recognizer_name,
        }));
        effects.push(Effect::Feedback(feedback));
    }

    fn feedback(&self, code: FeedbackCode, key: &str) -> FeedbackMessage {
        FeedbackMessage::error(code, self.options.translations.get(key))
    }

    fn clear_attempt(&mut self) {
        self.attempt = None;
        self.timeline.reset();
    }

    fn enter(&mut self, state: UiState, origin: Option<ErrorOrigin>) {
        if self.ui_state != state {
            tracing::debug!(from = ?self.ui_state, to = ?state, "UI state transition");
        }
        self.ui_state = state;
        self.error_origin = origin;
    }
}
