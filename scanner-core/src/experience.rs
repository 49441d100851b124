//! # Camera Experience
//!
//! Overlay guidance shown while scanning from camera.
//!
//! Detection statuses arrive once per frame and can flip back and forth
//! quickly. Each [`CameraExperienceState`] is therefore held on screen for a
//! minimum duration; newer states arriving within that window are queued and
//! coalesced so only the latest one is shown once the window closes:
//!
//! ```text
//! t=0     AdjustAngle shown (min 2500ms)
//! t=100   MoveCloser requested  -> queued
//! t=400   Detection requested   -> replaces queued MoveCloser
//! t=2500  tick                  -> Detection shown
//! ```

use serde::{Deserialize, Serialize};

use crate::recognizer::RecognizerId;
use crate::status::{DetectionStatus, RecognitionStatus};

/// Overlay flavour, chosen once per session from the recognizer set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CameraExperience {
    /// Barcode-only scanning.
    Barcode,
    /// Front then back with the combined recognizer.
    CardCombined,
    /// Single document side.
    CardSingleSide,
    /// Full payment card experience (both sides).
    #[serde(rename = "BLINKCARD")]
    BlinkCardFull,
}

impl CameraExperience {
    /// Select the experience for a recognizer list.
    #[must_use]
    pub fn select(recognizers: &[RecognizerId]) -> Self {
        if recognizers.iter().any(|id| id.is_combined()) {
            Self::CardCombined
        } else if recognizers.contains(&RecognizerId::BlinkCard) {
            Self::BlinkCardFull
        } else if !recognizers.is_empty()
            && recognizers.iter().all(|id| *id == RecognizerId::IdBarcode)
        {
            Self::Barcode
        } else {
            Self::CardSingleSide
        }
    }

    /// Whether the user has to flip the document mid-scan.
    #[must_use]
    pub const fn is_two_sided(self) -> bool {
        matches!(self, Self::CardCombined | Self::BlinkCardFull)
    }

    /// Overlay state a recognition status asks for, if any.
    #[must_use]
    pub fn state_for(self, status: &RecognitionStatus) -> Option<CameraExperienceState> {
        match status {
            RecognitionStatus::DetectionStatusChange(detection) => Some(match detection {
                DetectionStatus::Fail => CameraExperienceState::Default,
                DetectionStatus::Success | DetectionStatus::FallbackSuccess => {
                    CameraExperienceState::Detection
                }
                DetectionStatus::CameraAtAngle => CameraExperienceState::AdjustAngle,
                DetectionStatus::CameraTooHigh => CameraExperienceState::MoveCloser,
                DetectionStatus::CameraTooNear
                | DetectionStatus::DocumentTooCloseToEdge
                | DetectionStatus::Partial => CameraExperienceState::MoveFarther,
            }),
            RecognitionStatus::DetectionFailed => Some(CameraExperienceState::Default),
            RecognitionStatus::DocumentClassified => Some(CameraExperienceState::Classification),
            RecognitionStatus::FirstSideCaptured => Some(if self.is_two_sided() {
                CameraExperienceState::Flip
            } else {
                CameraExperienceState::Done
            }),
            RecognitionStatus::ScanSuccessful(_) => Some(if self.is_two_sided() {
                CameraExperienceState::DoneAll
            } else {
                CameraExperienceState::Done
            }),
            _ => None,
        }
    }
}

/// Overlay guidance state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CameraExperienceState {
    /// Idle reticle.
    Default,
    /// Document found.
    Detection,
    /// Ask the user to straighten the camera.
    AdjustAngle,
    /// Document type being identified.
    Classification,
    /// Ask the user to move closer.
    MoveCloser,
    /// Ask the user to move away.
    MoveFarther,
    /// Ask the user to flip the document.
    Flip,
    /// One side finished.
    Done,
    /// All sides finished.
    DoneAll,
}

impl CameraExperienceState {
    /// Minimum time the state stays visible, in milliseconds.
    #[must_use]
    pub const fn min_duration_ms(self) -> u64 {
        match self {
            Self::AdjustAngle | Self::MoveCloser | Self::MoveFarther => 2500,
            Self::Default => 500,
            Self::Done => 300,
            Self::DoneAll => 400,
            Self::Flip => 4000,
            Self::Detection | Self::Classification => 0,
        }
    }
}

/// Minimum-duration scheduler for overlay states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperienceTimeline {
    /// State currently shown.
    current: CameraExperienceState,
    /// When `current` was shown; `None` when nothing has been shown yet.
    shown_at_ms: Option<u64>,
    /// Latest state waiting for the current one to expire.
    queued: Option<CameraExperienceState>,
}

impl ExperienceTimeline {
    /// Create a timeline showing [`CameraExperienceState::Default`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            current: CameraExperienceState::Default,
            shown_at_ms: None,
            queued: None,
        }
    }

    /// State currently shown.
    #[must_use]
    pub const fn current(&self) -> CameraExperienceState {
        self.current
    }

    /// Whether a state is waiting for the current one to expire.
    #[must_use]
    pub const fn has_pending(&self) -> bool {
        self.queued.is_some()
    }

    /// When the queued state becomes eligible, if any.
    #[must_use]
    pub fn pending_deadline_ms(&self) -> Option<u64> {
        self.queued?;
        Some(self.expires_at_ms())
    }

    /// Request a state. Returns the state if it became visible immediately.
    pub fn request(&mut self, next: CameraExperienceState, now_ms: u64) -> Option<CameraExperienceState> {
        if next == self.current {
            // Latest wish equals what is shown: nothing left to supersede it.
            self.queued = None;
            return None;
        }
        if self.expired(now_ms) {
            Some(self.show(next, now_ms))
        } else {
            self.queued = Some(next);
            None
        }
    }

    /// Promote the queued state once the current one has expired.
    pub fn tick(&mut self, now_ms: u64) -> Option<CameraExperienceState> {
        let next = self.queued?;
        if self.expired(now_ms) {
            Some(self.show(next, now_ms))
        } else {
            None
        }
    }

    /// Show a state right away, bypassing the minimum duration.
    pub fn force(&mut self, next: CameraExperienceState, now_ms: u64) -> Option<CameraExperienceState> {
        self.queued = None;
        if next == self.current {
            return None;
        }
        Some(self.show(next, now_ms))
    }

    /// Drop any queued state and return to the idle reticle.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn expires_at_ms(&self) -> u64 {
        self.shown_at_ms
            .map_or(0, |at| at.saturating_add(self.current.min_duration_ms()))
    }

    fn expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at_ms()
    }

    fn show(&mut self, next: CameraExperienceState, now_ms: u64) -> CameraExperienceState {
        tracing::trace!(from = ?self.current, to = ?next, "Camera experience transition");
        self.current = next;
        self.shown_at_ms = Some(now_ms);
        self.queued = None;
        next
    }
}

impl Default for ExperienceTimeline {
    fn default() -> Self {
        Self::new()
    }
}
