//! Recognition status reported by the engine.
//!
//! Statuses are internal: the state machine translates them into events and
//! feedback, they are never forwarded to listeners as-is.

use serde::{Deserialize, Serialize};

/// Per-frame document detection outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectionStatus {
    /// Nothing detected.
    Fail,
    /// Document detected.
    Success,
    /// Camera too far from the document.
    CameraTooHigh,
    /// Detected by the fallback detector.
    FallbackSuccess,
    /// Only part of the document is visible.
    Partial,
    /// Camera is tilted relative to the document.
    CameraAtAngle,
    /// Camera too close to the document.
    CameraTooNear,
    /// Document touches the frame edge.
    DocumentTooCloseToEdge,
}

/// Recognition output for a finished scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionResults {
    /// Engine result object, opaque to the core.
    pub recognizer: serde_json::Value,
    /// Name of the recognizer that produced the result.
    pub recognizer_name: String,
    /// Frame captured at the moment of success, if the engine grabbed one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_frame: Option<serde_json::Value>,
    /// Whether the result came from an image rather than the camera.
    #[serde(default)]
    pub image_capture: bool,
}

impl RecognitionResults {
    /// Create a result without success frame.
    #[must_use]
    pub fn new(recognizer_name: impl Into<String>, recognizer: serde_json::Value) -> Self {
        Self {
            recognizer,
            recognizer_name: recognizer_name.into(),
            success_frame: None,
            image_capture: false,
        }
    }

    /// Attach a success frame.
    #[must_use]
    pub fn with_success_frame(mut self, frame: serde_json::Value) -> Self {
        self.success_frame = Some(frame);
        self
    }
}

/// Status progression of one scan attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data")]
pub enum RecognitionStatus {
    /// None of the supplied files is an image.
    NoImageFileFound,
    /// Engine is preparing (camera warm-up, recognizer setup).
    Preparing,
    /// Engine is processing an image or frame.
    Processing,
    /// No document found in the frame/image.
    DetectionFailed,
    /// Recognition finished without data.
    EmptyResult {
        /// Recognizer that came up empty.
        #[serde(rename = "recognizerName")]
        recognizer_name: String,
    },
    /// First side of a two-sided document captured.
    FirstSideCaptured,
    /// Recognition finished successfully.
    ScanSuccessful(RecognitionResults),
    /// Document type identified.
    DocumentClassified,
    /// Camera API unavailable in this environment.
    NoCameraSupport,
    /// No camera device found.
    CameraNotFound,
    /// Permission to use the camera denied.
    CameraNotAllowed,
    /// Camera exists but could not be opened.
    CameraUnavailable,
    /// Camera held by another application.
    CameraInUse,
    /// Camera failed for another reason.
    CameraGenericError,
    /// Frame level detection changed.
    DetectionStatusChange(DetectionStatus),
    /// Unclassified engine failure.
    UnknownError,
}

impl RecognitionStatus {
    /// Short name for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::NoImageFileFound => "NoImageFileFound",
            Self::Preparing => "Preparing",
            Self::Processing => "Processing",
            Self::DetectionFailed => "DetectionFailed",
            Self::EmptyResult { .. } => "EmptyResult",
            Self::FirstSideCaptured => "FirstSideCaptured",
            Self::ScanSuccessful(_) => "ScanSuccessful",
            Self::DocumentClassified => "DocumentClassified",
            Self::NoCameraSupport => "NoCameraSupport",
            Self::CameraNotFound => "CameraNotFound",
            Self::CameraNotAllowed => "CameraNotAllowed",
            Self::CameraUnavailable => "CameraUnavailable",
            Self::CameraInUse => "CameraInUse",
            Self::CameraGenericError => "CameraGenericError",
            Self::DetectionStatusChange(_) => "DetectionStatusChange",
            Self::UnknownError => "UnknownError",
        }
    }

    /// Camera statuses that abort the attempt with a fatal `scanError`.
    #[must_use]
    pub const fn is_terminal_camera_error(&self) -> bool {
        matches!(
            self,
            Self::NoCameraSupport
                | Self::CameraNotAllowed
                | Self::CameraInUse
                | Self::CameraGenericError
        )
    }
}
