//! Outbound events for host listeners.
//!
//! Events are the durable programmatic contract. They are derived from state
//! machine [`Transition`]s by a pure mapping and are never suppressed by UI
//! gating flags.

use serde::{Deserialize, Serialize};

use crate::engine::{EngineHandle, ScanSource};
use crate::error::ErrorCode;
use crate::state::Transition;

/// Payload of `fatalError`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FatalErrorEvent {
    /// Public error code.
    pub code: ErrorCode,
    /// Human readable description.
    pub message: String,
    /// Engine specific details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Payload of `ready`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyEvent {
    /// Loaded engine.
    pub sdk_handle: EngineHandle,
}

/// Payload of `scanError`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanErrorEvent {
    /// Public error code.
    pub code: ErrorCode,
    /// Whether the attempt left the session in the error state.
    pub fatal: bool,
    /// Human readable description.
    pub message: String,
    /// Recognizer the attempt ran with.
    pub recognizer_name: String,
}

/// Payload of `scanSuccess`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSuccessEvent {
    /// Engine result object.
    pub recognizer: serde_json::Value,
    /// Recognizer that produced the result.
    pub recognizer_name: String,
    /// Frame captured at success, only with `includeSuccessFrame`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_frame: Option<serde_json::Value>,
    /// Result was read from an image file rather than the camera.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub image_capture: bool,
}

/// Notification published to event listeners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail", rename_all = "camelCase")]
pub enum OutboundEvent {
    /// Configuration or engine bootstrap failed.
    FatalError(FatalErrorEvent),
    /// Engine loaded, scanning may start.
    Ready(ReadyEvent),
    /// Scan attempt ended without result.
    ScanError(ScanErrorEvent),
    /// Scan attempt produced a result.
    ScanSuccess(ScanSuccessEvent),
    /// Camera scan attempt started.
    CameraScanStarted {},
    /// Image scan attempt started.
    ImageScanStarted {},
}

impl OutboundEvent {
    /// Build the event for a transition.
    ///
    /// The success frame is dropped unless `include_success_frame` is set.
    #[must_use]
    pub fn from_transition(transition: Transition, include_success_frame: bool) -> Self {
        match transition {
            Transition::Ready(sdk_handle) => Self::Ready(ReadyEvent { sdk_handle }),
            Transition::BootstrapFailed(error) => Self::FatalError(FatalErrorEvent {
                code: error.code,
                message: error.message,
                details: error.details,
            }),
            Transition::AttemptStarted(ScanSource::Camera) => Self::CameraScanStarted {},
            Transition::AttemptStarted(ScanSource::Image) => Self::ImageScanStarted {},
            Transition::AttemptSucceeded(results) => Self::ScanSuccess(ScanSuccessEvent {
                recognizer: results.recognizer,
                recognizer_name: results.recognizer_name,
                success_frame: results.success_frame.filter(|_| include_success_frame),
                image_capture: results.image_capture,
            }),
            Transition::AttemptFailed {
                code,
                fatal,
                message,
                recognizer_name,
            } => Self::ScanError(ScanErrorEvent {
                code,
                fatal,
                message,
                recognizer_name,
            }),
        }
    }

    /// DOM event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::FatalError(_) => "fatalError",
            Self::Ready(_) => "ready",
            Self::ScanError(_) => "scanError",
            Self::ScanSuccess(_) => "scanSuccess",
            Self::CameraScanStarted {} => "cameraScanStarted",
            Self::ImageScanStarted {} => "imageScanStarted",
        }
    }
}
