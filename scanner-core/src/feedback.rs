//! User feedback channel.
//!
//! Feedback is advisory UI text. It is published independently of the event
//! stream: `hide_feedback` suppresses the display sink, while observers of
//! the programmatic `feedback` event are always notified.

use serde::{Deserialize, Serialize};

/// Machine readable reason attached to a feedback message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedbackCode {
    /// No usable camera.
    CameraDisabled,
    /// Camera failed.
    CameraGenericError,
    /// Camera held by another application.
    CameraInUse,
    /// Camera permission denied.
    CameraNotAllowed,
    /// Unexpected scanning failure.
    GenericScanError,
    /// Scan finished without result.
    ScanUnsuccessful,
    /// Scan finished with result.
    ScanSuccessful,
}

impl FeedbackCode {
    /// Parse the wire form (`SCAN_SUCCESSFUL`, `CAMERA_IN_USE`, ...).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        serde_json::from_value(serde_json::Value::String(value.to_string())).ok()
    }
}

/// Severity of a feedback message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeedbackState {
    /// Error styling.
    #[serde(rename = "FEEDBACK_ERROR")]
    Error,
    /// Neutral styling.
    #[serde(rename = "FEEDBACK_INFO")]
    Info,
    /// Success styling.
    #[serde(rename = "FEEDBACK_OK")]
    Ok,
}

impl FeedbackState {
    /// Parse the wire form (`FEEDBACK_ERROR`, `FEEDBACK_INFO`, `FEEDBACK_OK`).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "FEEDBACK_ERROR" => Some(Self::Error),
            "FEEDBACK_INFO" => Some(Self::Info),
            "FEEDBACK_OK" => Some(Self::Ok),
            _ => None,
        }
    }
}

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackMessage {
    /// Reason, when the message stems from a known condition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<FeedbackCode>,
    /// Severity.
    pub state: FeedbackState,
    /// Display text.
    pub message: String,
}

impl FeedbackMessage {
    /// Create an error message with a code.
    #[must_use]
    pub fn error(code: FeedbackCode, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            state: FeedbackState::Error,
            message: message.into(),
        }
    }

    /// Create a message without a code.
    #[must_use]
    pub fn plain(state: FeedbackState, message: impl Into<String>) -> Self {
        Self {
            code: None,
            state,
            message: message.into(),
        }
    }

    /// Attach a code.
    #[must_use]
    pub fn with_code(mut self, code: FeedbackCode) -> Self {
        self.code = Some(code);
        self
    }
}

/// Display target for feedback (toast, banner, console).
pub trait FeedbackSink {
    /// Show a message, replacing whatever was shown before.
    fn show(&mut self, message: &FeedbackMessage);
}

impl<F: FnMut(&FeedbackMessage)> FeedbackSink for F {
    fn show(&mut self, message: &FeedbackMessage) {
        self(message);
    }
}

type Observer = Box<dyn FnMut(&FeedbackMessage)>;

/// Fire-and-forget publisher for feedback messages.
#[derive(Default)]
pub struct FeedbackChannel {
    sink: Option<Box<dyn FeedbackSink>>,
    observers: Vec<Observer>,
    hidden: bool,
}

impl FeedbackChannel {
    /// Create a channel with no sink and no observers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the display sink.
    pub fn set_sink(&mut self, sink: impl FeedbackSink + 'static) {
        self.sink = Some(Box::new(sink));
    }

    /// Register an observer of the programmatic `feedback` event.
    pub fn subscribe(&mut self, observer: impl FnMut(&FeedbackMessage) + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Suppress or restore the display sink.
    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    /// Whether display is suppressed.
    #[must_use]
    pub const fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Publish a message.
    pub fn publish(&mut self, message: &FeedbackMessage) {
        for observer in &mut self.observers {
            observer(message);
        }
        if self.hidden {
            tracing::trace!(state = ?message.state, "Feedback display hidden");
            return;
        }
        if let Some(sink) = self.sink.as_mut() {
            sink.show(message);
        }
    }
}

impl std::fmt::Debug for FeedbackChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedbackChannel")
            .field("has_sink", &self.sink.is_some())
            .field("observers", &self.observers.len())
            .field("hidden", &self.hidden)
            .finish()
    }
}
