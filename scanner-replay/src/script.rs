//! Replay script format.
//!
//! ```json
//! {
//!   "attributes": {"license-key": "X", "recognizers": "BlinkCardRecognizer"},
//!   "steps": [
//!     {"atMs": 0, "action": "ready"},
//!     {"atMs": 10, "action": "startCameraScan"},
//!     {"atMs": 50, "action": "status", "value": {"status": "Processing"}},
//!     {"atMs": 900, "action": "status", "value": {"status": "ScanSuccessful",
//!       "data": {"recognizer": {}, "recognizerName": "BlinkCardRecognizer"}}}
//!   ]
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use scanner_core::{
    EngineError, EngineHandle, FeedbackCode, FeedbackState, RawAttributes, RecognitionStatus, TypedProperties,
    UiState, WasmBuildType,
};
use serde::{Deserialize, Serialize};

/// A scripted session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayScript {
    /// String attributes for the initial configuration.
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    /// Typed properties for the initial configuration.
    #[serde(default)]
    pub properties: TypedProperties,
    /// Handle reported by `ready` steps.
    #[serde(default = "default_handle")]
    pub engine: EngineHandle,
    /// Steps in time order.
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl ReplayScript {
    /// Read a script from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse script {}", path.display()))
    }

    /// Initial attributes as a [`RawAttributes`] set.
    #[must_use]
    pub fn raw_attributes(&self) -> RawAttributes {
        self.attributes.iter().collect()
    }
}

fn default_handle() -> EngineHandle {
    EngineHandle {
        name: "BlinkCard".to_string(),
        version: "replay".to_string(),
        wasm_build: WasmBuildType::Auto,
    }
}

/// One scripted step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// Time the step happens at.
    #[serde(default)]
    pub at_ms: u64,
    /// What happens.
    #[serde(flatten)]
    pub action: Action,
}

/// File offered to an image scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSpec {
    /// File name.
    pub name: String,
    /// MIME type.
    pub media_type: String,
}

/// Scripted action, either an engine callback or a host call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Action {
    /// Engine reports ready.
    Ready,
    /// Engine reports a load failure.
    LoadFailed {
        /// Failure reported.
        error: EngineError,
    },
    /// Engine reports a recognition status for the current attempt.
    Status {
        /// Status reported.
        value: RecognitionStatus,
    },
    /// Host starts a camera scan.
    StartCameraScan,
    /// Host starts an image scan.
    StartImageScan {
        /// Files offered.
        #[serde(default)]
        files: Vec<FileSpec>,
    },
    /// Host stops the current scan.
    StopScan,
    /// Host frame loop tick.
    Tick,
    /// Host forces the UI state.
    SetUiState {
        /// New state.
        state: UiState,
    },
    /// Host shows a message.
    SetUiMessage {
        /// Severity.
        state: FeedbackState,
        /// Text.
        message: String,
        /// Reason code, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<FeedbackCode>,
    },
    /// Host applies new configuration.
    Reconfigure {
        /// String attributes.
        #[serde(default)]
        attributes: HashMap<String, String>,
        /// Typed properties.
        #[serde(default)]
        properties: TypedProperties,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanner_core::DetectionStatus;

    #[test]
    fn test_parse_steps() {
        let script: ReplayScript = serde_json::from_str(
            r#"{
                "attributes": {"license-key": "X", "recognizers": "BlinkCardRecognizer"},
                "steps": [
                    {"atMs": 0, "action": "ready"},
                    {"atMs": 5, "action": "startImageScan", "files": [{"name": "a.png", "mediaType": "image/png"}]},
                    {"atMs": 9, "action": "status", "value": {"status": "DetectionStatusChange", "data": "Partial"}},
                    {"atMs": 12, "action": "setUiMessage", "state": "FEEDBACK_INFO", "message": "hi"},
                    {"action": "setUiState", "state": "ERROR"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(script.engine.version, "replay");
        assert_eq!(script.raw_attributes().get("licenseKey"), Some("X"));
        assert_eq!(script.steps.len(), 5);
        assert_eq!(script.steps[0].action, Action::Ready);
        assert_eq!(
            script.steps[2].action,
            Action::Status {
                value: RecognitionStatus::DetectionStatusChange(DetectionStatus::Partial)
            }
        );
        assert_eq!(script.steps[4].at_ms, 0);
        assert_eq!(
            script.steps[4].action,
            Action::SetUiState {
                state: UiState::Error
            }
        );
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = ReplayScript::load(&path).unwrap_err();
        assert!(err.to_string().contains("broken.json"));

        let good = dir.path().join("empty.json");
        std::fs::write(&good, "{}").unwrap();
        assert_eq!(ReplayScript::load(&good).unwrap().steps.len(), 0);
    }
}
