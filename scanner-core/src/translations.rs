//! User-facing strings.
//!
//! The host UI owns the full string table; the session core only needs the
//! handful of feedback messages it publishes. Built-in English defaults are
//! used for any key the configuration does not override.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Feedback message when recognition yields no result.
pub const SCAN_UNSUCCESSFUL: &str = "feedback-scan-unsuccessful";
/// Feedback message for an unexpected scanning failure.
pub const GENERIC_SCAN_ERROR: &str = "feedback-error-generic";
/// Feedback message when the dropped/selected files contain no image.
pub const NO_IMAGE_FILE: &str = "feedback-no-image-file";
/// Feedback message when camera permission is denied.
pub const CAMERA_NOT_ALLOWED: &str = "feedback-camera-not-allowed";
/// Feedback message when the camera is busy.
pub const CAMERA_IN_USE: &str = "feedback-camera-in-use";
/// Feedback message when no usable camera exists.
pub const CAMERA_DISABLED: &str = "feedback-camera-disabled";
/// Feedback message for other camera failures.
pub const CAMERA_GENERIC_ERROR: &str = "feedback-camera-generic-error";

const DEFAULTS: &[(&str, &str)] = &[
    (
        SCAN_UNSUCCESSFUL,
        "We weren't able to recognize your card. Please try again.",
    ),
    (
        GENERIC_SCAN_ERROR,
        "There was a problem during scanning. Please try again.",
    ),
    (
        NO_IMAGE_FILE,
        "The selected file is not a supported image. Please choose another one.",
    ),
    (
        CAMERA_NOT_ALLOWED,
        "Camera access is blocked. Please allow it in your browser settings.",
    ),
    (
        CAMERA_IN_USE,
        "The camera is in use by another application.",
    ),
    (CAMERA_DISABLED, "No camera is available on this device."),
    (
        CAMERA_GENERIC_ERROR,
        "There was a problem accessing the camera.",
    ),
];

/// Translation table with built-in fallbacks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Translations {
    entries: HashMap<String, String>,
}

impl Translations {
    /// Create a table from user supplied entries.
    #[must_use]
    pub fn new(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }

    /// Look up a key, falling back to the built-in default, then to the key.
    #[must_use]
    pub fn get<'a>(&'a self, key: &'a str) -> &'a str {
        if let Some(value) = self.entries.get(key) {
            return value;
        }
        DEFAULTS
            .iter()
            .find(|(k, _)| *k == key)
            .map_or(key, |(_, v)| *v)
    }

    /// Entries supplied by configuration (without defaults).
    #[must_use]
    pub fn overrides(&self) -> &HashMap<String, String> {
        &self.entries
    }

    /// Whether no overrides were supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
