//! Error types for scan session operations.
//!
//! [`ErrorCode`] is the closed, public set of codes carried by `fatalError`
//! and `scanError` events. Every internal error maps onto exactly one code.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::ScanSource;

/// Result type for host operations.
pub type ScanResult<T> = Result<T, HostError>;

/// Public error codes reported to event listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The browser lacks a required capability (e.g. WebAssembly).
    BrowserNotSupported,
    /// Recognition finished without a usable result.
    EmptyResult,
    /// The recognizer list is empty, unknown, or an invalid combination.
    InvalidRecognizers,
    /// Recognizer options are malformed or target an unused recognizer.
    InvalidRecognizerOptions,
    /// No license key was supplied.
    MissingLicenseKey,
    /// The selected files contain no image.
    NoImageFileFound,
    /// Engine resources could not be loaded.
    SdkLoadFailed,
    /// Any other scanning failure.
    GenericScanError,
    /// Camera permission was denied.
    CameraNotAllowed,
    /// Camera is held by another application.
    CameraInUse,
    /// Camera failed for another reason.
    CameraGenericError,
    /// The license check needs network access which is unavailable.
    InternetNotAvailable,
    /// The license key was rejected.
    LicenseError,
}

impl ErrorCode {
    /// Wire representation of the code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BrowserNotSupported => "BROWSER_NOT_SUPPORTED",
            Self::EmptyResult => "EMPTY_RESULT",
            Self::InvalidRecognizers => "INVALID_RECOGNIZERS",
            Self::InvalidRecognizerOptions => "INVALID_RECOGNIZER_OPTIONS",
            Self::MissingLicenseKey => "MISSING_LICENSE_KEY",
            Self::NoImageFileFound => "NO_IMAGE_FILE_FOUND",
            Self::SdkLoadFailed => "SDK_LOAD_FAILED",
            Self::GenericScanError => "GENERIC_SCAN_ERROR",
            Self::CameraNotAllowed => "CAMERA_NOT_ALLOWED",
            Self::CameraInUse => "CAMERA_IN_USE",
            Self::CameraGenericError => "CAMERA_GENERIC_ERROR",
            Self::InternetNotAvailable => "INTERNET_NOT_AVAILABLE",
            Self::LicenseError => "LICENSE_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while resolving configuration.
///
/// These are always detected before the engine is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Recognizer list is empty, contains unknown or duplicate identifiers,
    /// or mixes the combined recognizer with others.
    #[error("Invalid recognizers: {0}")]
    InvalidRecognizers(String),

    /// Recognizer options are not an object or target a recognizer that is
    /// not part of the resolved list.
    #[error("Invalid recognizer options: {0}")]
    InvalidRecognizerOptions(String),

    /// License key is absent or blank.
    #[error("Missing license key")]
    MissingLicenseKey,

    /// The raw translations attribute is not a flat JSON string map.
    #[error("Malformed translations: {0}")]
    Translations(#[from] serde_json::Error),

    /// Engine location is neither empty nor an absolute URL.
    #[error("Invalid engine location '{location}': {source}")]
    InvalidEngineLocation {
        /// The rejected value.
        location: String,
        /// Parser failure.
        #[source]
        source: url::ParseError,
    },
}

impl ConfigError {
    /// Public code reported in the `fatalError` event.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidRecognizers(_) => ErrorCode::InvalidRecognizers,
            Self::InvalidRecognizerOptions(_) => ErrorCode::InvalidRecognizerOptions,
            Self::MissingLicenseKey => ErrorCode::MissingLicenseKey,
            Self::Translations(_) | Self::InvalidEngineLocation { .. } => ErrorCode::SdkLoadFailed,
        }
    }
}

/// Engine bootstrap failure as reported by the engine facade.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct EngineError {
    /// Public error code.
    pub code: ErrorCode,
    /// Human readable description.
    pub message: String,
    /// Optional engine specific details, forwarded verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl EngineError {
    /// Create an engine error without details.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Attach engine specific details.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl From<&ConfigError> for EngineError {
    fn from(error: &ConfigError) -> Self {
        Self::new(error.code(), error.to_string())
    }
}

/// Errors returned by [`crate::ScanHost`] operations.
#[derive(Debug, Error)]
pub enum HostError {
    /// No valid configuration has been applied yet.
    #[error("No valid configuration applied")]
    NotConfigured,

    /// The engine has not reported ready (or failed to load).
    #[error("Engine is not ready")]
    EngineNotReady,

    /// The requested scan source is disabled by configuration.
    #[error("Scan from {0} is disabled")]
    SourceDisabled(ScanSource),

    /// Configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
