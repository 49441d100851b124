//! Engine facade seam.
//!
//! The recognition engine is an external collaborator. The host calls into it
//! through [`ScanEngine`] and the engine answers asynchronously by posting
//! [`EngineMessage`]s to the [`EngineInbox`] it was handed. Every inbox is
//! stamped with the [`SessionToken`] of the session/attempt it belongs to, so
//! callbacks from a superseded session are recognized and dropped.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::config::{SessionConfig, WasmBuildType};
use crate::error::EngineError;
use crate::recognizer::RecognizerId;
use crate::status::RecognitionStatus;

/// Where a scan attempt reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanSource {
    /// Live camera feed.
    Camera,
    /// Image files (picker or drag and drop).
    Image,
}

impl fmt::Display for ScanSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Camera => f.write_str("camera"),
            Self::Image => f.write_str("image"),
        }
    }
}

/// Identity of the session and attempt a message belongs to.
///
/// `generation` increments on every (re)configuration; `attempt` increments
/// on every scan start within the host and is `0` for bootstrap messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionToken {
    /// Configuration generation.
    pub generation: u64,
    /// Scan attempt, `0` for engine lifecycle.
    pub attempt: u64,
}

impl SessionToken {
    /// Token for engine lifecycle messages of a generation.
    #[must_use]
    pub const fn bootstrap(generation: u64) -> Self {
        Self {
            generation,
            attempt: 0,
        }
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.generation, self.attempt)
    }
}

/// Handle describing a loaded engine, published in the `ready` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineHandle {
    /// Engine product name.
    pub name: String,
    /// Engine version.
    pub version: String,
    /// Build flavour that was actually loaded.
    pub wasm_build: WasmBuildType,
}

/// Callback from the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum EngineMessage {
    /// Engine loaded and license accepted.
    Ready(EngineHandle),
    /// Engine failed to load.
    LoadFailed(EngineError),
    /// Recognition progress for the current attempt.
    Status(RecognitionStatus),
}

/// A message together with the token of the inbox it was posted to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Session/attempt identity.
    pub token: SessionToken,
    /// Payload.
    pub message: EngineMessage,
}

/// Token-stamped sender handed to the engine for one session or attempt.
#[derive(Debug, Clone)]
pub struct EngineInbox {
    token: SessionToken,
    tx: mpsc::UnboundedSender<Envelope>,
}

impl EngineInbox {
    pub(crate) fn new(token: SessionToken, tx: mpsc::UnboundedSender<Envelope>) -> Self {
        Self { token, tx }
    }

    /// Token stamped on every message sent through this inbox.
    #[must_use]
    pub const fn token(&self) -> SessionToken {
        self.token
    }

    /// Post a message. Returns `false` when the host is gone.
    pub fn send(&self, message: EngineMessage) -> bool {
        self.tx
            .send(Envelope {
                token: self.token,
                message,
            })
            .is_ok()
    }

    /// Post a recognition status.
    pub fn status(&self, status: RecognitionStatus) -> bool {
        self.send(EngineMessage::Status(status))
    }
}

/// Settings for loading the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSettings {
    /// License key.
    pub license_key: String,
    /// Resource location, empty for the page origin.
    pub engine_location: String,
    /// Requested build flavour.
    pub wasm_build: WasmBuildType,
    /// Whether the engine may log its hello message.
    pub allow_hello_message: bool,
}

impl From<&SessionConfig> for EngineSettings {
    fn from(config: &SessionConfig) -> Self {
        Self {
            license_key: config.license_key.clone(),
            engine_location: config.engine_location.clone(),
            wasm_build: config.wasm_build,
            allow_hello_message: config.allow_hello_message,
        }
    }
}

/// Camera recognition request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecognitionRequest {
    /// Recognizers to run.
    pub recognizers: Vec<RecognizerId>,
    /// Option bags per recognizer.
    pub recognizer_options: BTreeMap<RecognizerId, serde_json::Value>,
    /// Capture the success frame.
    pub success_frame: bool,
    /// Preferred camera device.
    pub camera_id: Option<String>,
}

impl From<&SessionConfig> for VideoRecognitionRequest {
    fn from(config: &SessionConfig) -> Self {
        Self {
            recognizers: config.recognizers.clone(),
            recognizer_options: config.recognizer_options.clone(),
            success_frame: config.include_success_frame,
            camera_id: config.camera_id.clone(),
        }
    }
}

/// A file offered for image recognition.
///
/// Serialized with the contents base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageFile {
    /// File name.
    pub name: String,
    /// MIME type as reported by the browser.
    pub media_type: String,
    /// File contents.
    #[serde(serialize_with = "serialize_base64")]
    pub data: Vec<u8>,
}

fn serialize_base64<S: serde::Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    use base64::Engine as _;
    serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(data))
}

impl ImageFile {
    /// Create a file entry.
    #[must_use]
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            data,
        }
    }

    /// Whether the MIME type denotes an image.
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }
}

/// Image recognition request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecognitionRequest {
    /// Recognizers to run.
    pub recognizers: Vec<RecognizerId>,
    /// Option bags per recognizer.
    pub recognizer_options: BTreeMap<RecognizerId, serde_json::Value>,
    /// Candidate files; the engine picks the first image.
    pub files: Vec<ImageFile>,
}

impl ImageRecognitionRequest {
    /// Build a request for the given files.
    #[must_use]
    pub fn new(config: &SessionConfig, files: Vec<ImageFile>) -> Self {
        Self {
            recognizers: config.recognizers.clone(),
            recognizer_options: config.recognizer_options.clone(),
            files,
        }
    }
}

/// Command for an engine living outside the process (e.g. in the page).
///
/// Commands that start work carry the token the engine must echo back in
/// every [`Envelope`] it reports for that work.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum EngineCommand<'a> {
    /// Load the engine.
    Load {
        /// Token for `ready` / `loadFailed`.
        token: SessionToken,
        /// Load settings.
        settings: &'a EngineSettings,
    },
    /// Start a camera attempt.
    StartCameraScan {
        /// Token for the attempt's statuses.
        token: SessionToken,
        /// Request.
        request: &'a VideoRecognitionRequest,
    },
    /// Start an image attempt.
    StartImageScan {
        /// Token for the attempt's statuses.
        token: SessionToken,
        /// Request.
        request: &'a ImageRecognitionRequest,
    },
    /// Stop the current attempt.
    StopScan,
    /// Tear the engine down.
    Unload,
}

/// The scanning engine as seen by the host.
///
/// Calls must not block; results are delivered later through the inbox.
/// Implementations must not call back into the host synchronously.
pub trait ScanEngine {
    /// Start loading the engine.
    ///
    /// # Errors
    ///
    /// Returns an error when loading fails before it could even start
    /// (e.g. unsupported environment). Later failures are posted as
    /// [`EngineMessage::LoadFailed`].
    fn load(&mut self, settings: &EngineSettings, inbox: EngineInbox) -> Result<(), EngineError>;

    /// Begin recognition from camera.
    fn start_camera_scan(&mut self, request: &VideoRecognitionRequest, inbox: EngineInbox);

    /// Begin recognition from image files.
    fn start_image_scan(&mut self, request: &ImageRecognitionRequest, inbox: EngineInbox);

    /// Stop the current scan attempt (release camera, abort processing).
    fn stop_scan(&mut self);

    /// Tear down the loaded engine.
    fn unload(&mut self);
}

impl<E: ScanEngine + ?Sized> ScanEngine for Box<E> {
    fn load(&mut self, settings: &EngineSettings, inbox: EngineInbox) -> Result<(), EngineError> {
        (**self).load(settings, inbox)
    }

    fn start_camera_scan(&mut self, request: &VideoRecognitionRequest, inbox: EngineInbox) {
        (**self).start_camera_scan(request, inbox);
    }

    fn start_image_scan(&mut self, request: &ImageRecognitionRequest, inbox: EngineInbox) {
        (**self).start_image_scan(request, inbox);
    }

    fn stop_scan(&mut self) {
        (**self).stop_scan();
    }

    fn unload(&mut self) {
        (**self).unload();
    }
}
