//! WebAssembly bindings for scanner-core.
//!
//! The browser side owns the real engine. The host talks to it through a
//! single JavaScript command callback receiving [`EngineCommand`]s as JSON.
//! Commands that start work carry a `token`; the page reports back by
//! calling [`WasmScanHost::deliver`] with an [`Envelope`] holding that token
//! and the [`EngineMessage`](crate::engine::EngineMessage). Reports for superseded sessions or attempts
//! are dropped by the host. The command callback must not call back into the
//! host synchronously.

use wasm_bindgen::prelude::*;

use crate::clock::Clock;
use crate::config::{RawAttributes, TypedProperties};
use crate::engine::{
    EngineCommand, EngineInbox, EngineSettings, Envelope, ImageFile, ImageRecognitionRequest,
    ScanEngine, VideoRecognitionRequest,
};
use crate::error::{EngineError, ErrorCode};
use crate::feedback::{FeedbackCode, FeedbackMessage, FeedbackState};
use crate::host::ScanHost;
use crate::state::UiState;

/// Initialize the scanner WASM module.
#[wasm_bindgen(start)]
pub fn init() {
    // Set up panic hook for better error messages
    console_error_panic_hook::set_once();
}

/// Browser clock.
#[derive(Debug, Clone, Copy, Default)]
struct JsClock;

impl Clock for JsClock {
    fn now_ms(&self) -> u64 {
        // Date.now() is a non-negative integral f64
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            js_sys::Date::now() as u64
        }
    }
}

/// Engine facade forwarding commands to JavaScript.
#[derive(Debug)]
struct JsEngine {
    command: js_sys::Function,
}

impl JsEngine {
    fn send(&self, command: &EngineCommand<'_>) -> Result<(), JsValue> {
        let json = serde_json::to_string(command).map_err(|e| JsValue::from_str(&e.to_string()))?;
        self.command
            .call1(&JsValue::NULL, &JsValue::from_str(&json))
            .map(|_| ())
    }

    fn send_logged(&self, command: &EngineCommand<'_>) {
        if let Err(error) = self.send(command) {
            tracing::warn!(?error, "Engine command callback failed");
        }
    }
}

impl ScanEngine for JsEngine {
    fn load(&mut self, settings: &EngineSettings, inbox: EngineInbox) -> Result<(), EngineError> {
        self.send(&EngineCommand::Load {
            token: inbox.token(),
            settings,
        })
        .map_err(|error| {
            EngineError::new(ErrorCode::SdkLoadFailed, "Engine command callback failed")
                .with_details(serde_json::Value::String(format!("{error:?}")))
        })
    }

    fn start_camera_scan(&mut self, request: &VideoRecognitionRequest, inbox: EngineInbox) {
        self.send_logged(&EngineCommand::StartCameraScan {
            token: inbox.token(),
            request,
        });
    }

    fn start_image_scan(&mut self, request: &ImageRecognitionRequest, inbox: EngineInbox) {
        self.send_logged(&EngineCommand::StartImageScan {
            token: inbox.token(),
            request,
        });
    }

    fn stop_scan(&mut self) {
        self.send_logged(&EngineCommand::StopScan);
    }

    fn unload(&mut self) {
        self.send_logged(&EngineCommand::Unload);
    }
}

fn call_json(callback: &js_sys::Function, value: &impl serde::Serialize) {
    match serde_json::to_string(value) {
        Ok(json) => {
            if let Err(error) = callback.call1(&JsValue::NULL, &JsValue::from_str(&json)) {
                tracing::warn!(?error, "Listener callback failed");
            }
        }
        Err(error) => tracing::warn!(%error, "Failed to serialize listener payload"),
    }
}

/// Scan host instance for WASM.
#[wasm_bindgen]
pub struct WasmScanHost {
    host: ScanHost<JsEngine>,
}

#[wasm_bindgen]
impl WasmScanHost {
    /// Create a host that sends engine commands to `command`.
    #[wasm_bindgen(constructor)]
    #[must_use]
    pub fn new(command: js_sys::Function) -> Self {
        let engine = JsEngine { command };
        Self {
            host: ScanHost::with_clock(engine, JsClock),
        }
    }

    /// Apply configuration from an attribute map and a property object,
    /// both as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error string if JSON parsing fails or the configuration is
    /// rejected. A rejected configuration also emits `fatalError`.
    pub fn configure(&mut self, attributes_json: &str, properties_json: &str) -> Result<(), JsValue> {
        let attributes: std::collections::HashMap<String, String> =
            serde_json::from_str(attributes_json).map_err(|e| JsValue::from_str(&e.to_string()))?;
        let properties: TypedProperties =
            serde_json::from_str(properties_json).map_err(|e| JsValue::from_str(&e.to_string()))?;
        let raw: RawAttributes = attributes.into_iter().collect();
        self.host
            .configure(&raw, &properties)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Deliver an engine report as `{token, message}` JSON.
    ///
    /// Returns `false` when the token belongs to a superseded session or
    /// attempt and the report was dropped.
    ///
    /// # Errors
    ///
    /// Returns an error string if JSON parsing fails.
    pub fn deliver(&mut self, envelope_json: &str) -> Result<bool, JsValue> {
        let envelope: Envelope =
            serde_json::from_str(envelope_json).map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(self.host.deliver(envelope))
    }

    /// Start scanning from camera.
    ///
    /// # Errors
    ///
    /// Returns an error string if scanning cannot start.
    #[wasm_bindgen(js_name = startCameraScan)]
    pub fn start_camera_scan(&mut self) -> Result<(), JsValue> {
        self.host
            .start_camera_scan()
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Start scanning a single file.
    ///
    /// # Errors
    ///
    /// Returns an error string if scanning cannot start.
    #[wasm_bindgen(js_name = startImageScan)]
    pub fn start_image_scan(&mut self, name: &str, media_type: &str, data: Vec<u8>) -> Result<(), JsValue> {
        self.host
            .start_image_scan(vec![ImageFile::new(name, media_type, data)])
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Stop the current scan attempt.
    #[wasm_bindgen(js_name = stopScan)]
    pub fn stop_scan(&mut self) -> bool {
        self.host.stop_scan()
    }

    /// Flush coalesced camera overlay states. Call once per animation frame.
    pub fn tick(&mut self) {
        self.host.tick();
    }

    /// Force the UI state (`NONE`, `LOADING`, `ERROR`, `SUCCESS`).
    ///
    /// # Errors
    ///
    /// Returns an error string for an unknown state.
    #[wasm_bindgen(js_name = setUiState)]
    pub fn set_ui_state(&mut self, state: &str) -> Result<(), JsValue> {
        let state = UiState::parse(state)
            .ok_or_else(|| JsValue::from_str(&format!("Unknown UI state '{state}'")))?;
        self.host.set_ui_state(state);
        Ok(())
    }

    /// Show a feedback message (`FEEDBACK_ERROR`, `FEEDBACK_INFO`, `FEEDBACK_OK`),
    /// optionally tagged with a feedback code such as `SCAN_SUCCESSFUL`.
    ///
    /// # Errors
    ///
    /// Returns an error string for an unknown feedback state or code.
    #[wasm_bindgen(js_name = setUiMessage)]
    pub fn set_ui_message(&mut self, state: &str, message: &str, code: Option<String>) -> Result<(), JsValue> {
        let state = FeedbackState::parse(state)
            .ok_or_else(|| JsValue::from_str(&format!("Unknown feedback state '{state}'")))?;
        let mut feedback = FeedbackMessage::plain(state, message);
        if let Some(code) = code {
            let code = FeedbackCode::parse(&code)
                .ok_or_else(|| JsValue::from_str(&format!("Unknown feedback code '{code}'")))?;
            feedback = feedback.with_code(code);
        }
        self.host.show_feedback(&feedback);
        Ok(())
    }

    /// Register an event listener receiving `{type, detail}` JSON.
    #[wasm_bindgen(js_name = onEvent)]
    pub fn on_event(&mut self, callback: js_sys::Function) {
        self.host.on_event(move |event| call_json(&callback, event));
    }

    /// Register a feedback listener receiving `{code?, state, message}` JSON.
    #[wasm_bindgen(js_name = onFeedback)]
    pub fn on_feedback(&mut self, callback: js_sys::Function) {
        self.host.on_feedback(move |message| call_json(&callback, message));
    }

    /// Register a camera overlay listener receiving the state name as JSON.
    #[wasm_bindgen(js_name = onExperience)]
    pub fn on_experience(&mut self, callback: js_sys::Function) {
        self.host.on_experience(move |state| call_json(&callback, &state));
    }

    /// Current UI state as its wire name.
    #[wasm_bindgen(js_name = getUiState)]
    #[must_use]
    pub fn get_ui_state(&self) -> String {
        serde_json::to_value(self.host.ui_state())
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default()
    }

    /// What the component should render.
    #[wasm_bindgen(js_name = getPresentation)]
    #[must_use]
    pub fn get_presentation(&self) -> String {
        serde_json::to_value(self.host.presentation())
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default()
    }

    /// Active configuration as JSON, empty when unconfigured.
    #[wasm_bindgen(js_name = getConfigJson)]
    #[must_use]
    pub fn get_config_json(&self) -> String {
        self.host
            .config()
            .and_then(|config| serde_json::to_string(config).ok())
            .unwrap_or_default()
    }

    /// Tear down the session and unload the engine.
    pub fn shutdown(&mut self) {
        self.host.shutdown();
    }
}
