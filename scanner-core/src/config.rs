//! Configuration resolution.
//!
//! Hosts configure the component through two channels: string attributes
//! (HTML style, always text) and typed properties (structured values). The
//! resolver merges both into one immutable [`SessionConfig`]. For every key a
//! typed property, when present, overrides the attribute.
//!
//! ```
//! use scanner_core::config::{resolve, RawAttributes, TypedProperties};
//! use scanner_core::RecognizerId;
//!
//! let attrs = RawAttributes::new()
//!     .with("license-key", "sRwAAAYJbG9jYWxob3N0")
//!     .with("recognizers", "BlinkCardRecognizer");
//! let config = resolve(&attrs, &TypedProperties::default()).unwrap();
//! assert_eq!(config.recognizers, vec![RecognizerId::BlinkCard]);
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::recognizer::RecognizerId;
use crate::translations::Translations;

/// Attribute and property names understood by the resolver.
pub mod keys {
    /// `allowHelloMessage`
    pub const ALLOW_HELLO_MESSAGE: &str = "allowHelloMessage";
    /// `engineLocation`
    pub const ENGINE_LOCATION: &str = "engineLocation";
    /// `licenseKey`
    pub const LICENSE_KEY: &str = "licenseKey";
    /// `wasmType`
    pub const WASM_TYPE: &str = "wasmType";
    /// `recognizers`
    pub const RECOGNIZERS: &str = "recognizers";
    /// `includeSuccessFrame`
    pub const INCLUDE_SUCCESS_FRAME: &str = "includeSuccessFrame";
    /// `enableDrag`
    pub const ENABLE_DRAG: &str = "enableDrag";
    /// `hideFeedback`
    pub const HIDE_FEEDBACK: &str = "hideFeedback";
    /// `hideLoadingAndErrorUi`
    pub const HIDE_LOADING_AND_ERROR_UI: &str = "hideLoadingAndErrorUi";
    /// `scanFromCamera`
    pub const SCAN_FROM_CAMERA: &str = "scanFromCamera";
    /// `scanFromImage`
    pub const SCAN_FROM_IMAGE: &str = "scanFromImage";
    /// `showActionLabels`
    pub const SHOW_ACTION_LABELS: &str = "showActionLabels";
    /// `showModalWindows`
    pub const SHOW_MODAL_WINDOWS: &str = "showModalWindows";
    /// `showScanningLine`
    pub const SHOW_SCANNING_LINE: &str = "showScanningLine";
    /// `translations`
    pub const TRANSLATIONS: &str = "translations";
    /// `cameraId`
    pub const CAMERA_ID: &str = "cameraId";
    /// `iconCameraDefault`
    pub const ICON_CAMERA_DEFAULT: &str = "iconCameraDefault";
    /// `iconCameraActive`
    pub const ICON_CAMERA_ACTIVE: &str = "iconCameraActive";
    /// `iconGalleryDefault`
    pub const ICON_GALLERY_DEFAULT: &str = "iconGalleryDefault";
    /// `iconGalleryActive`
    pub const ICON_GALLERY_ACTIVE: &str = "iconGalleryActive";
    /// `iconInvalidFormat`
    pub const ICON_INVALID_FORMAT: &str = "iconInvalidFormat";
    /// `iconSpinnerScreenLoading`
    pub const ICON_SPINNER_SCREEN_LOADING: &str = "iconSpinnerScreenLoading";
    /// `iconSpinnerFromGalleryExperience`
    pub const ICON_SPINNER_FROM_GALLERY_EXPERIENCE: &str = "iconSpinnerFromGalleryExperience";
}

/// WebAssembly build flavour the engine should load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WasmBuildType {
    /// Portable build without SIMD.
    Basic,
    /// SIMD enabled build.
    Advanced,
    /// SIMD and threads.
    AdvancedWithThreads,
    /// Let the engine inspect the browser and pick.
    #[default]
    Auto,
}

impl WasmBuildType {
    /// Parse the attribute form. Returns `None` for unrecognized values.
    ///
    /// Accepts `BASIC`, `ADVANCED`, `ADVANCED_WITH_THREADS` in any case and
    /// with `-` or `_` separators; empty and `auto` select [`Self::Auto`].
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_uppercase().replace('-', "_");
        match normalized.as_str() {
            "" | "AUTO" => Some(Self::Auto),
            "BASIC" => Some(Self::Basic),
            "ADVANCED" => Some(Self::Advanced),
            "ADVANCED_WITH_THREADS" => Some(Self::AdvancedWithThreads),
            _ => None,
        }
    }
}

/// Alternative icon sources. Values are opaque to the core (URLs, data URIs).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IconSet {
    /// Camera button icon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_camera_default: Option<String>,
    /// Camera button icon, hover state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_camera_active: Option<String>,
    /// Gallery button icon, also used for drag and drop.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_gallery_default: Option<String>,
    /// Gallery button icon, hover state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_gallery_active: Option<String>,
    /// Invalid format icon shown while dragging unsupported files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_invalid_format: Option<String>,
    /// Spinner on the loading screen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_spinner_screen_loading: Option<String>,
    /// Spinner while processing an image from the gallery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_spinner_from_gallery_experience: Option<String>,
}

impl IconSet {
    /// Field-wise merge: `over` wins where set.
    fn overlay(self, over: &Self) -> Self {
        let pick = |base: Option<String>, top: &Option<String>| top.clone().or(base);
        Self {
            icon_camera_default: pick(self.icon_camera_default, &over.icon_camera_default),
            icon_camera_active: pick(self.icon_camera_active, &over.icon_camera_active),
            icon_gallery_default: pick(self.icon_gallery_default, &over.icon_gallery_default),
            icon_gallery_active: pick(self.icon_gallery_active, &over.icon_gallery_active),
            icon_invalid_format: pick(self.icon_invalid_format, &over.icon_invalid_format),
            icon_spinner_screen_loading: pick(
                self.icon_spinner_screen_loading,
                &over.icon_spinner_screen_loading,
            ),
            icon_spinner_from_gallery_experience: pick(
                self.icon_spinner_from_gallery_experience,
                &over.icon_spinner_from_gallery_experience,
            ),
        }
    }

    fn from_attributes(raw: &RawAttributes) -> Self {
        let get = |key: &str| raw.get(key).map(str::to_string);
        Self {
            icon_camera_default: get(keys::ICON_CAMERA_DEFAULT),
            icon_camera_active: get(keys::ICON_CAMERA_ACTIVE),
            icon_gallery_default: get(keys::ICON_GALLERY_DEFAULT),
            icon_gallery_active: get(keys::ICON_GALLERY_ACTIVE),
            icon_invalid_format: get(keys::ICON_INVALID_FORMAT),
            icon_spinner_screen_loading: get(keys::ICON_SPINNER_SCREEN_LOADING),
            icon_spinner_from_gallery_experience: get(keys::ICON_SPINNER_FROM_GALLERY_EXPERIENCE),
        }
    }
}

/// String-encoded attributes, keyed case- and separator-insensitively so
/// `license-key`, `licensekey` and `licenseKey` address the same entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawAttributes {
    values: HashMap<String, String>,
}

fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

impl RawAttributes {
    /// Create an empty attribute set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Self::set`].
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Set an attribute, replacing any previous value.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.values.insert(normalize_name(name), value.into());
    }

    /// Remove an attribute.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.values.remove(&normalize_name(name))
    }

    /// Get an attribute value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(&normalize_name(name)).map(String::as_str)
    }

    /// Read a boolean attribute. A present but empty attribute is `true`
    /// (HTML boolean attribute semantics); unparseable values are ignored.
    #[must_use]
    pub fn flag(&self, name: &str) -> Option<bool> {
        let value = self.get(name)?;
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "true" => Some(true),
            "false" => Some(false),
            other => {
                tracing::warn!("Ignoring non-boolean value '{other}' for attribute {name}");
                None
            }
        }
    }

    /// Number of attributes set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no attributes are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for RawAttributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Self::new();
        for (k, v) in iter {
            attrs.set(k.as_ref(), v);
        }
        attrs
    }
}

/// Typed properties. Every field is optional; set fields override attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct TypedProperties {
    /// Log the engine hello message once the license check passes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_hello_message: Option<bool>,
    /// Absolute location of engine resources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_location: Option<String>,
    /// License key unlocking the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_key: Option<String>,
    /// WebAssembly build flavour, attribute string form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wasm_type: Option<String>,
    /// Recognizer names, in order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recognizers: Option<Vec<String>>,
    /// Option bags keyed by recognizer name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recognizer_options: Option<serde_json::Map<String, serde_json::Value>>,
    /// Include the success frame in `scanSuccess`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_success_frame: Option<bool>,
    /// Enable drag and drop of images.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_drag: Option<bool>,
    /// Suppress feedback display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hide_feedback: Option<bool>,
    /// Suppress loading and initialization error screens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hide_loading_and_error_ui: Option<bool>,
    /// Enable scan from camera.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_from_camera: Option<bool>,
    /// Enable scan from image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_from_image: Option<bool>,
    /// Show labels under action buttons.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_action_labels: Option<bool>,
    /// Present errors in a modal window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_modal_windows: Option<bool>,
    /// Animate the scanning line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_scanning_line: Option<bool>,
    /// Translation overrides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translations: Option<HashMap<String, String>>,
    /// Preferred camera device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera_id: Option<String>,
    /// Alternative icons.
    #[serde(flatten)]
    pub icons: IconSet,
}

/// Canonical, validated configuration for one session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct SessionConfig {
    /// Recognizers in order; non-empty and unique.
    pub recognizers: Vec<RecognizerId>,
    /// Opaque option bags forwarded to the engine.
    pub recognizer_options: BTreeMap<RecognizerId, serde_json::Value>,
    /// Log the engine hello message.
    pub allow_hello_message: bool,
    /// Engine resource location; empty means the page origin.
    pub engine_location: String,
    /// License key, never blank.
    pub license_key: String,
    /// WebAssembly build flavour.
    pub wasm_build: WasmBuildType,
    /// Translation table.
    pub translations: Translations,
    /// Drag and drop enabled.
    pub enable_drag: bool,
    /// Scan from camera enabled.
    pub scan_from_camera: bool,
    /// Scan from image enabled. Always `false` with the combined recognizer.
    pub scan_from_image: bool,
    /// Include the success frame in results.
    pub include_success_frame: bool,
    /// Labels under action buttons.
    pub show_action_labels: bool,
    /// Errors presented as modal windows.
    pub show_modal_windows: bool,
    /// Scanning line animation.
    pub show_scanning_line: bool,
    /// Feedback display suppressed.
    pub hide_feedback: bool,
    /// Loading/error screens suppressed.
    pub hide_loading_and_error_ui: bool,
    /// Preferred camera device.
    pub camera_id: Option<String>,
    /// Alternative icons.
    pub icons: IconSet,
}

impl SessionConfig {
    /// Whether the combined-side recognizer is configured.
    #[must_use]
    pub fn uses_combined_recognizer(&self) -> bool {
        self.recognizers.iter().any(|id| id.is_combined())
    }

    /// Name reported in `scanError` events when the engine supplies none.
    #[must_use]
    pub fn primary_recognizer_name(&self) -> &'static str {
        self.recognizers.first().map_or("", |id| id.name())
    }
}

/// Resolve attributes and properties into a [`SessionConfig`].
///
/// Validation happens entirely here, so a failed resolution never reaches
/// the engine.
///
/// # Errors
///
/// - [`ConfigError::InvalidRecognizers`] for an empty, unknown, duplicated or
///   invalid combination of recognizers.
/// - [`ConfigError::InvalidRecognizerOptions`] for options keyed by a
///   recognizer not in the list, or options that are not objects.
/// - [`ConfigError::MissingLicenseKey`] for an absent or blank key.
/// - [`ConfigError::Translations`] for a malformed translations attribute.
/// - [`ConfigError::InvalidEngineLocation`] for a non-URL engine location.
pub fn resolve(raw: &RawAttributes, props: &TypedProperties) -> Result<SessionConfig, ConfigError> {
    let recognizers = resolve_recognizers(raw, props)?;

    let license_key = props
        .license_key
        .clone()
        .or_else(|| raw.get(keys::LICENSE_KEY).map(str::to_string))
        .unwrap_or_default();
    if license_key.trim().is_empty() {
        return Err(ConfigError::MissingLicenseKey);
    }

    let recognizer_options = resolve_recognizer_options(&recognizers, props)?;
    let translations = resolve_translations(raw, props)?;
    let engine_location = resolve_engine_location(raw, props)?;
    let wasm_build = resolve_wasm_build(raw, props);

    let flag = |typed: Option<bool>, key: &str, default: bool| {
        typed.or_else(|| raw.flag(key)).unwrap_or(default)
    };

    let combined = recognizers.iter().any(|id| id.is_combined());
    let scan_from_image = flag(props.scan_from_image, keys::SCAN_FROM_IMAGE, true);
    if combined && scan_from_image {
        tracing::debug!("Combined recognizer configured, disabling scan from image");
    }

    let camera_id = props
        .camera_id
        .clone()
        .or_else(|| raw.get(keys::CAMERA_ID).map(str::to_string))
        .filter(|id| !id.is_empty());

    let config = SessionConfig {
        recognizers,
        recognizer_options,
        allow_hello_message: flag(props.allow_hello_message, keys::ALLOW_HELLO_MESSAGE, true),
        engine_location,
        license_key,
        wasm_build,
        translations,
        enable_drag: flag(props.enable_drag, keys::ENABLE_DRAG, true),
        scan_from_camera: flag(props.scan_from_camera, keys::SCAN_FROM_CAMERA, true),
        scan_from_image: scan_from_image && !combined,
        include_success_frame: flag(props.include_success_frame, keys::INCLUDE_SUCCESS_FRAME, false),
        show_action_labels: flag(props.show_action_labels, keys::SHOW_ACTION_LABELS, false),
        show_modal_windows: flag(props.show_modal_windows, keys::SHOW_MODAL_WINDOWS, false),
        show_scanning_line: flag(props.show_scanning_line, keys::SHOW_SCANNING_LINE, false),
        hide_feedback: flag(props.hide_feedback, keys::HIDE_FEEDBACK, false),
        hide_loading_and_error_ui: flag(
            props.hide_loading_and_error_ui,
            keys::HIDE_LOADING_AND_ERROR_UI,
            false,
        ),
        camera_id,
        icons: IconSet::from_attributes(raw).overlay(&props.icons),
    };

    tracing::debug!(
        recognizers = ?config.recognizers,
        wasm_build = ?config.wasm_build,
        "Resolved session configuration"
    );
    Ok(config)
}

/// Split a comma separated attribute into trimmed, non-empty tokens.
#[must_use]
pub fn split_recognizer_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

fn resolve_recognizers(
    raw: &RawAttributes,
    props: &TypedProperties,
) -> Result<Vec<RecognizerId>, ConfigError> {
    let names = match &props.recognizers {
        Some(list) => list.iter().map(|name| name.trim().to_string()).collect(),
        None => raw
            .get(keys::RECOGNIZERS)
            .map(split_recognizer_list)
            .unwrap_or_default(),
    };

    if names.is_empty() {
        return Err(ConfigError::InvalidRecognizers(
            "at least one recognizer is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    let mut recognizers = Vec::with_capacity(names.len());
    for name in &names {
        let id: RecognizerId = name
            .parse()
            .map_err(|e: crate::recognizer::UnknownRecognizer| {
                ConfigError::InvalidRecognizers(e.to_string())
            })?;
        if !seen.insert(id) {
            return Err(ConfigError::InvalidRecognizers(format!(
                "recognizer '{id}' listed more than once"
            )));
        }
        recognizers.push(id);
    }

    if recognizers.len() > 1 && recognizers.iter().any(|id| id.is_combined()) {
        return Err(ConfigError::InvalidRecognizers(format!(
            "{} cannot be combined with other recognizers",
            RecognizerId::BlinkCardCombined
        )));
    }

    Ok(recognizers)
}

fn resolve_recognizer_options(
    recognizers: &[RecognizerId],
    props: &TypedProperties,
) -> Result<BTreeMap<RecognizerId, serde_json::Value>, ConfigError> {
    let Some(options) = &props.recognizer_options else {
        return Ok(BTreeMap::new());
    };

    let mut resolved = BTreeMap::new();
    for (name, bag) in options {
        let id = name
            .parse::<RecognizerId>()
            .ok()
            .filter(|id| recognizers.contains(id))
            .ok_or_else(|| {
                ConfigError::InvalidRecognizerOptions(format!(
                    "options supplied for '{name}' which is not in the recognizer list"
                ))
            })?;
        if !bag.is_object() {
            return Err(ConfigError::InvalidRecognizerOptions(format!(
                "options for '{name}' must be an object"
            )));
        }
        resolved.insert(id, bag.clone());
    }
    Ok(resolved)
}

fn resolve_translations(
    raw: &RawAttributes,
    props: &TypedProperties,
) -> Result<Translations, ConfigError> {
    if let Some(entries) = &props.translations {
        return Ok(Translations::new(entries.clone()));
    }
    match raw.get(keys::TRANSLATIONS).map(str::trim) {
        Some(text) if !text.is_empty() => {
            let entries: HashMap<String, String> = serde_json::from_str(text)?;
            Ok(Translations::new(entries))
        }
        _ => Ok(Translations::default()),
    }
}

fn resolve_engine_location(
    raw: &RawAttributes,
    props: &TypedProperties,
) -> Result<String, ConfigError> {
    let location = props
        .engine_location
        .clone()
        .or_else(|| raw.get(keys::ENGINE_LOCATION).map(str::to_string))
        .unwrap_or_default();
    let location = location.trim().to_string();
    if location.is_empty() {
        return Ok(location);
    }
    url::Url::parse(&location)
        .map_err(|source| ConfigError::InvalidEngineLocation {
            location: location.clone(),
            source,
        })?;
    Ok(location)
}

fn resolve_wasm_build(raw: &RawAttributes, props: &TypedProperties) -> WasmBuildType {
    let Some(value) = props
        .wasm_type
        .as_deref()
        .or_else(|| raw.get(keys::WASM_TYPE))
    else {
        return WasmBuildType::Auto;
    };
    WasmBuildType::parse(value).unwrap_or_else(|| {
        tracing::warn!("Unknown wasmType '{value}', letting the engine choose");
        WasmBuildType::Auto
    })
}
