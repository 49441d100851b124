//! Configuration precedence tests.
//!
//! Typed properties always override string attributes, for every key, and
//! the rule holds again on every reconfiguration.

mod common;

use std::collections::HashMap;

use common::{Call, Session};
use proptest::prelude::*;
use scanner_core::{
    resolve, RawAttributes, RecognizerId, SessionConfig, TypedProperties, WasmBuildType,
};

const RECOGNIZERS: [&str; 3] = ["BlinkCardRecognizer", "BlinkIdRecognizer", "IdBarcodeRecognizer"];

fn arb_recognizer_list() -> impl Strategy<Value = Vec<&'static str>> {
    proptest::sample::subsequence(RECOGNIZERS.to_vec(), 1..=3)
}

fn arb_wasm() -> impl Strategy<Value = (&'static str, WasmBuildType)> {
    prop_oneof![
        Just(("basic", WasmBuildType::Basic)),
        Just(("ADVANCED", WasmBuildType::Advanced)),
        Just(("advanced-with-threads", WasmBuildType::AdvancedWithThreads)),
        Just(("auto", WasmBuildType::Auto)),
    ]
}

fn flags(config: &SessionConfig) -> [bool; 10] {
    [
        config.allow_hello_message,
        config.enable_drag,
        config.scan_from_camera,
        config.scan_from_image,
        config.include_success_frame,
        config.show_action_labels,
        config.show_modal_windows,
        config.show_scanning_line,
        config.hide_feedback,
        config.hide_loading_and_error_ui,
    ]
}

const FLAG_KEYS: [&str; 10] = [
    "allow-hello-message",
    "enable-drag",
    "scan-from-camera",
    "scan-from-image",
    "include-success-frame",
    "show-action-labels",
    "show-modal-windows",
    "show-scanning-line",
    "hide-feedback",
    "hide-loading-and-error-ui",
];

fn typed_flags(values: [bool; 10]) -> TypedProperties {
    TypedProperties {
        allow_hello_message: Some(values[0]),
        enable_drag: Some(values[1]),
        scan_from_camera: Some(values[2]),
        scan_from_image: Some(values[3]),
        include_success_frame: Some(values[4]),
        show_action_labels: Some(values[5]),
        show_modal_windows: Some(values[6]),
        show_scanning_line: Some(values[7]),
        hide_feedback: Some(values[8]),
        hide_loading_and_error_ui: Some(values[9]),
        ..TypedProperties::default()
    }
}

proptest! {
    #[test]
    fn prop_typed_flags_override_attributes(
        raw_values in any::<[bool; 10]>(),
        typed_values in any::<[bool; 10]>(),
    ) {
        let mut attrs = RawAttributes::new()
            .with("license-key", "X")
            .with("recognizers", "BlinkCardRecognizer");
        for (key, value) in FLAG_KEYS.iter().zip(raw_values) {
            attrs.set(key, value.to_string());
        }

        let from_attrs = resolve(&attrs, &TypedProperties::default()).unwrap();
        prop_assert_eq!(flags(&from_attrs), raw_values);

        let typed = TypedProperties {
            license_key: Some("Y".into()),
            ..typed_flags(typed_values)
        };
        let merged = resolve(&attrs, &typed).unwrap();
        prop_assert_eq!(flags(&merged), typed_values);
        prop_assert_eq!(merged.license_key, "Y");
    }

    #[test]
    fn prop_typed_recognizers_override_csv(
        raw_list in arb_recognizer_list(),
        typed_list in arb_recognizer_list(),
    ) {
        let attrs = RawAttributes::new()
            .with("license-key", "X")
            .with("recognizers", raw_list.join(" , "));
        let typed = TypedProperties {
            recognizers: Some(typed_list.iter().map(|s| (*s).to_string()).collect()),
            ..TypedProperties::default()
        };

        let expected: Vec<RecognizerId> = typed_list.iter().map(|s| s.parse().unwrap()).collect();
        let merged = resolve(&attrs, &typed).unwrap();
        prop_assert_eq!(merged.recognizers, expected);

        let raw_only: Vec<RecognizerId> = raw_list.iter().map(|s| s.parse().unwrap()).collect();
        prop_assert_eq!(resolve(&attrs, &TypedProperties::default()).unwrap().recognizers, raw_only);
    }

    #[test]
    fn prop_typed_translations_override_json(
        raw_text in "[a-zA-Z ]{1,24}",
        typed_text in "[a-zA-Z ]{1,24}",
    ) {
        let raw_json = serde_json::json!({"feedback-scan-unsuccessful": raw_text}).to_string();
        let attrs = RawAttributes::new()
            .with("license-key", "X")
            .with("recognizers", "BlinkCardRecognizer")
            .with("translations", raw_json);
        let typed = TypedProperties {
            translations: Some(HashMap::from([(
                "feedback-scan-unsuccessful".to_string(),
                typed_text.clone(),
            )])),
            ..TypedProperties::default()
        };

        let raw_only = resolve(&attrs, &TypedProperties::default()).unwrap();
        prop_assert_eq!(raw_only.translations.get("feedback-scan-unsuccessful"), raw_text.as_str());

        let merged = resolve(&attrs, &typed).unwrap();
        prop_assert_eq!(merged.translations.get("feedback-scan-unsuccessful"), typed_text.as_str());
    }

    #[test]
    fn prop_typed_wasm_type_overrides_attribute(
        (raw_value, raw_expected) in arb_wasm(),
        (typed_value, typed_expected) in arb_wasm(),
    ) {
        let attrs = RawAttributes::new()
            .with("license-key", "X")
            .with("recognizers", "BlinkCardRecognizer")
            .with("wasm-type", raw_value);
        prop_assert_eq!(resolve(&attrs, &TypedProperties::default()).unwrap().wasm_build, raw_expected);

        let typed = TypedProperties {
            wasm_type: Some(typed_value.to_string()),
            ..TypedProperties::default()
        };
        prop_assert_eq!(resolve(&attrs, &typed).unwrap().wasm_build, typed_expected);
    }
}

#[test]
fn typed_properties_deserialize_from_camel_case_json() {
    let props: TypedProperties = serde_json::from_value(serde_json::json!({
        "licenseKey": "X",
        "recognizers": ["BlinkCardRecognizer"],
        "recognizerOptions": {"BlinkCardRecognizer": {"extractCvv": false}},
        "hideFeedback": true,
        "cameraId": "back-camera",
        "iconCameraDefault": "data:image/svg+xml;base64,PHN2Zy8+",
    }))
    .unwrap();
    let config = resolve(&RawAttributes::new(), &props).unwrap();
    assert!(config.hide_feedback);
    assert_eq!(config.camera_id.as_deref(), Some("back-camera"));
    assert_eq!(
        config.icons.icon_camera_default.as_deref(),
        Some("data:image/svg+xml;base64,PHN2Zy8+")
    );
    assert_eq!(
        config.recognizer_options[&RecognizerId::BlinkCard],
        serde_json::json!({"extractCvv": false})
    );
}

#[test]
fn precedence_reapplied_on_reconfiguration() {
    let mut session = Session::new();
    let attrs = RawAttributes::new()
        .with("license-key", "attr-key")
        .with("recognizers", "BlinkIdRecognizer")
        .with("engine-location", "https://cdn.example.com/resources/");

    session.host.configure(&attrs, &TypedProperties::default()).unwrap();
    assert_eq!(session.host.config().unwrap().license_key, "attr-key");

    let typed = TypedProperties {
        license_key: Some("prop-key".into()),
        engine_location: Some("https://assets.example.org/engine/".into()),
        ..TypedProperties::default()
    };
    session.host.configure(&attrs, &typed).unwrap();
    let config = session.host.config().unwrap();
    assert_eq!(config.license_key, "prop-key");
    assert_eq!(config.engine_location, "https://assets.example.org/engine/");
    assert_eq!(config.recognizers, vec![RecognizerId::BlinkId]);

    // Dropping the property falls back to the attribute again
    session.host.configure(&attrs, &TypedProperties::default()).unwrap();
    assert_eq!(session.host.config().unwrap().license_key, "attr-key");

    let settings: Vec<_> = session
        .host
        .engine()
        .calls
        .iter()
        .filter_map(|c| match c {
            Call::Load(settings) => Some(settings.license_key.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(settings, vec!["attr-key", "prop-key", "attr-key"]);
}

#[test]
fn invalid_engine_location_is_rejected() {
    let attrs = RawAttributes::new()
        .with("license-key", "X")
        .with("recognizers", "BlinkCardRecognizer")
        .with("engine-location", "not a url");
    let err = resolve(&attrs, &TypedProperties::default()).unwrap_err();
    assert_eq!(err.code(), scanner_core::ErrorCode::SdkLoadFailed);
}
