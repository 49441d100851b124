//! Replays a [`ReplayScript`] against a [`ScanHost`].

use std::cell::RefCell;
use std::rc::Rc;

use scanner_core::{
    CameraExperienceState, Clock, EngineError, EngineInbox, EngineMessage, EngineSettings,
    FeedbackMessage, ImageFile, ImageRecognitionRequest, ManualClock, OutboundEvent,
    RawAttributes, ScanEngine, ScanHost, UiState, VideoRecognitionRequest,
};
use serde::Serialize;

use crate::script::{Action, ReplayScript};

/// Engine standing in for the real one. Callbacks come from the script.
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    bootstrap: Option<EngineInbox>,
    scan: Option<EngineInbox>,
}

impl ScriptedEngine {
    fn deliver(&self, message: EngineMessage) -> bool {
        let inbox = match message {
            EngineMessage::Status(_) => self.scan.as_ref(),
            EngineMessage::Ready(_) | EngineMessage::LoadFailed(_) => self.bootstrap.as_ref(),
        };
        inbox.is_some_and(|inbox| inbox.send(message))
    }
}

impl ScanEngine for ScriptedEngine {
    fn load(&mut self, settings: &EngineSettings, inbox: EngineInbox) -> Result<(), EngineError> {
        tracing::debug!(token = %inbox.token(), build = ?settings.wasm_build, "Engine load");
        self.bootstrap = Some(inbox);
        Ok(())
    }

    fn start_camera_scan(&mut self, request: &VideoRecognitionRequest, inbox: EngineInbox) {
        tracing::debug!(token = %inbox.token(), recognizers = ?request.recognizers, "Engine camera scan");
        self.scan = Some(inbox);
    }

    fn start_image_scan(&mut self, request: &ImageRecognitionRequest, inbox: EngineInbox) {
        tracing::debug!(token = %inbox.token(), files = request.files.len(), "Engine image scan");
        self.scan = Some(inbox);
    }

    fn stop_scan(&mut self) {
        self.scan = None;
    }

    fn unload(&mut self) {
        self.bootstrap = None;
        self.scan = None;
    }
}

/// What happened, in output order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Record {
    /// Outbound event.
    Event {
        /// Script time.
        #[serde(rename = "atMs")]
        at_ms: u64,
        /// The event.
        event: OutboundEvent,
    },
    /// Feedback publish.
    Feedback {
        /// Script time.
        #[serde(rename = "atMs")]
        at_ms: u64,
        /// The message.
        message: FeedbackMessage,
    },
    /// Camera overlay change.
    Experience {
        /// Script time.
        #[serde(rename = "atMs")]
        at_ms: u64,
        /// New overlay state.
        state: CameraExperienceState,
    },
    /// A host call was refused or a callback had no recipient.
    Rejected {
        /// Script time.
        #[serde(rename = "atMs")]
        at_ms: u64,
        /// Reason.
        reason: String,
    },
    /// Final state after the last step.
    Finished {
        /// Script time.
        #[serde(rename = "atMs")]
        at_ms: u64,
        /// UI state.
        #[serde(rename = "uiState")]
        ui_state: UiState,
    },
}

/// Run a script to completion and return everything it produced.
#[must_use]
pub fn run(script: &ReplayScript) -> Vec<Record> {
    let clock = ManualClock::new(0);
    let mut host = ScanHost::with_clock(ScriptedEngine::default(), clock.clone());
    let records = Rc::new(RefCell::new(Vec::new()));

    let sink = Rc::clone(&records);
    let time = clock.clone();
    host.on_event(move |event| {
        sink.borrow_mut().push(Record::Event {
            at_ms: time.now_ms(),
            event: event.clone(),
        });
    });
    let sink = Rc::clone(&records);
    let time = clock.clone();
    host.on_feedback(move |message| {
        sink.borrow_mut().push(Record::Feedback {
            at_ms: time.now_ms(),
            message: message.clone(),
        });
    });
    let sink = Rc::clone(&records);
    let time = clock.clone();
    host.on_experience(move |state| {
        sink.borrow_mut().push(Record::Experience {
            at_ms: time.now_ms(),
            state,
        });
    });

    let reject = |at_ms: u64, reason: String| {
        tracing::info!(at_ms, %reason, "Step rejected");
        records.borrow_mut().push(Record::Rejected { at_ms, reason });
    };

    if let Err(error) = host.configure(&script.raw_attributes(), &script.properties) {
        reject(0, error.to_string());
    }

    let mut now = 0;
    for step in &script.steps {
        now = now.max(step.at_ms);
        clock.set(now);
        host.tick();

        let outcome = match &step.action {
            Action::Ready => deliver(&mut host, EngineMessage::Ready(script.engine.clone())),
            Action::LoadFailed { error } => deliver(&mut host, EngineMessage::LoadFailed(error.clone())),
            Action::Status { value } => deliver(&mut host, EngineMessage::Status(value.clone())),
            Action::StartCameraScan => host.start_camera_scan().map_err(|e| e.to_string()),
            Action::StartImageScan { files } => host
                .start_image_scan(
                    files
                        .iter()
                        .map(|f| ImageFile::new(&f.name, &f.media_type, Vec::new()))
                        .collect(),
                )
                .map_err(|e| e.to_string()),
            Action::StopScan => {
                host.stop_scan();
                Ok(())
            }
            Action::Tick => Ok(()),
            Action::SetUiState { state } => {
                host.set_ui_state(*state);
                Ok(())
            }
            Action::SetUiMessage {
                state,
                message,
                code,
            } => {
                let mut feedback = FeedbackMessage::plain(*state, message.clone());
                feedback.code = *code;
                host.show_feedback(&feedback);
                Ok(())
            }
            Action::Reconfigure {
                attributes,
                properties,
            } => {
                let raw: RawAttributes = attributes.iter().collect();
                host.configure(&raw, properties).map_err(|e| e.to_string())
            }
        };
        if let Err(reason) = outcome {
            reject(now, reason);
        }
    }

    records.borrow_mut().push(Record::Finished {
        at_ms: now,
        ui_state: host.ui_state(),
    });
    drop(host);
    Rc::try_unwrap(records).map_or_else(|shared| shared.borrow().clone(), RefCell::into_inner)
}

fn deliver(host: &mut ScanHost<ScriptedEngine>, message: EngineMessage) -> Result<(), String> {
    let kind = match &message {
        EngineMessage::Ready(_) => "ready",
        EngineMessage::LoadFailed(_) => "loadFailed",
        EngineMessage::Status(status) => status.name(),
    };
    if !host.engine().deliver(message) {
        return Err(format!("No engine inbox for {kind}"));
    }
    host.pump();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::Step;
    use scanner_core::{ErrorCode, RecognitionResults, RecognitionStatus};
    use std::collections::HashMap;

    fn script(steps: Vec<Step>) -> ReplayScript {
        serde_json::from_value::<ReplayScript>(serde_json::json!({
            "attributes": {"license-key": "X", "recognizers": "BlinkCardRecognizer"}
        }))
        .map(|mut s| {
            s.steps = steps;
            s
        })
        .unwrap()
    }

    fn step(at_ms: u64, action: Action) -> Step {
        Step { at_ms, action }
    }

    fn kinds(records: &[Record]) -> Vec<String> {
        records
            .iter()
            .map(|r| match r {
                Record::Event { event, .. } => event.name().to_string(),
                Record::Feedback { .. } => "feedback".to_string(),
                Record::Experience { state, .. } => format!("{state:?}"),
                Record::Rejected { .. } => "rejected".to_string(),
                Record::Finished { .. } => "finished".to_string(),
            })
            .collect()
    }

    #[test]
    fn test_successful_camera_session() {
        let records = run(&script(vec![
            step(0, Action::Ready),
            step(10, Action::StartCameraScan),
            step(20, Action::Status {
                value: RecognitionStatus::Processing,
            }),
            step(900, Action::Status {
                value: RecognitionStatus::ScanSuccessful(RecognitionResults::new(
                    "BlinkCardRecognizer",
                    serde_json::json!({"cardNumber": "4111"}),
                )),
            }),
        ]));
        assert_eq!(
            kinds(&records),
            vec!["ready", "cameraScanStarted", "DoneAll", "scanSuccess", "finished"]
        );
        assert_eq!(
            records.last(),
            Some(&Record::Finished {
                at_ms: 900,
                ui_state: UiState::Success
            })
        );
    }

    #[test]
    fn test_scan_before_ready_is_rejected() {
        let records = run(&script(vec![step(5, Action::StartCameraScan)]));
        assert_eq!(kinds(&records), vec!["rejected", "finished"]);
        match &records[0] {
            Record::Rejected { at_ms, reason } => {
                assert_eq!(*at_ms, 5);
                assert_eq!(reason, "Engine is not ready");
            }
            other => panic!("unexpected record {other:?}"),
        }
    }

    #[test]
    fn test_reconfigure_drops_old_attempt() {
        let records = run(&script(vec![
            step(0, Action::Ready),
            step(1, Action::StartCameraScan),
            step(2, Action::Reconfigure {
                attributes: HashMap::from([
                    ("license-key".to_string(), "Y".to_string()),
                    ("recognizers".to_string(), "BlinkIdRecognizer".to_string()),
                ]),
                properties: scanner_core::TypedProperties::default(),
            }),
            step(3, Action::Status {
                value: RecognitionStatus::CameraInUse,
            }),
        ]));
        assert_eq!(
            kinds(&records),
            vec!["ready", "cameraScanStarted", "rejected", "finished"]
        );
    }

    #[test]
    fn test_invalid_configuration_is_reported() {
        let mut broken = script(Vec::new());
        broken.attributes.remove("license-key");
        let records = run(&broken);
        assert_eq!(kinds(&records), vec!["fatalError", "rejected", "finished"]);
        match &records[0] {
            Record::Event {
                event: OutboundEvent::FatalError(fatal),
                ..
            } => assert_eq!(fatal.code, ErrorCode::MissingLicenseKey),
            other => panic!("unexpected record {other:?}"),
        }
    }

    #[test]
    fn test_bundled_script_coalesces_overlay() {
        let script: ReplayScript =
            serde_json::from_str(include_str!("../scripts/blinkcard_camera.json")).unwrap();
        let records = run(&script);

        assert_eq!(
            kinds(&records),
            vec![
                "ready",
                "cameraScanStarted",
                "Detection",
                "MoveCloser",
                "Flip",
                "DoneAll",
                "scanSuccess",
                "finished"
            ]
        );
        // Flip waited for MoveCloser and surfaced on the tick before the success step
        assert!(records.contains(&Record::Experience {
            at_ms: 4200,
            state: CameraExperienceState::Flip
        }));
    }

    #[test]
    fn test_coded_ui_message_is_recorded() {
        let records = run(&script(vec![step(5, Action::SetUiMessage {
            state: scanner_core::FeedbackState::Info,
            message: "Card saved".to_string(),
            code: Some(scanner_core::FeedbackCode::ScanSuccessful),
        })]));
        assert_eq!(kinds(&records), vec!["feedback", "finished"]);
        match &records[0] {
            Record::Feedback { at_ms, message } => {
                assert_eq!(*at_ms, 5);
                assert_eq!(message.code, Some(scanner_core::FeedbackCode::ScanSuccessful));
            }
            other => panic!("unexpected record {other:?}"),
        }
    }

    #[test]
    fn test_record_wire_format() {
        let json = serde_json::to_value(Record::Finished {
            at_ms: 42,
            ui_state: UiState::None,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"kind": "finished", "atMs": 42, "uiState": "NONE"})
        );
    }
}
