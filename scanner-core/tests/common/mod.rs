//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use scanner_core::{
    CameraExperienceState, EngineError, EngineHandle, EngineInbox, EngineMessage, EngineSettings,
    FeedbackMessage, ImageRecognitionRequest, ManualClock, OutboundEvent, RawAttributes,
    RecognitionStatus, ScanEngine, ScanHost, TypedProperties, VideoRecognitionRequest,
    WasmBuildType,
};

/// Engine call as seen by the fake.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Load(EngineSettings),
    StartCamera(VideoRecognitionRequest),
    StartImage(usize),
    Stop,
    Unload,
}

/// Engine fake that records calls and keeps the inboxes it was handed.
#[derive(Debug, Default)]
pub struct RecordingEngine {
    pub calls: Vec<Call>,
    pub bootstrap: Option<EngineInbox>,
    pub scan: Option<EngineInbox>,
    pub fail_load: Option<EngineError>,
}

impl RecordingEngine {
    pub fn loads(&self) -> usize {
        self.calls.iter().filter(|c| matches!(c, Call::Load(_))).count()
    }

    pub fn stops(&self) -> usize {
        self.calls.iter().filter(|c| matches!(c, Call::Stop)).count()
    }
}

impl ScanEngine for RecordingEngine {
    fn load(&mut self, settings: &EngineSettings, inbox: EngineInbox) -> Result<(), EngineError> {
        self.calls.push(Call::Load(settings.clone()));
        if let Some(error) = self.fail_load.clone() {
            return Err(error);
        }
        self.bootstrap = Some(inbox);
        Ok(())
    }

    fn start_camera_scan(&mut self, request: &VideoRecognitionRequest, inbox: EngineInbox) {
        self.calls.push(Call::StartCamera(request.clone()));
        self.scan = Some(inbox);
    }

    fn start_image_scan(&mut self, request: &ImageRecognitionRequest, inbox: EngineInbox) {
        self.calls.push(Call::StartImage(request.files.len()));
        self.scan = Some(inbox);
    }

    fn stop_scan(&mut self) {
        self.calls.push(Call::Stop);
    }

    fn unload(&mut self) {
        self.calls.push(Call::Unload);
    }
}

/// A host wired to recording listeners and a manual clock.
pub struct Session {
    pub host: ScanHost<RecordingEngine>,
    pub clock: ManualClock,
    pub events: Rc<RefCell<Vec<OutboundEvent>>>,
    pub feedback: Rc<RefCell<Vec<FeedbackMessage>>>,
    pub shown: Rc<RefCell<Vec<FeedbackMessage>>>,
    pub experience: Rc<RefCell<Vec<CameraExperienceState>>>,
}

impl Session {
    pub fn new() -> Self {
        let clock = ManualClock::new(0);
        let mut host = ScanHost::with_clock(RecordingEngine::default(), clock.clone());

        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        host.on_event(move |event| sink.borrow_mut().push(event.clone()));

        let feedback = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&feedback);
        host.on_feedback(move |message| sink.borrow_mut().push(message.clone()));

        let shown = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&shown);
        host.set_feedback_sink(move |message: &FeedbackMessage| sink.borrow_mut().push(message.clone()));

        let experience = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&experience);
        host.on_experience(move |state| sink.borrow_mut().push(state));

        Self {
            host,
            clock,
            events,
            feedback,
            shown,
            experience,
        }
    }

    /// Configured with `licenseKey: "X"` and `recognizers: BlinkCardRecognizer`.
    pub fn card() -> Self {
        Self::with_attributes(card_attributes())
    }

    pub fn with_attributes(attrs: RawAttributes) -> Self {
        let mut session = Self::new();
        session
            .host
            .configure(&attrs, &TypedProperties::default())
            .expect("valid configuration");
        session
    }

    /// Configured and ready.
    pub fn ready_card() -> Self {
        let mut session = Self::card();
        session.ready();
        session
    }

    pub fn ready(&mut self) {
        let inbox = self.host.engine().bootstrap.clone().expect("engine loaded");
        assert!(inbox.send(EngineMessage::Ready(handle())));
        self.host.pump();
    }

    /// Post a status through the current scan inbox and handle it.
    pub fn status(&mut self, status: RecognitionStatus) {
        let inbox = self.host.engine().scan.clone().expect("scan started");
        assert!(inbox.status(status));
        self.host.pump();
    }

    pub fn event_names(&self) -> Vec<&'static str> {
        self.events.borrow().iter().map(OutboundEvent::name).collect()
    }

    /// Snapshot of the emitted events.
    pub fn emitted(&self) -> Vec<OutboundEvent> {
        self.events.borrow().clone()
    }

    pub fn last_event(&self) -> Option<OutboundEvent> {
        self.events.borrow().last().cloned()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events.borrow().iter().filter(|e| e.name() == name).count()
    }
}

pub fn card_attributes() -> RawAttributes {
    RawAttributes::new()
        .with("license-key", "X")
        .with("recognizers", "BlinkCardRecognizer")
}

pub fn handle() -> EngineHandle {
    EngineHandle {
        name: "BlinkCard".into(),
        version: "2.10.1".into(),
        wasm_build: WasmBuildType::Advanced,
    }
}
