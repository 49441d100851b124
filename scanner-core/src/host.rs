//! # Scan Host
//!
//! The orchestrator. Owns the active [`SessionConfig`], the
//! [`SessionStateMachine`] and the engine, and is the only way callers reach
//! them.
//!
//! Engine callbacks are not delivered by calling into the host. The engine
//! posts [`EngineMessage`]s into an [`EngineInbox`]; the host drains its inbox
//! with [`ScanHost::pump`] (or awaits it with [`ScanHost::process_next`]) and
//! handles one message completely before the next. Every inbox carries a
//! [`SessionToken`]; messages whose token belongs to a superseded
//! configuration or attempt are dropped.
//!
//! ```text
//!  configure ──► resolve ──► engine.load(inbox g.0)
//!                                  │
//!  start_camera_scan ──► engine.start_camera_scan(inbox g.n)
//!                                  │
//!           inbox ◄── Ready / Status ...
//!             │
//!  pump ──► token check ──► SessionStateMachine ──► events / feedback
//! ```

use tokio::sync::mpsc;

use crate::clock::{Clock, SystemClock};
use crate::config::{self, RawAttributes, SessionConfig, TypedProperties};
use crate::engine::{
    EngineInbox, EngineMessage, EngineSettings, Envelope, ImageFile, ImageRecognitionRequest,
    ScanEngine, ScanSource, SessionToken, VideoRecognitionRequest,
};
use crate::error::{EngineError, HostError, ScanResult};
use crate::event::OutboundEvent;
use crate::experience::CameraExperienceState;
use crate::feedback::{FeedbackChannel, FeedbackMessage, FeedbackSink, FeedbackState};
use crate::state::{Effect, Presentation, SessionOptions, SessionStateMachine, UiState};
use crate::status::RecognitionStatus;

type EventListener = Box<dyn FnMut(&OutboundEvent)>;
type ExperienceListener = Box<dyn FnMut(CameraExperienceState)>;

/// Orchestrates configuration, engine and state machine for one component.
pub struct ScanHost<E: ScanEngine> {
    engine: E,
    clock: Box<dyn Clock>,
    tx: mpsc::UnboundedSender<Envelope>,
    rx: mpsc::UnboundedReceiver<Envelope>,
    generation: u64,
    attempt: u64,
    engine_loaded: bool,
    config: Option<SessionConfig>,
    machine: SessionStateMachine,
    feedback: FeedbackChannel,
    event_listeners: Vec<EventListener>,
    experience_listeners: Vec<ExperienceListener>,
}

impl<E: ScanEngine> ScanHost<E> {
    /// Create an unconfigured host using the system clock.
    #[must_use]
    pub fn new(engine: E) -> Self {
        Self::with_clock(engine, SystemClock)
    }

    /// Create an unconfigured host with an explicit clock.
    #[must_use]
    pub fn with_clock(engine: E, clock: impl Clock + 'static) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            engine,
            clock: Box::new(clock),
            tx,
            rx,
            generation: 0,
            attempt: 0,
            engine_loaded: false,
            config: None,
            machine: SessionStateMachine::new(SessionOptions::default()),
            feedback: FeedbackChannel::new(),
            event_listeners: Vec::new(),
            experience_listeners: Vec::new(),
        }
    }

    /// Register an event listener.
    pub fn on_event(&mut self, listener: impl FnMut(&OutboundEvent) + 'static) {
        self.event_listeners.push(Box::new(listener));
    }

    /// Register an observer of the programmatic `feedback` event.
    pub fn on_feedback(&mut self, observer: impl FnMut(&FeedbackMessage) + 'static) {
        self.feedback.subscribe(observer);
    }

    /// Set where feedback is displayed. Subject to `hideFeedback`.
    pub fn set_feedback_sink(&mut self, sink: impl FeedbackSink + 'static) {
        self.feedback.set_sink(sink);
    }

    /// Register an observer of camera overlay changes.
    pub fn on_experience(&mut self, listener: impl FnMut(CameraExperienceState) + 'static) {
        self.experience_listeners.push(Box::new(listener));
    }

    /// Resolve attributes and properties and rebuild the session.
    ///
    /// The previous session is torn down first, whatever the outcome. A
    /// rejected configuration emits `fatalError` and leaves the host in
    /// [`UiState::Error`] without touching the engine.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Config`] when the configuration is rejected.
    pub fn configure(&mut self, raw: &RawAttributes, props: &TypedProperties) -> ScanResult<()> {
        match config::resolve(raw, props) {
            Ok(config) => {
                self.apply(config);
                Ok(())
            }
            Err(error) => {
                self.begin_session();
                self.config = None;
                self.machine = SessionStateMachine::new(SessionOptions::default());
                self.feedback.set_hidden(false);
                let effects = self.machine.bootstrap_failed(EngineError::from(&error));
                self.dispatch(effects);
                Err(error.into())
            }
        }
    }

    /// Replace the session with an already resolved configuration.
    pub fn apply(&mut self, config: SessionConfig) {
        self.begin_session();
        self.machine = SessionStateMachine::new(SessionOptions::from(&config));
        self.feedback.set_hidden(config.hide_feedback);

        let settings = EngineSettings::from(&config);
        self.config = Some(config);
        tracing::info!(
            generation = self.generation,
            wasm_build = ?settings.wasm_build,
            "Loading scan engine"
        );

        let inbox = self.inbox(SessionToken::bootstrap(self.generation));
        match self.engine.load(&settings, inbox) {
            Ok(()) => self.engine_loaded = true,
            Err(error) => {
                let effects = self.machine.bootstrap_failed(error);
                self.dispatch(effects);
            }
        }
    }

    /// Start scanning from camera.
    ///
    /// Any attempt in flight is cancelled silently.
    ///
    /// # Errors
    ///
    /// - [`HostError::NotConfigured`] without a valid configuration.
    /// - [`HostError::SourceDisabled`] when `scanFromCamera` is off.
    /// - [`HostError::EngineNotReady`] before the engine reported ready.
    pub fn start_camera_scan(&mut self) -> ScanResult<()> {
        let request = VideoRecognitionRequest::from(self.enabled_config(ScanSource::Camera)?);
        let inbox = self.begin_attempt(ScanSource::Camera)?;
        self.engine.start_camera_scan(&request, inbox);
        Ok(())
    }

    /// Start scanning the given files.
    ///
    /// # Errors
    ///
    /// Same as [`Self::start_camera_scan`], with `scanFromImage`.
    pub fn start_image_scan(&mut self, files: Vec<ImageFile>) -> ScanResult<()> {
        let request = ImageRecognitionRequest::new(self.enabled_config(ScanSource::Image)?, files);
        let inbox = self.begin_attempt(ScanSource::Image)?;
        self.engine.start_image_scan(&request, inbox);
        Ok(())
    }

    /// Stop the attempt in flight. Returns whether one was active.
    pub fn stop_scan(&mut self) -> bool {
        let active = self.machine.cancel_attempt();
        if active {
            self.engine.stop_scan();
        }
        active
    }

    /// Handle one engine message.
    ///
    /// Returns `false` when the message was stale and dropped.
    pub fn handle(&mut self, envelope: Envelope) -> bool {
        let Envelope { token, message } = envelope;
        if token.generation != self.generation {
            tracing::trace!(%token, current = self.generation, "Message from superseded session dropped");
            return false;
        }

        let effects = match message {
            EngineMessage::Ready(handle) if token.attempt == 0 => {
                if self.config.as_ref().is_some_and(|c| c.allow_hello_message) {
                    tracing::info!(
                        engine = %handle.name,
                        version = %handle.version,
                        build = ?handle.wasm_build,
                        "Scan engine ready"
                    );
                }
                self.machine.engine_ready(handle)
            }
            EngineMessage::LoadFailed(error) if token.attempt == 0 => {
                self.machine.bootstrap_failed(error)
            }
            EngineMessage::Status(status) if token.attempt != 0 && token.attempt == self.attempt => {
                self.process_status(status)
            }
            other => {
                tracing::trace!(%token, current = self.attempt, message = ?other, "Message from superseded attempt dropped");
                return false;
            }
        };
        self.dispatch(effects);
        true
    }

    /// Handle a report from an engine that stamps tokens itself, such as one
    /// running in the page.
    ///
    /// Queued messages are handled first. Returns `false` when the report
    /// belongs to a superseded session or attempt.
    pub fn deliver(&mut self, envelope: Envelope) -> bool {
        self.pump();
        let accepted = self.handle(envelope);
        self.pump();
        accepted
    }

    /// Handle every message already queued. Returns how many were taken.
    pub fn pump(&mut self) -> usize {
        let mut count = 0;
        while let Ok(envelope) = self.rx.try_recv() {
            self.handle(envelope);
            count += 1;
        }
        count
    }

    /// Wait for the next engine message and handle it.
    ///
    /// Returns `false` if the inbox is closed, which cannot happen while the
    /// host is alive.
    pub async fn process_next(&mut self) -> bool {
        match self.rx.recv().await {
            Some(envelope) => {
                self.handle(envelope);
                true
            }
            None => false,
        }
    }

    /// Flush camera overlay states whose predecessor has been shown long
    /// enough. Call from the frame loop.
    pub fn tick(&mut self) {
        let effects = self.machine.tick(self.clock.now_ms());
        self.dispatch(effects);
    }

    /// Force the UI state. Recognition and overlay state are untouched and
    /// no feedback is published.
    pub fn set_ui_state(&mut self, state: UiState) {
        tracing::debug!(?state, "UI state set by host");
        self.machine.set_ui_state(state);
    }

    /// Show a feedback message directly.
    pub fn set_ui_message(&mut self, state: FeedbackState, message: impl Into<String>) {
        self.show_feedback(&FeedbackMessage::plain(state, message));
    }

    /// Show a prepared feedback message, code included.
    pub fn show_feedback(&mut self, message: &FeedbackMessage) {
        self.feedback.publish(message);
    }

    /// Tear down the session and unload the engine.
    pub fn shutdown(&mut self) {
        self.begin_session();
        self.config = None;
        self.machine = SessionStateMachine::new(SessionOptions::default());
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> Option<&SessionConfig> {
        self.config.as_ref()
    }

    /// Current UI state.
    #[must_use]
    pub const fn ui_state(&self) -> UiState {
        self.machine.ui_state()
    }

    /// What a rendering host should show.
    #[must_use]
    pub const fn presentation(&self) -> Presentation {
        self.machine.presentation()
    }

    /// Last recognition status of the current session.
    #[must_use]
    pub const fn recognition_status(&self) -> Option<&RecognitionStatus> {
        self.machine.recognition_status()
    }

    /// Camera overlay state currently shown.
    #[must_use]
    pub const fn experience_state(&self) -> CameraExperienceState {
        self.machine.experience_state()
    }

    /// The state machine, for inspection.
    #[must_use]
    pub const fn machine(&self) -> &SessionStateMachine {
        &self.machine
    }

    /// Configuration generation; bumps on every (re)configuration.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// The engine.
    #[must_use]
    pub const fn engine(&self) -> &E {
        &self.engine
    }

    /// The engine, mutably.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    fn begin_session(&mut self) {
        if self.machine.cancel_attempt() {
            tracing::debug!(generation = self.generation, "In-flight attempt dropped by reconfiguration");
            self.engine.stop_scan();
        }
        if self.engine_loaded {
            self.engine.unload();
            self.engine_loaded = false;
        }
        self.generation += 1;
    }

    fn enabled_config(&self, source: ScanSource) -> ScanResult<&SessionConfig> {
        let config = self.config.as_ref().ok_or(HostError::NotConfigured)?;
        let enabled = match source {
            ScanSource::Camera => config.scan_from_camera,
            ScanSource::Image => config.scan_from_image,
        };
        if enabled {
            Ok(config)
        } else {
            Err(HostError::SourceDisabled(source))
        }
    }

    fn begin_attempt(&mut self, source: ScanSource) -> ScanResult<EngineInbox> {
        let superseded = self.machine.active_attempt().is_some();
        let effects = self.machine.start_attempt(source)?;
        if superseded {
            self.engine.stop_scan();
        }
        self.attempt += 1;
        let token = SessionToken {
            generation: self.generation,
            attempt: self.attempt,
        };
        tracing::info!(%token, %source, "Scan attempt started");
        self.dispatch(effects);
        Ok(self.inbox(token))
    }

    fn process_status(&mut self, status: RecognitionStatus) -> Vec<Effect> {
        let was_active = self.machine.active_attempt().is_some();
        let effects = self.machine.process(status, self.clock.now_ms());
        if was_active && self.machine.active_attempt().is_none() {
            self.engine.stop_scan();
        }
        effects
    }

    fn inbox(&self, token: SessionToken) -> EngineInbox {
        EngineInbox::new(token, self.tx.clone())
    }

    fn dispatch(&mut self, effects: Vec<Effect>) {
        let include_success_frame = self
            .config
            .as_ref()
            .is_some_and(|c| c.include_success_frame);
        for effect in effects {
            match effect {
                Effect::Transition(transition) => {
                    let event = OutboundEvent::from_transition(transition, include_success_frame);
                    tracing::debug!(event = event.name(), "Emitting event");
                    for listener in &mut self.event_listeners {
                        listener(&event);
                    }
                }
                Effect::Feedback(message) => self.feedback.publish(&message),
                Effect::Experience(state) => {
                    for listener in &mut self.experience_listeners {
                        listener(state);
                    }
                }
            }
        }
    }
}

impl<E: ScanEngine> Drop for ScanHost<E> {
    fn drop(&mut self) {
        if self.engine_loaded {
            self.engine.unload();
        }
    }
}

impl<E: ScanEngine + std::fmt::Debug> std::fmt::Debug for ScanHost<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanHost")
            .field("engine", &self.engine)
            .field("generation", &self.generation)
            .field("attempt", &self.attempt)
            .field("ui_state", &self.machine.ui_state())
            .field("feedback", &self.feedback)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::WasmBuildType;
    use crate::engine::EngineHandle;
    use crate::error::ErrorCode;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Default)]
    struct StubEngine {
        loads: usize,
        unloads: usize,
        stops: usize,
        bootstrap: Option<EngineInbox>,
        scan: Option<EngineInbox>,
    }

    impl ScanEngine for StubEngine {
        fn load(&mut self, _settings: &EngineSettings, inbox: EngineInbox) -> Result<(), EngineError> {
            self.loads += 1;
            self.bootstrap = Some(inbox);
            Ok(())
        }

        fn start_camera_scan(&mut self, _request: &VideoRecognitionRequest, inbox: EngineInbox) {
            self.scan = Some(inbox);
        }

        fn start_image_scan(&mut self, _request: &ImageRecognitionRequest, inbox: EngineInbox) {
            self.scan = Some(inbox);
        }

        fn stop_scan(&mut self) {
            self.stops += 1;
        }

        fn unload(&mut self) {
            self.unloads += 1;
        }
    }

    fn attrs() -> RawAttributes {
        RawAttributes::new()
            .with("license-key", "X")
            .with("recognizers", "BlinkCardRecognizer")
    }

    fn handle() -> EngineHandle {
        EngineHandle {
            name: "BlinkCard".into(),
            version: "2.10.1".into(),
            wasm_build: WasmBuildType::Advanced,
        }
    }

    fn ready_host() -> (ScanHost<StubEngine>, Rc<RefCell<Vec<OutboundEvent>>>) {
        let mut host = ScanHost::with_clock(StubEngine::default(), ManualClock::new(0));
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        host.on_event(move |event| sink.borrow_mut().push(event.clone()));
        host.configure(&attrs(), &TypedProperties::default()).unwrap();
        host.engine().bootstrap.as_ref().unwrap().send(EngineMessage::Ready(handle()));
        assert_eq!(host.pump(), 1);
        (host, events)
    }

    #[test]
    fn test_ready_enters_idle() {
        let (host, events) = ready_host();
        assert_eq!(host.ui_state(), UiState::None);
        assert_eq!(events.borrow().len(), 1);
        assert_eq!(events.borrow()[0].name(), "ready");
    }

    #[test]
    fn test_attempt_needs_ready_engine() {
        let mut host = ScanHost::with_clock(StubEngine::default(), ManualClock::new(0));
        assert!(matches!(host.start_camera_scan(), Err(HostError::NotConfigured)));
        host.configure(&attrs(), &TypedProperties::default()).unwrap();
        assert!(matches!(host.start_camera_scan(), Err(HostError::EngineNotReady)));
    }

    #[test]
    fn test_disabled_source_is_rejected() {
        let mut host = ScanHost::with_clock(StubEngine::default(), ManualClock::new(0));
        host.configure(&attrs().with("scan-from-image", "false"), &TypedProperties::default())
            .unwrap();
        assert!(matches!(
            host.start_image_scan(Vec::new()),
            Err(HostError::SourceDisabled(ScanSource::Image))
        ));
    }

    #[test]
    fn test_late_status_from_previous_attempt_is_dropped() {
        let (mut host, events) = ready_host();
        host.start_camera_scan().unwrap();
        let first = host.engine().scan.clone().unwrap();
        host.start_camera_scan().unwrap();
        assert_eq!(host.engine().stops, 1);

        first.status(RecognitionStatus::CameraInUse);
        host.pump();
        assert_eq!(host.ui_state(), UiState::None);
        assert!(events.borrow().iter().all(|e| e.name() != "scanError"));
    }

    #[test]
    fn test_delivered_report_for_superseded_session_is_dropped() {
        let (mut host, events) = ready_host();
        host.start_camera_scan().unwrap();
        let old = host.engine().scan.as_ref().unwrap().token();

        host.configure(&attrs(), &TypedProperties::default()).unwrap();
        let bootstrap = host.engine().bootstrap.as_ref().unwrap().token();
        assert!(host.deliver(Envelope {
            token: bootstrap,
            message: EngineMessage::Ready(handle()),
        }));
        host.start_camera_scan().unwrap();
        let current = host.engine().scan.as_ref().unwrap().token();

        let late: Envelope = serde_json::from_value(serde_json::json!({
            "token": old,
            "message": {
                "type": "status",
                "data": {
                    "status": "ScanSuccessful",
                    "data": {"recognizer": {}, "recognizerName": "BlinkCardRecognizer"}
                }
            }
        }))
        .unwrap();
        assert!(!host.deliver(late.clone()));
        assert_eq!(host.ui_state(), UiState::None);
        assert!(events.borrow().iter().all(|e| e.name() != "scanSuccess"));

        assert!(host.deliver(Envelope {
            token: current,
            ..late
        }));
        assert_eq!(host.ui_state(), UiState::Success);
    }

    #[test]
    fn test_terminal_status_stops_engine_scan() {
        let (mut host, _events) = ready_host();
        host.start_camera_scan().unwrap();
        host.engine().scan.as_ref().unwrap().status(RecognitionStatus::CameraGenericError);
        host.pump();
        assert_eq!(host.ui_state(), UiState::Error);
        assert_eq!(host.engine().stops, 1);
    }

    #[test]
    fn test_rejected_configuration_skips_engine() {
        let mut host = ScanHost::with_clock(StubEngine::default(), ManualClock::new(0));
        let codes = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&codes);
        host.on_event(move |event| {
            if let OutboundEvent::FatalError(fatal) = event {
                sink.borrow_mut().push(fatal.code);
            }
        });
        let err = host
            .configure(&RawAttributes::new().with("recognizers", "BlinkCardRecognizer"), &TypedProperties::default())
            .unwrap_err();
        assert!(matches!(err, HostError::Config(_)));
        assert_eq!(host.engine().loads, 0);
        assert_eq!(host.ui_state(), UiState::Error);
        assert_eq!(*codes.borrow(), vec![ErrorCode::MissingLicenseKey]);
    }

    #[test]
    fn test_reconfigure_unloads_and_bumps_generation() {
        let (mut host, _events) = ready_host();
        let before = host.generation();
        host.configure(&attrs(), &TypedProperties::default()).unwrap();
        assert_eq!(host.generation(), before + 1);
        assert_eq!(host.engine().unloads, 1);
        assert_eq!(host.engine().loads, 2);
        assert_eq!(host.ui_state(), UiState::Loading);
    }
}
