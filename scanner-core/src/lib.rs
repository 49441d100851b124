//! # Saorsa Scanner Core
//!
//! Session core for an in-browser card scanning component.
//! Compiles to WASM so the same logic drives every host page.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              scanner-core.wasm              │
//! ├─────────────────────────────────────────────┤
//! │  Config Resolver  │  Scan Host              │
//! │  - Attributes     │  - Engine facade        │
//! │  - Properties     │  - Token-checked inbox  │
//! │  - Validation     │  - Listeners            │
//! ├─────────────────────────────────────────────┤
//! │  State Machine    │  Event Contract         │
//! │  - UI lifecycle   │  - Outbound events      │
//! │  - Status dedup   │  - Feedback channel     │
//! │  - Overlay timing │                         │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! The recognition engine itself is an external collaborator reached
//! through [`ScanEngine`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod experience;
pub mod feedback;
pub mod host;
pub mod recognizer;
pub mod state;
pub mod status;
pub mod translations;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{resolve, IconSet, RawAttributes, SessionConfig, TypedProperties, WasmBuildType};
pub use engine::{
    EngineCommand, EngineHandle, EngineInbox, EngineMessage, EngineSettings, Envelope, ImageFile,
    ImageRecognitionRequest, ScanEngine, ScanSource, SessionToken, VideoRecognitionRequest,
};
pub use error::{ConfigError, EngineError, ErrorCode, HostError, ScanResult};
pub use event::{FatalErrorEvent, OutboundEvent, ReadyEvent, ScanErrorEvent, ScanSuccessEvent};
pub use experience::{CameraExperience, CameraExperienceState, ExperienceTimeline};
pub use feedback::{FeedbackChannel, FeedbackCode, FeedbackMessage, FeedbackSink, FeedbackState};
pub use host::ScanHost;
pub use recognizer::{RecognizerId, UnknownRecognizer};
pub use state::{
    Effect, ErrorOrigin, Presentation, SessionOptions, SessionStateMachine, Transition, UiState,
};
pub use status::{DetectionStatus, RecognitionResults, RecognitionStatus};
pub use translations::Translations;

/// Scanner core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
