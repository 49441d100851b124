//! # Scanner Replay
//!
//! Drives the scanner core with a scripted engine so a whole session can be
//! reproduced without a browser or a camera.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p scanner-replay -- session.json
//! cargo run -p scanner-replay -- session.json --only event --only feedback
//! ```
//!
//! Each produced record is written to stdout as one JSON line. Logs go to
//! stderr and honour `RUST_LOG` and `RUST_LOG_FORMAT=json`.
//!
//! ## Architecture
//!
//! - `CliArgs` - Command-line arguments parsed with clap
//! - `ReplayConfig` - What to run and which records to keep
//! - `ReplayScript` - Script file format
//! - `run` - Feeds the script to a `ScanHost` backed by `ScriptedEngine`

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

mod runner;
mod script;

pub use runner::{run, Record, ScriptedEngine};
pub use script::{Action, FileSpec, ReplayScript, Step};

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for scanner-replay.
#[derive(Debug, Clone, Parser)]
#[command(name = "scanner-replay")]
#[command(about = "Replay a scripted scan session and print what it emits")]
#[command(version)]
pub struct CliArgs {
    /// Script to replay
    #[arg(env = "SCANNER_REPLAY_SCRIPT")]
    pub script: PathBuf,

    /// Only print records of this kind (repeatable)
    #[arg(long, value_enum)]
    pub only: Vec<RecordKind>,

    /// Pretty-print each record instead of one line per record
    #[arg(long)]
    pub pretty: bool,
}

/// Record kinds selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RecordKind {
    /// Outbound events.
    Event,
    /// Feedback publishes.
    Feedback,
    /// Camera overlay changes.
    Experience,
    /// Refused host calls and undeliverable callbacks.
    Rejected,
    /// Final state.
    Finished,
}

impl RecordKind {
    /// Kind of a record.
    #[must_use]
    pub const fn of(record: &Record) -> Self {
        match record {
            Record::Event { .. } => Self::Event,
            Record::Feedback { .. } => Self::Feedback,
            Record::Experience { .. } => Self::Experience,
            Record::Rejected { .. } => Self::Rejected,
            Record::Finished { .. } => Self::Finished,
        }
    }
}

/// Replay configuration.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Script location.
    pub script: PathBuf,
    /// Kinds to print. Empty means all.
    pub only: Vec<RecordKind>,
    /// Pretty-print output.
    pub pretty: bool,
}

impl ReplayConfig {
    /// Whether a record should be printed.
    #[must_use]
    pub fn keeps(&self, record: &Record) -> bool {
        self.only.is_empty() || self.only.contains(&RecordKind::of(record))
    }
}

impl From<CliArgs> for ReplayConfig {
    fn from(args: CliArgs) -> Self {
        Self {
            script: args.script,
            only: args.only,
            pretty: args.pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanner_core::UiState;

    #[test]
    fn test_cli_args_into_config() {
        let args = CliArgs::try_parse_from([
            "scanner-replay",
            "session.json",
            "--only",
            "event",
            "--only",
            "rejected",
        ])
        .unwrap();
        let config = ReplayConfig::from(args);
        assert_eq!(config.script, PathBuf::from("session.json"));
        assert_eq!(config.only, vec![RecordKind::Event, RecordKind::Rejected]);
        assert!(!config.pretty);
    }

    #[test]
    fn test_keeps_filters_by_kind() {
        let finished = Record::Finished {
            at_ms: 0,
            ui_state: UiState::None,
        };
        let rejected = Record::Rejected {
            at_ms: 0,
            reason: "nope".to_string(),
        };

        let mut config = ReplayConfig {
            script: PathBuf::new(),
            only: Vec::new(),
            pretty: false,
        };
        assert!(config.keeps(&finished));

        config.only = vec![RecordKind::Rejected];
        assert!(!config.keeps(&finished));
        assert!(config.keeps(&rejected));
    }
}
