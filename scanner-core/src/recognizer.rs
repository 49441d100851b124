//! Recognizer identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A recognizer the engine can run, addressed by its public name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecognizerId {
    /// Payment card recognizer (front and back in one pass).
    #[serde(rename = "BlinkCardRecognizer")]
    BlinkCard,
    /// Combined-side card recognizer. Must be used alone and only from camera.
    #[serde(rename = "BlinkCardCombinedRecognizer")]
    BlinkCardCombined,
    /// Single-side identity document recognizer.
    #[serde(rename = "BlinkIdRecognizer")]
    BlinkId,
    /// Identity document barcode recognizer.
    #[serde(rename = "IdBarcodeRecognizer")]
    IdBarcode,
}

impl RecognizerId {
    /// Every known recognizer.
    pub const ALL: [Self; 4] = [
        Self::BlinkCard,
        Self::BlinkCardCombined,
        Self::BlinkId,
        Self::IdBarcode,
    ];

    /// Public name as used in attributes and events.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::BlinkCard => "BlinkCardRecognizer",
            Self::BlinkCardCombined => "BlinkCardCombinedRecognizer",
            Self::BlinkId => "BlinkIdRecognizer",
            Self::IdBarcode => "IdBarcodeRecognizer",
        }
    }

    /// Whether this is the combined-side recognizer.
    #[must_use]
    pub const fn is_combined(self) -> bool {
        matches!(self, Self::BlinkCardCombined)
    }
}

impl fmt::Display for RecognizerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown recognizer name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown recognizer '{0}'")]
pub struct UnknownRecognizer(pub String);

impl FromStr for RecognizerId {
    type Err = UnknownRecognizer;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.name() == s)
            .ok_or_else(|| UnknownRecognizer(s.to_string()))
    }
}
