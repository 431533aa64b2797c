use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sensing modality the session is running in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Image,
    HandGesture,
    Pose,
    Audio,
    GestureRecognizer,
}

/// What kind of signal a mode's feature source produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// Fixed-length embedding vector.
    Vector,
    /// Landmark set, flattened for the classifier.
    Landmarks,
}

/// Static capabilities of a mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeProfile {
    pub signal: SignalKind,
    /// `false` for inference-only modes that never train a classifier.
    pub trainable: bool,
    pub overlay_landmarks: bool,
    /// Whether predictions go to the output channel unless configured otherwise.
    pub drives_output: bool,
}

impl Mode {
    pub const ALL: [Mode; 5] = [
        Mode::Image,
        Mode::HandGesture,
        Mode::Pose,
        Mode::Audio,
        Mode::GestureRecognizer,
    ];

    pub fn profile(self) -> ModeProfile {
        match self {
            Mode::Image => ModeProfile {
                signal: SignalKind::Vector,
                trainable: true,
                overlay_landmarks: false,
                drives_output: true,
            },
            Mode::HandGesture | Mode::Pose => ModeProfile {
                signal: SignalKind::Landmarks,
                trainable: true,
                overlay_landmarks: true,
                drives_output: false,
            },
            Mode::Audio => ModeProfile {
                signal: SignalKind::Vector,
                trainable: true,
                overlay_landmarks: false,
                drives_output: false,
            },
            Mode::GestureRecognizer => ModeProfile {
                signal: SignalKind::Landmarks,
                trainable: false,
                overlay_landmarks: true,
                drives_output: false,
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Image => "image",
            Mode::HandGesture => "hand_gesture",
            Mode::Pose => "pose",
            Mode::Audio => "audio",
            Mode::GestureRecognizer => "gesture_recognizer",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Mode::Image => "Image",
            Mode::HandGesture => "Hand gesture",
            Mode::Pose => "Pose",
            Mode::Audio => "Audio",
            Mode::GestureRecognizer => "Gesture recognizer",
        }
    }

    pub fn is_landmark(self) -> bool {
        self.profile().signal == SignalKind::Landmarks
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown mode '{0}'")]
pub struct ModeParseError(pub String);

impl FromStr for Mode {
    type Err = ModeParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Mode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == normalized)
            .ok_or_else(|| ModeParseError(value.to_string()))
    }
}
