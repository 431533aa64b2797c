use super::dataset::{ClassId, ClassRegistry};
use super::mode::Mode;
use super::prediction::Prediction;

/// Label and time of the last message sent to the output channel.
#[derive(Debug, Clone, PartialEq)]
pub struct LastSent {
    pub label: String,
    pub at_ms: f64,
}

/// Session context shared by the controller and its loops.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub current_mode: Mode,
    pub classes: ClassRegistry,
    /// Class currently receiving samples, if collecting.
    pub gather_target: Option<ClassId>,
    pub predict_enabled: bool,
    pub training_completed: bool,
    pub preview_ready: bool,
    /// Last published prediction, padded to the class count.
    pub last_prediction: Option<Prediction>,
    pub last_sent: Option<LastSent>,
    /// Liveness token; bumped on every mode switch, reset and teardown.
    pub mode_generation: u64,
}

impl SessionState {
    pub fn new(mode: Mode, classes: ClassRegistry) -> Self {
        Self {
            current_mode: mode,
            classes,
            gather_target: None,
            predict_enabled: false,
            training_completed: false,
            preview_ready: false,
            last_prediction: None,
            last_sent: None,
            mode_generation: 0,
        }
    }

    /// Flags back to the initial values for the current mode.
    pub fn reset_flags(&mut self) {
        self.gather_target = None;
        self.predict_enabled = !self.current_mode.profile().trainable;
        self.training_completed = false;
        self.preview_ready = false;
        self.last_prediction = None;
        self.last_sent = None;
    }

    pub fn bump_generation(&mut self) -> u64 {
        self.mode_generation += 1;
        self.mode_generation
    }
}
