use super::dataset::ClassId;
use super::mode::Mode;
use super::prediction::Prediction;
use super::training::TrainingStatus;
use crate::features::Landmark;
use crate::ml::EpochReport;

/// Severity of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Idle,
    Busy,
    Info,
    Warning,
    Error,
}

/// Receives everything the session publishes for a UI layer.
///
/// All methods default to no-ops so observers only implement what they draw.
pub trait SessionObserver {
    fn status(&mut self, _text: &str, _tone: StatusTone) {}

    /// Published on every mode selection, including re-selecting the current mode.
    fn mode_changed(&mut self, _mode: Mode) {}

    fn example_count(&mut self, _class: ClassId, _count: usize) {}

    fn training_progress(&mut self, _report: &EpochReport) {}

    fn training_finished(&mut self, _run_id: u64, _status: &TrainingStatus) {}

    fn prediction(&mut self, _prediction: &Prediction) {}

    fn landmarks(&mut self, _landmarks: &[Landmark]) {}
}

/// Observer that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl SessionObserver for NullObserver {}
