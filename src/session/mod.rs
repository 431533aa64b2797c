//! The capture / train / predict session.
//!
//! [`SessionController`] is the mode state machine and the public API; it
//! owns a [`SessionState`] and drives the capture and prediction loops from
//! [`SessionController::on_frame`].

mod collector;
mod controller;
mod dataset;
mod errors;
mod events;
mod mode;
mod prediction;
mod scheduler;
mod state;
mod training;

pub use collector::{CaptureStep, SampleCollector};
pub use controller::{SessionController, SessionParts};
pub use dataset::{
    ClassId, ClassLabel, ClassRegistry, Dataset, DatasetError, DatasetSnapshot, Sample,
};
pub use errors::SessionError;
pub use events::{NullObserver, SessionObserver, StatusTone};
pub use mode::{Mode, ModeParseError, ModeProfile, SignalKind};
pub use prediction::{Prediction, PredictionLoop};
pub use scheduler::{FrameLoop, LoopControl};
pub use state::{LastSent, SessionState};
pub use training::{
    InlineSpawner, StartError, ThreadSpawner, TrainingCoordinator, TrainingJob, TrainingMessage,
    TrainingRun, TrainingSpawner, TrainingStatus,
};
