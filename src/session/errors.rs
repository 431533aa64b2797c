use thiserror::Error;

use super::dataset::ClassId;
use super::mode::Mode;
use crate::features::SourceError;

/// Session-level failures surfaced to the caller.
///
/// Frame-level problems (misses, busy detectors, single failed predictions)
/// never show up here.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("A training run is already in progress")]
    AlreadyTraining,
    #[error("Collect at least one sample before training")]
    InsufficientData,
    #[error("Collection is locked while training is running or complete")]
    CollectionLocked,
    #[error("Unknown class id {0}")]
    UnknownClass(ClassId),
    #[error("{} mode does not train a classifier", .0.display_name())]
    NotTrainable(Mode),
    #[error("No feature source is available for {0} mode")]
    NoSource(Mode),
    #[error("Feature source for {mode} mode failed to load: {source}")]
    ModelLoad {
        mode: Mode,
        #[source]
        source: SourceError,
    },
    #[error("Failed to start training worker: {0}")]
    Spawn(#[source] std::io::Error),
}
