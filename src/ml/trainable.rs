use thiserror::Error;

use super::buffers::{BufferError, EncodedBatch};
use super::{EpochReport, Hyperparameters};

/// A classifier that can be fitted once and then queried per frame.
///
/// Implementations own their weights; [`TrainableModel::dispose`] releases
/// them and must be safe to call more than once.
pub trait TrainableModel: Send {
    /// Fit on `batch`, invoking `on_epoch` after every completed epoch.
    fn fit(
        &mut self,
        batch: &EncodedBatch,
        params: &Hyperparameters,
        on_epoch: &mut dyn FnMut(EpochReport),
    ) -> Result<(), FitError>;

    /// Class probability distribution for one feature vector.
    fn predict(&self, features: &[f32]) -> Result<Vec<f32>, PredictError>;

    fn dispose(&mut self);

    fn is_disposed(&self) -> bool;
}

/// Builds fresh models sized to the data at training time.
pub trait ModelFactory {
    fn build(&self, input_len: usize, n_classes: usize) -> Box<dyn TrainableModel>;
}

#[derive(Debug, Error)]
pub enum FitError {
    #[error("Model was disposed before fitting")]
    Disposed,
    #[error(transparent)]
    Encode(#[from] BufferError),
    #[error("Batch shape {inputs}x{classes} does not match model {expected_inputs}x{expected_classes}")]
    Shape {
        inputs: usize,
        classes: usize,
        expected_inputs: usize,
        expected_classes: usize,
    },
    #[error("Training diverged at epoch {epoch}")]
    Diverged { epoch: usize },
    #[error("Training aborted by a panic: {detail}")]
    Panicked { detail: String },
}

#[derive(Debug, Error, PartialEq)]
pub enum PredictError {
    #[error("Model has not been trained")]
    NotTrained,
    #[error("Model has been disposed")]
    Disposed,
    #[error("Expected {expected} features, got {found}")]
    Dimension { expected: usize, found: usize },
}
