//! Trainable classifier heads and the transient buffers they train on.
//!
//! The session only talks to [`TrainableModel`] and [`ModelFactory`]; the
//! bundled [`mlp`] head is the default implementation.

pub mod buffers;
pub mod metrics;
pub mod mlp;
mod trainable;

pub use buffers::{BufferError, BufferLedger, EncodedBatch, Tensor, encode_batch};
pub use trainable::{FitError, ModelFactory, PredictError, TrainableModel};

/// Parameters of a single training run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hyperparameters {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f32,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            epochs: 20,
            batch_size: 16,
            learning_rate: 0.01,
        }
    }
}

impl Hyperparameters {
    /// Replace non-positive or non-finite values with `defaults`.
    pub fn sanitized(self, defaults: &Hyperparameters) -> Self {
        Self {
            epochs: if self.epochs > 0 {
                self.epochs
            } else {
                defaults.epochs
            },
            batch_size: if self.batch_size > 0 {
                self.batch_size
            } else {
                defaults.batch_size
            },
            learning_rate: if self.learning_rate.is_finite() && self.learning_rate > 0.0 {
                self.learning_rate
            } else {
                defaults.learning_rate
            },
        }
    }
}

/// Metrics published after each completed epoch (`epoch` is 1-based).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochReport {
    pub epoch: usize,
    pub total_epochs: usize,
    pub loss: f32,
    pub accuracy: f32,
}
