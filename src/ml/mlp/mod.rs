//! Lightweight MLP classifier head for feature vectors.

mod classifier;
mod model;
mod train;

pub use classifier::{MlpClassifier, MlpFactory};
pub use model::MlpWeights;
pub use train::{MlpOptions, train_mlp};
