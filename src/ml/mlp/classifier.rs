use tracing::debug;

use super::{MlpOptions, MlpWeights, train_mlp};
use crate::ml::{
    EncodedBatch, EpochReport, FitError, Hyperparameters, ModelFactory, PredictError,
    TrainableModel,
};

enum State {
    Untrained,
    Trained(MlpWeights),
    Disposed,
}

/// [`TrainableModel`] backed by the bundled MLP head.
pub struct MlpClassifier {
    input_len: usize,
    n_classes: usize,
    options: MlpOptions,
    state: State,
}

impl MlpClassifier {
    pub fn new(input_len: usize, n_classes: usize, options: MlpOptions) -> Self {
        Self {
            input_len,
            n_classes,
            options,
            state: State::Untrained,
        }
    }

    pub fn weights(&self) -> Option<&MlpWeights> {
        match &self.state {
            State::Trained(weights) => Some(weights),
            _ => None,
        }
    }
}

impl TrainableModel for MlpClassifier {
    fn fit(
        &mut self,
        batch: &EncodedBatch,
        params: &Hyperparameters,
        on_epoch: &mut dyn FnMut(EpochReport),
    ) -> Result<(), FitError> {
        if matches!(self.state, State::Disposed) {
            return Err(FitError::Disposed);
        }
        if batch.feature_len() != self.input_len || batch.n_classes() != self.n_classes {
            return Err(FitError::Shape {
                inputs: batch.feature_len(),
                classes: batch.n_classes(),
                expected_inputs: self.input_len,
                expected_classes: self.n_classes,
            });
        }
        let weights = train_mlp(batch, params, &self.options, on_epoch)?;
        debug!(
            inputs = self.input_len,
            classes = self.n_classes,
            hidden = weights.hidden_size,
            "MLP fitted"
        );
        self.state = State::Trained(weights);
        Ok(())
    }

    fn predict(&self, features: &[f32]) -> Result<Vec<f32>, PredictError> {
        let weights = match &self.state {
            State::Trained(weights) => weights,
            State::Untrained => return Err(PredictError::NotTrained),
            State::Disposed => return Err(PredictError::Disposed),
        };
        if features.len() != self.input_len {
            return Err(PredictError::Dimension {
                expected: self.input_len,
                found: features.len(),
            });
        }
        Ok(weights.predict_proba(features))
    }

    fn dispose(&mut self) {
        self.state = State::Disposed;
    }

    fn is_disposed(&self) -> bool {
        matches!(self.state, State::Disposed)
    }
}

/// Builds [`MlpClassifier`]s with fixed architecture options.
#[derive(Debug, Clone, Default)]
pub struct MlpFactory {
    options: MlpOptions,
}

impl MlpFactory {
    pub fn new(options: MlpOptions) -> Self {
        Self { options }
    }
}

impl ModelFactory for MlpFactory {
    fn build(&self, input_len: usize, n_classes: usize) -> Box<dyn TrainableModel> {
        Box::new(MlpClassifier::new(input_len, n_classes, self.options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::{BufferLedger, encode_batch};

    #[test]
    fn predict_before_fit_is_not_trained() {
        let model = MlpClassifier::new(2, 2, MlpOptions::default());
        assert_eq!(model.predict(&[0.0, 0.0]), Err(PredictError::NotTrained));
    }

    #[test]
    fn disposed_model_refuses_work() {
        let ledger = BufferLedger::new();
        let batch = encode_batch(&ledger, &[vec![0.0, 1.0], vec![1.0, 0.0]], &[0, 1], 2).unwrap();
        let mut model = MlpClassifier::new(2, 2, MlpOptions::default());
        model.fit(&batch, &Hyperparameters::default(), &mut |_| {}).unwrap();
        assert!(model.predict(&[0.0, 1.0]).is_ok());
        model.dispose();
        model.dispose();
        assert!(model.is_disposed());
        assert_eq!(model.predict(&[0.0, 1.0]), Err(PredictError::Disposed));
        assert!(matches!(
            model.fit(&batch, &Hyperparameters::default(), &mut |_| {}),
            Err(FitError::Disposed)
        ));
    }

    #[test]
    fn shape_mismatch_and_dimension_errors() {
        let ledger = BufferLedger::new();
        let batch = encode_batch(&ledger, &[vec![0.0, 1.0, 2.0]], &[0], 2).unwrap();
        let mut model = MlpClassifier::new(2, 2, MlpOptions::default());
        assert!(matches!(
            model.fit(&batch, &Hyperparameters::default(), &mut |_| {}),
            Err(FitError::Shape { .. })
        ));

        let factory = MlpFactory::default();
        let mut built = factory.build(3, 2);
        built.fit(&batch, &Hyperparameters::default(), &mut |_| {}).unwrap();
        assert_eq!(
            built.predict(&[1.0]),
            Err(PredictError::Dimension {
                expected: 3,
                found: 1
            })
        );
    }
}
