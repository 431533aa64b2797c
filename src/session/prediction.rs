use crate::ml::metrics::argmax;
use crate::session::scheduler::FrameLoop;

/// One published classification.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Prediction {
    pub distribution: Vec<f32>,
    /// Arg-max of `distribution`; `None` when nothing was detected.
    pub best_index: Option<usize>,
}

impl Prediction {
    /// The explicit "no prediction" value published on a detection miss.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_distribution(distribution: Vec<f32>) -> Self {
        let best_index = argmax(&distribution);
        Self {
            distribution,
            best_index,
        }
    }

    pub fn is_none(&self) -> bool {
        self.best_index.is_none()
    }

    pub fn confidence(&self) -> Option<f32> {
        self.best_index
            .and_then(|idx| self.distribution.get(idx).copied())
    }

    /// Copy with the distribution resized to `n_classes`, missing entries 0.
    pub fn padded(&self, n_classes: usize) -> Self {
        let mut distribution = self.distribution.clone();
        distribution.resize(n_classes, 0.0);
        Self {
            best_index: self.best_index.filter(|idx| *idx < n_classes),
            distribution,
        }
    }
}

/// Continuous inference loop state.
#[derive(Debug, Default)]
pub struct PredictionLoop {
    pub(crate) frame_loop: FrameLoop,
    published: u64,
    failures: u64,
}

impl PredictionLoop {
    pub fn is_running(&self) -> bool {
        self.frame_loop.is_running()
    }

    /// Predictions published since the session started.
    pub fn published(&self) -> u64 {
        self.published
    }

    /// Frames skipped because the model failed to predict.
    pub fn failures(&self) -> u64 {
        self.failures
    }

    pub(crate) fn record_published(&mut self) {
        self.published += 1;
    }

    pub(crate) fn record_failure(&mut self) {
        self.failures += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_index_uses_first_maximum() {
        let prediction = Prediction::from_distribution(vec![0.1, 0.45, 0.45]);
        assert_eq!(prediction.best_index, Some(1));
        assert_eq!(prediction.confidence(), Some(0.45));
    }

    #[test]
    fn none_has_no_confidence() {
        let none = Prediction::none();
        assert!(none.is_none());
        assert_eq!(none.confidence(), None);
        assert_eq!(none.padded(3).distribution, vec![0.0; 3]);
    }

    #[test]
    fn padding_truncates_and_extends() {
        let prediction = Prediction::from_distribution(vec![0.2, 0.8]);
        assert_eq!(prediction.padded(3).distribution, vec![0.2, 0.8, 0.0]);
        let shrunk = prediction.padded(1);
        assert_eq!(shrunk.distribution, vec![0.2]);
        assert_eq!(shrunk.best_index, None);
    }
}
