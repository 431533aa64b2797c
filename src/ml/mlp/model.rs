use crate::ml::metrics::softmax;

/// Weights of a one-hidden-layer ReLU network with input standardisation.
#[derive(Debug, Clone)]
pub struct MlpWeights {
    pub input_len: usize,
    pub n_classes: usize,
    pub hidden_size: usize,
    /// `hidden_size x input_len`, row-major.
    pub weights1: Vec<f32>,
    pub bias1: Vec<f32>,
    /// `n_classes x hidden_size`, row-major.
    pub weights2: Vec<f32>,
    pub bias2: Vec<f32>,
    pub feature_mean: Vec<f32>,
    pub feature_std: Vec<f32>,
}

impl MlpWeights {
    pub fn validate(&self) -> Result<(), String> {
        let input = self.input_len;
        let hidden = self.hidden_size;
        let classes = self.n_classes;
        if self.weights1.len() != input * hidden {
            return Err("weights1 length mismatch".to_string());
        }
        if self.bias1.len() != hidden {
            return Err("bias1 length mismatch".to_string());
        }
        if self.weights2.len() != classes * hidden {
            return Err("weights2 length mismatch".to_string());
        }
        if self.bias2.len() != classes {
            return Err("bias2 length mismatch".to_string());
        }
        if self.feature_mean.len() != input || self.feature_std.len() != input {
            return Err("feature statistics length mismatch".to_string());
        }
        Ok(())
    }

    pub fn normalize(&self, features: &[f32], out: &mut [f32]) {
        for (i, slot) in out.iter_mut().enumerate() {
            let std = self.feature_std[i].max(1e-6);
            *slot = (features[i] - self.feature_mean[i]) / std;
        }
    }

    /// Forward pass from normalized inputs; fills pre-activations, hidden
    /// activations and logits.
    pub fn forward(
        &self,
        normalized: &[f32],
        hidden_pre: &mut [f32],
        hidden_act: &mut [f32],
        logits: &mut [f32],
    ) {
        let input = self.input_len;
        let hidden = self.hidden_size;
        for h in 0..hidden {
            let base = h * input;
            let mut sum = self.bias1[h];
            for i in 0..input {
                sum += self.weights1[base + i] * normalized[i];
            }
            hidden_pre[h] = sum;
            hidden_act[h] = sum.max(0.0);
        }
        for c in 0..self.n_classes {
            let base = c * hidden;
            let mut sum = self.bias2[c];
            for h in 0..hidden {
                sum += self.weights2[base + h] * hidden_act[h];
            }
            logits[c] = sum;
        }
    }

    /// Probabilities for a raw feature vector of length `input_len`.
    pub fn predict_proba(&self, features: &[f32]) -> Vec<f32> {
        if features.len() != self.input_len || self.n_classes == 0 || self.hidden_size == 0 {
            return Vec::new();
        }
        let mut normalized = vec![0.0f32; self.input_len];
        self.normalize(features, &mut normalized);
        let mut hidden_pre = vec![0.0f32; self.hidden_size];
        let mut hidden_act = vec![0.0f32; self.hidden_size];
        let mut logits = vec![0.0f32; self.n_classes];
        self.forward(&normalized, &mut hidden_pre, &mut hidden_act, &mut logits);
        softmax(&logits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zeroed(input: usize, hidden: usize, classes: usize) -> MlpWeights {
        MlpWeights {
            input_len: input,
            n_classes: classes,
            hidden_size: hidden,
            weights1: vec![0.0; input * hidden],
            bias1: vec![0.0; hidden],
            weights2: vec![0.0; classes * hidden],
            bias2: vec![0.0; classes],
            feature_mean: vec![0.0; input],
            feature_std: vec![1.0; input],
        }
    }

    #[test]
    fn zero_weights_give_uniform_distribution() {
        let model = zeroed(3, 2, 4);
        assert!(model.validate().is_ok());
        let out = model.predict_proba(&[1.0, 2.0, 3.0]);
        assert_eq!(out.len(), 4);
        assert!(out.iter().all(|p| (p - 0.25).abs() < 1e-6));
    }

    #[test]
    fn wrong_length_input_yields_empty() {
        let model = zeroed(3, 2, 2);
        assert!(model.predict_proba(&[1.0]).is_empty());
    }

    #[test]
    fn validate_catches_shape_errors() {
        let mut model = zeroed(3, 2, 2);
        model.bias2.pop();
        assert!(model.validate().is_err());
    }
}
