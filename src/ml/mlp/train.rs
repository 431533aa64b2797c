use rand::rngs::StdRng;
use rand::{Rng, SeedableRng, seq::SliceRandom};

use super::MlpWeights;
use crate::ml::metrics::{EpochTally, softmax_inplace};
use crate::ml::{EncodedBatch, EpochReport, FitError, Hyperparameters};

/// Architecture and regularisation knobs that are not per-run hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MlpOptions {
    pub hidden_size: usize,
    pub l2_penalty: f32,
    pub seed: u64,
}

impl Default for MlpOptions {
    fn default() -> Self {
        Self {
            hidden_size: 128,
            l2_penalty: 1e-4,
            seed: 42,
        }
    }
}

const BETA1: f32 = 0.9;
const BETA2: f32 = 0.999;
const ADAM_EPS: f32 = 1e-8;

/// First and second moment estimates for one parameter buffer.
struct AdamSlot {
    m: Vec<f32>,
    v: Vec<f32>,
}

impl AdamSlot {
    fn new(len: usize) -> Self {
        Self {
            m: vec![0.0; len],
            v: vec![0.0; len],
        }
    }

    fn step(&mut self, params: &mut [f32], grads: &[f32], lr: f32, l2: f32, t: i32) {
        let correct1 = 1.0 - BETA1.powi(t);
        let correct2 = 1.0 - BETA2.powi(t);
        for i in 0..params.len() {
            let g = grads[i] + l2 * params[i];
            self.m[i] = BETA1 * self.m[i] + (1.0 - BETA1) * g;
            self.v[i] = BETA2 * self.v[i] + (1.0 - BETA2) * g * g;
            let m_hat = self.m[i] / correct1;
            let v_hat = self.v[i] / correct2;
            params[i] -= lr * m_hat / (v_hat.sqrt() + ADAM_EPS);
        }
    }
}

/// Train a fresh network on `batch` with mini-batch Adam.
pub fn train_mlp(
    batch: &EncodedBatch,
    params: &Hyperparameters,
    options: &MlpOptions,
    on_epoch: &mut dyn FnMut(EpochReport),
) -> Result<MlpWeights, FitError> {
    let n = batch.len();
    let d = batch.feature_len();
    let n_classes = batch.n_classes();
    let hidden = options.hidden_size.max(1);
    let batch_size = params.batch_size.max(1);
    let mut rng = StdRng::seed_from_u64(options.seed);

    let (feature_mean, feature_std) = feature_mean_std(batch, d);
    let mut weights = MlpWeights {
        input_len: d,
        n_classes,
        hidden_size: hidden,
        weights1: uniform(&mut rng, hidden * d, (6.0 / d.max(1) as f32).sqrt()),
        bias1: vec![0.0; hidden],
        weights2: uniform(
            &mut rng,
            n_classes * hidden,
            (6.0 / (hidden + n_classes) as f32).sqrt(),
        ),
        bias2: vec![0.0; n_classes],
        feature_mean,
        feature_std,
    };

    let mut adam_w1 = AdamSlot::new(weights.weights1.len());
    let mut adam_b1 = AdamSlot::new(hidden);
    let mut adam_w2 = AdamSlot::new(weights.weights2.len());
    let mut adam_b2 = AdamSlot::new(n_classes);
    let mut step = 0i32;

    let mut indices: Vec<usize> = (0..n).collect();
    let mut x_norm = vec![0.0f32; d];
    let mut hidden_pre = vec![0.0f32; hidden];
    let mut hidden_act = vec![0.0f32; hidden];
    let mut logits = vec![0.0f32; n_classes];
    let mut probs = vec![0.0f32; n_classes];
    let mut d_hidden = vec![0.0f32; hidden];

    for epoch in 0..params.epochs {
        indices.shuffle(&mut rng);
        let mut tally = EpochTally::default();
        for chunk in indices.chunks(batch_size) {
            let mut d_w1 = vec![0.0f32; weights.weights1.len()];
            let mut d_b1 = vec![0.0f32; hidden];
            let mut d_w2 = vec![0.0f32; weights.weights2.len()];
            let mut d_b2 = vec![0.0f32; n_classes];
            let scale = 1.0 / chunk.len() as f32;

            for &idx in chunk {
                weights.normalize(batch.features.row(idx), &mut x_norm);
                weights.forward(&x_norm, &mut hidden_pre, &mut hidden_act, &mut logits);
                softmax_inplace(&logits, &mut probs);
                let target = batch.one_hot.row(idx);
                tally.record(&probs, batch.label(idx));

                d_hidden.iter_mut().for_each(|v| *v = 0.0);
                for c in 0..n_classes {
                    let dz2 = (probs[c] - target[c]) * scale;
                    d_b2[c] += dz2;
                    let base = c * hidden;
                    for h in 0..hidden {
                        d_w2[base + h] += dz2 * hidden_act[h];
                        d_hidden[h] += dz2 * weights.weights2[base + h];
                    }
                }
                for h in 0..hidden {
                    if hidden_pre[h] <= 0.0 {
                        continue;
                    }
                    d_b1[h] += d_hidden[h];
                    let base = h * d;
                    for i in 0..d {
                        d_w1[base + i] += d_hidden[h] * x_norm[i];
                    }
                }
            }

            step += 1;
            let lr = params.learning_rate;
            let l2 = options.l2_penalty;
            adam_w1.step(&mut weights.weights1, &d_w1, lr, l2, step);
            adam_b1.step(&mut weights.bias1, &d_b1, lr, 0.0, step);
            adam_w2.step(&mut weights.weights2, &d_w2, lr, l2, step);
            adam_b2.step(&mut weights.bias2, &d_b2, lr, 0.0, step);
        }

        let loss = tally.loss();
        if !loss.is_finite() {
            return Err(FitError::Diverged { epoch: epoch + 1 });
        }
        on_epoch(EpochReport {
            epoch: epoch + 1,
            total_epochs: params.epochs,
            loss,
            accuracy: tally.accuracy(),
        });
    }

    Ok(weights)
}

fn uniform(rng: &mut StdRng, len: usize, limit: f32) -> Vec<f32> {
    (0..len)
        .map(|_| (rng.random::<f32>() * 2.0 - 1.0) * limit)
        .collect()
}

fn feature_mean_std(batch: &EncodedBatch, d: usize) -> (Vec<f32>, Vec<f32>) {
    let n = batch.len().max(1) as f32;
    let mut mean = vec![0.0f32; d];
    for row in 0..batch.len() {
        for (slot, value) in mean.iter_mut().zip(batch.features.row(row)) {
            *slot += value;
        }
    }
    for v in &mut mean {
        *v /= n;
    }

    let mut std = vec![0.0f32; d];
    for row in 0..batch.len() {
        for (i, value) in batch.features.row(row).iter().enumerate() {
            let diff = value - mean[i];
            std[i] += diff * diff;
        }
    }
    for v in &mut std {
        *v = (*v / n).sqrt();
    }
    (mean, std)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::{BufferLedger, encode_batch};

    fn separable() -> (Vec<Vec<f32>>, Vec<usize>) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..6 {
            let j = i as f32 * 0.05;
            features.push(vec![1.0 + j, 0.2 - j, 0.5]);
            labels.push(0);
            features.push(vec![0.1 - j, 0.9 + j, 0.4]);
            labels.push(1);
        }
        (features, labels)
    }

    #[test]
    fn reports_every_epoch_and_learns() {
        let (features, labels) = separable();
        let ledger = BufferLedger::new();
        let batch = encode_batch(&ledger, &features, &labels, 2).unwrap();
        let params = Hyperparameters {
            epochs: 15,
            batch_size: 4,
            learning_rate: 0.01,
        };
        let mut reports = Vec::new();
        let weights = train_mlp(&batch, &params, &MlpOptions::default(), &mut |r| {
            reports.push(r)
        })
        .unwrap();
        assert_eq!(reports.len(), 15);
        assert_eq!(reports[14].epoch, 15);
        assert!(reports[14].loss < reports[0].loss);
        assert_eq!(reports[14].accuracy, 1.0);
        assert!(weights.validate().is_ok());
        assert!(weights.predict_proba(&features[0])[0] > 0.5);
        assert!(weights.predict_proba(&features[1])[1] > 0.5);
    }

    #[test]
    fn same_seed_same_weights() {
        let (features, labels) = separable();
        let ledger = BufferLedger::new();
        let batch = encode_batch(&ledger, &features, &labels, 2).unwrap();
        let params = Hyperparameters::default();
        let a = train_mlp(&batch, &params, &MlpOptions::default(), &mut |_| {}).unwrap();
        let b = train_mlp(&batch, &params, &MlpOptions::default(), &mut |_| {}).unwrap();
        assert_eq!(a.weights1, b.weights1);
        assert_eq!(a.bias2, b.bias2);
    }
}
