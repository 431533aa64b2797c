//! Small numeric helpers shared by training and inference.

/// Index of the largest value; ties resolve to the first index.
///
/// Returns `None` for an empty slice or one containing only NaN.
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, &value) in values.iter().enumerate() {
        if value.is_nan() {
            continue;
        }
        match best {
            Some((_, best_val)) if value <= best_val => {}
            _ => best = Some((idx, value)),
        }
    }
    best.map(|(idx, _)| idx)
}

pub fn softmax(raw: &[f32]) -> Vec<f32> {
    let mut out = vec![0.0f32; raw.len()];
    softmax_inplace(raw, &mut out);
    out
}

pub fn softmax_inplace(raw: &[f32], out: &mut [f32]) {
    if raw.is_empty() || out.is_empty() {
        return;
    }
    let max = raw
        .iter()
        .copied()
        .fold(f32::NEG_INFINITY, |a, b| a.max(b));
    let mut sum = 0.0f32;
    for (slot, &v) in out.iter_mut().zip(raw) {
        let e = (v - max).exp();
        *slot = e;
        sum += e;
    }
    if sum == 0.0 || !sum.is_finite() {
        let uniform = 1.0 / (raw.len() as f32);
        out.iter_mut().for_each(|v| *v = uniform);
        return;
    }
    out.iter_mut().for_each(|v| *v /= sum);
}

/// Running loss/accuracy for one epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct EpochTally {
    loss_sum: f32,
    correct: usize,
    seen: usize,
}

impl EpochTally {
    /// Record one example given its predicted distribution and true class.
    pub fn record(&mut self, probs: &[f32], truth: usize) {
        let p = probs.get(truth).copied().unwrap_or(0.0).max(1e-7);
        self.loss_sum -= p.ln();
        if argmax(probs) == Some(truth) {
            self.correct += 1;
        }
        self.seen += 1;
    }

    /// Mean cross-entropy over recorded examples.
    pub fn loss(&self) -> f32 {
        if self.seen == 0 {
            0.0
        } else {
            self.loss_sum / self.seen as f32
        }
    }

    pub fn accuracy(&self) -> f32 {
        if self.seen == 0 {
            0.0
        } else {
            self.correct as f32 / self.seen as f32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argmax_prefers_first_on_ties() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4]), Some(1));
        assert_eq!(argmax(&[]), None);
        assert_eq!(argmax(&[f32::NAN, 0.1]), Some(1));
    }

    #[test]
    fn softmax_output_sums_to_one() {
        let out = softmax(&[1.0, 2.0, 3.0]);
        let sum: f32 = out.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(out[2] > out[1] && out[1] > out[0]);
    }

    #[test]
    fn tally_tracks_loss_and_accuracy() {
        let mut tally = EpochTally::default();
        tally.record(&[0.9, 0.1], 0);
        tally.record(&[0.9, 0.1], 1);
        assert_eq!(tally.accuracy(), 0.5);
        let expected = (-(0.9f32).ln() - (0.1f32).ln()) / 2.0;
        assert!((tally.loss() - expected).abs() < 1e-5);
    }
}
