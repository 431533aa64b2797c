//! Transient training buffers with scoped release.
//!
//! Every [`Tensor`] registers itself with a [`BufferLedger`] when created and
//! deregisters on drop, so a leak on any exit path shows up as a non-zero
//! [`BufferLedger::live`] count.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use thiserror::Error;

/// Shared counter of live and total transient buffers.
#[derive(Debug, Clone, Default)]
pub struct BufferLedger {
    inner: Arc<LedgerCounts>,
}

#[derive(Debug, Default)]
struct LedgerCounts {
    live: AtomicUsize,
    allocated: AtomicUsize,
}

impl BufferLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffers currently alive.
    pub fn live(&self) -> usize {
        self.inner.live.load(Ordering::Acquire)
    }

    /// Buffers ever allocated through this ledger.
    pub fn allocated(&self) -> usize {
        self.inner.allocated.load(Ordering::Acquire)
    }

    fn acquire(&self) {
        self.inner.live.fetch_add(1, Ordering::AcqRel);
        self.inner.allocated.fetch_add(1, Ordering::AcqRel);
    }

    fn release(&self) {
        self.inner.live.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Row-major 2-D `f32` buffer tracked by a [`BufferLedger`].
#[derive(Debug)]
pub struct Tensor {
    data: Vec<f32>,
    rows: usize,
    cols: usize,
    ledger: BufferLedger,
}

impl Tensor {
    fn new(ledger: &BufferLedger, rows: usize, cols: usize, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), rows * cols);
        ledger.acquire();
        Self {
            data,
            rows,
            cols,
            ledger: ledger.clone(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, index: usize) -> &[f32] {
        let start = index * self.cols;
        &self.data[start..start + self.cols]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

impl Drop for Tensor {
    fn drop(&mut self) {
        self.ledger.release();
    }
}

/// Stacked features plus one-hot targets for a single fit call.
#[derive(Debug)]
pub struct EncodedBatch {
    pub features: Tensor,
    pub one_hot: Tensor,
}

impl EncodedBatch {
    pub fn len(&self) -> usize {
        self.features.rows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn feature_len(&self) -> usize {
        self.features.cols()
    }

    pub fn n_classes(&self) -> usize {
        self.one_hot.cols()
    }

    /// Class index encoded in row `index`.
    pub fn label(&self, index: usize) -> usize {
        self.one_hot
            .row(index)
            .iter()
            .position(|v| *v > 0.5)
            .unwrap_or(0)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum BufferError {
    #[error("Cannot encode an empty dataset")]
    Empty,
    #[error("Feature and label counts differ ({features} vs {labels})")]
    LengthMismatch { features: usize, labels: usize },
    #[error("Row {row} has {found} features, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Label {label} is outside 0..{classes}")]
    LabelOutOfRange { label: usize, classes: usize },
}

/// Stack `features` and one-hot encode `labels` into ledger-tracked tensors.
///
/// Nothing stays registered with the ledger when this returns an error.
pub fn encode_batch(
    ledger: &BufferLedger,
    features: &[Vec<f32>],
    labels: &[usize],
    n_classes: usize,
) -> Result<EncodedBatch, BufferError> {
    if features.len() != labels.len() {
        return Err(BufferError::LengthMismatch {
            features: features.len(),
            labels: labels.len(),
        });
    }
    let Some(first) = features.first() else {
        return Err(BufferError::Empty);
    };
    let dim = first.len();
    let mut stacked = Vec::with_capacity(features.len() * dim);
    for (row, values) in features.iter().enumerate() {
        if values.len() != dim || dim == 0 {
            return Err(BufferError::RaggedRow {
                row,
                expected: dim,
                found: values.len(),
            });
        }
        stacked.extend_from_slice(values);
    }
    let mut one_hot = vec![0.0f32; labels.len() * n_classes];
    for (row, &label) in labels.iter().enumerate() {
        if label >= n_classes {
            return Err(BufferError::LabelOutOfRange {
                label,
                classes: n_classes,
            });
        }
        one_hot[row * n_classes + label] = 1.0;
    }
    let features = Tensor::new(ledger, features.len(), dim, stacked);
    let one_hot = Tensor::new(ledger, labels.len(), n_classes, one_hot);
    Ok(EncodedBatch { features, one_hot })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_registers_and_drop_releases() {
        let ledger = BufferLedger::new();
        let batch = encode_batch(&ledger, &[vec![1.0, 2.0], vec![3.0, 4.0]], &[1, 0], 3).unwrap();
        assert_eq!(ledger.live(), 2);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.feature_len(), 2);
        assert_eq!(batch.one_hot.row(0), &[0.0, 1.0, 0.0]);
        assert_eq!(batch.label(1), 0);
        drop(batch);
        assert_eq!(ledger.live(), 0);
        assert_eq!(ledger.allocated(), 2);
    }

    #[test]
    fn malformed_input_allocates_nothing() {
        let ledger = BufferLedger::new();
        assert_eq!(
            encode_batch(&ledger, &[vec![1.0], vec![1.0, 2.0]], &[0, 0], 2).unwrap_err(),
            BufferError::RaggedRow {
                row: 1,
                expected: 1,
                found: 2
            }
        );
        assert_eq!(
            encode_batch(&ledger, &[vec![1.0]], &[4], 2).unwrap_err(),
            BufferError::LabelOutOfRange {
                label: 4,
                classes: 2
            }
        );
        assert_eq!(
            encode_batch(&ledger, &[], &[], 2).unwrap_err(),
            BufferError::Empty
        );
        assert_eq!(ledger.allocated(), 0);
    }
}
