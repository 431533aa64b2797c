use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tracing::{debug, warn};

use super::{Extraction, FeatureSource, Frame, Landmark, SourceError, flatten_landmarks};
use crate::session::Mode;
use crate::smoothing::LandmarkSmoother;

/// Load state of a detector's feature source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Loading,
    Ready,
    Failed(String),
}

/// Outcome of one detection call.
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    Found {
        vector: Vec<f32>,
        landmarks: Option<Vec<Landmark>>,
    },
    /// Nothing detected in this frame.
    Miss,
    /// A previous detection on this detector has not finished.
    Busy,
    /// The source has not loaded (or failed to load).
    NotReady,
}

/// Per-detector flag preventing overlapping detection calls.
#[derive(Debug, Clone, Default)]
pub struct BusyFlag(Arc<AtomicBool>);

impl BusyFlag {
    /// Claim the flag, or `None` if a detection is already running.
    pub fn try_acquire(&self) -> Option<BusyGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(self.0.clone()))
    }

    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Clears the busy flag when dropped.
#[derive(Debug)]
pub struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A mode's feature source plus its readiness, busy flag and smoother.
pub struct Detector {
    mode: Mode,
    source: Box<dyn FeatureSource>,
    readiness: Readiness,
    busy: BusyFlag,
    smoother: Option<LandmarkSmoother>,
}

impl Detector {
    pub fn new(mode: Mode, source: Box<dyn FeatureSource>, smoother: Option<LandmarkSmoother>) -> Self {
        Self {
            mode,
            source,
            readiness: Readiness::Loading,
            busy: BusyFlag::default(),
            smoother,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn readiness(&self) -> &Readiness {
        &self.readiness
    }

    pub fn is_ready(&self) -> bool {
        self.readiness == Readiness::Ready
    }

    pub fn busy_flag(&self) -> BusyFlag {
        self.busy.clone()
    }

    /// Drop landmark filter state so the next frame starts fresh.
    pub fn reset_smoothing(&mut self) {
        if let Some(smoother) = self.smoother.as_mut() {
            smoother.reset();
        }
    }

    /// Load the source. Failure leaves the detector in [`Readiness::Failed`].
    pub fn initialize(&mut self) -> Result<(), SourceError> {
        self.readiness = Readiness::Loading;
        match self.source.init() {
            Ok(()) => {
                self.readiness = Readiness::Ready;
                Ok(())
            }
            Err(err) => {
                self.readiness = Readiness::Failed(err.to_string());
                Err(err)
            }
        }
    }

    /// Run the source on `frame`, smoothing landmark output when configured.
    pub fn detect(&mut self, frame: &Frame) -> Detection {
        if !self.is_ready() {
            return Detection::NotReady;
        }
        let Some(_guard) = self.busy.try_acquire() else {
            debug!(mode = %self.mode, "Detector busy; skipping frame");
            return Detection::Busy;
        };
        match self.source.extract(frame) {
            Ok(Some(Extraction::Features(vector))) if !vector.is_empty() => Detection::Found {
                vector,
                landmarks: None,
            },
            Ok(Some(Extraction::Landmarks(mut landmarks))) if !landmarks.is_empty() => {
                if let Some(smoother) = self.smoother.as_mut() {
                    smoother.smooth(frame.timestamp_ms, &mut landmarks);
                }
                Detection::Found {
                    vector: flatten_landmarks(&landmarks),
                    landmarks: Some(landmarks),
                }
            }
            Ok(_) => Detection::Miss,
            Err(err) => {
                warn!(mode = %self.mode, "Detection failed: {err}");
                Detection::Miss
            }
        }
    }
}
