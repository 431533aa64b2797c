use tracing::debug;

use super::dataset::{ClassId, ClassRegistry, Dataset, Sample};
use super::scheduler::{FrameLoop, LoopControl};
use crate::features::{Detection, Detector, FrameProvider, Landmark};

/// Result of one capture iteration.
#[derive(Debug, Default)]
pub struct CaptureStep {
    /// Class and its new count when a sample was stored.
    pub captured: Option<(ClassId, usize)>,
    /// Landmarks seen this frame, for overlays.
    pub landmarks: Option<Vec<Landmark>>,
}

/// Frame-synchronous sample acquisition into the owned [`Dataset`].
#[derive(Debug)]
pub struct SampleCollector {
    pub(crate) frame_loop: FrameLoop,
    dataset: Dataset,
    min_interval_ms: f64,
    last_sample_ms: Option<f64>,
}

impl SampleCollector {
    /// `min_interval_ms` applies to landmark modes only.
    pub fn new(min_interval_ms: f64) -> Self {
        Self {
            frame_loop: FrameLoop::default(),
            dataset: Dataset::default(),
            min_interval_ms,
            last_sample_ms: None,
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn is_running(&self) -> bool {
        self.frame_loop.is_running()
    }

    pub fn clear(&mut self) {
        self.dataset.clear();
        self.last_sample_ms = None;
    }

    /// One iteration of the capture loop.
    ///
    /// Stops when there is no target or no frame; frame-level misses keep
    /// the loop alive.
    pub fn step(
        &mut self,
        now_ms: f64,
        gather_target: Option<ClassId>,
        frames: &dyn FrameProvider,
        detector: Option<&mut Detector>,
        classes: &mut ClassRegistry,
        throttle: bool,
    ) -> (LoopControl, CaptureStep) {
        let mut step = CaptureStep::default();
        let Some(target) = gather_target else {
            return (LoopControl::Stop, step);
        };
        let Some(frame) = frames.current_frame() else {
            debug!("Capture source has no frame; stopping capture loop");
            return (LoopControl::Stop, step);
        };
        let Some(detector) = detector else {
            return (LoopControl::Continue, step);
        };
        let Detection::Found { vector, landmarks } = detector.detect(&frame) else {
            return (LoopControl::Continue, step);
        };
        step.landmarks = landmarks;

        if throttle {
            if let Some(last) = self.last_sample_ms {
                if now_ms - last < self.min_interval_ms {
                    return (LoopControl::Continue, step);
                }
            }
        }
        if !classes.contains(target) {
            return (LoopControl::Stop, step);
        }
        if let Err(err) = self.dataset.push(Sample {
            features: vector,
            label: target,
        }) {
            debug!("Dropping sample: {err}");
            return (LoopControl::Continue, step);
        }
        self.last_sample_ms = Some(now_ms);
        step.captured = classes.increment(target).map(|count| (target, count));
        (LoopControl::Continue, step)
    }
}
