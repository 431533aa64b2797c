//! Temporal smoothing for landmark streams.

mod one_euro;

pub use one_euro::{OneEuroFilter, OneEuroParams};

use crate::features::Landmark;

/// Smooths whole landmark sets, one filter per axis per tracked point.
///
/// Filters are created the first time a point index shows up and live until
/// [`LandmarkSmoother::reset`].
#[derive(Debug, Clone)]
pub struct LandmarkSmoother {
    params: OneEuroParams,
    points: Vec<[OneEuroFilter; 3]>,
}

impl LandmarkSmoother {
    pub fn new(params: OneEuroParams) -> Self {
        Self {
            params,
            points: Vec::new(),
        }
    }

    /// Smooth `landmarks` in place; `timestamp_ms` is the frame time.
    pub fn smooth(&mut self, timestamp_ms: f64, landmarks: &mut [Landmark]) {
        let t = timestamp_ms / 1000.0;
        while self.points.len() < landmarks.len() {
            let filter = OneEuroFilter::new(self.params);
            self.points.push([filter.clone(), filter.clone(), filter]);
        }
        for (point, filters) in landmarks.iter_mut().zip(self.points.iter_mut()) {
            let [fx, fy, fz] = filters;
            point.x = fx.filter(t, point.x as f64) as f32;
            point.y = fy.filter(t, point.y as f64) as f32;
            point.z = fz.filter(t, point.z as f64) as f32;
        }
    }

    /// Number of points with live filter state.
    pub fn tracked_points(&self) -> usize {
        self.points.len()
    }

    pub fn reset(&mut self) {
        self.points.clear();
    }
}
