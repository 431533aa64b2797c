//! Sensor frames and the feature-source capability consumed by the session.
//!
//! A [`FeatureSource`] turns one camera or microphone frame into either a
//! fixed-length embedding or a landmark set. Concrete model architectures live
//! behind this trait; the crate ships two small reference sources
//! ([`ThumbnailSource`], [`SpectrumSource`]).

mod detector;
mod spectrum;
mod thumbnail;

use std::sync::Arc;

use thiserror::Error;

use crate::session::Mode;

pub use detector::{BusyFlag, BusyGuard, Detection, Detector, Readiness};
pub use spectrum::SpectrumSource;
pub use thumbnail::ThumbnailSource;

/// One captured frame and the monotonic time it was captured at.
#[derive(Debug, Clone)]
pub struct Frame {
    pub timestamp_ms: f64,
    pub payload: FramePayload,
}

#[derive(Debug, Clone)]
pub enum FramePayload {
    /// Tightly packed RGBA8 pixels.
    Image {
        width: u32,
        height: u32,
        rgba: Arc<[u8]>,
    },
    /// Mono PCM window.
    Audio {
        sample_rate: u32,
        samples: Arc<[f32]>,
    },
}

impl Frame {
    pub fn image(timestamp_ms: f64, width: u32, height: u32, rgba: impl Into<Arc<[u8]>>) -> Self {
        Self {
            timestamp_ms,
            payload: FramePayload::Image {
                width,
                height,
                rgba: rgba.into(),
            },
        }
    }

    pub fn audio(timestamp_ms: f64, sample_rate: u32, samples: impl Into<Arc<[f32]>>) -> Self {
        Self {
            timestamp_ms,
            payload: FramePayload::Audio {
                sample_rate,
                samples: samples.into(),
            },
        }
    }
}

/// A tracked point in normalized image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Result of a successful extraction.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Features(Vec<f32>),
    Landmarks(Vec<Landmark>),
}

/// Flatten landmarks into `[x0, y0, z0, x1, ...]`.
pub fn flatten_landmarks(landmarks: &[Landmark]) -> Vec<f32> {
    landmarks
        .iter()
        .flat_map(|point| [point.x, point.y, point.z])
        .collect()
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Feature model failed to load: {detail}")]
    Load { detail: String },
    #[error("Feature extraction failed: {detail}")]
    Extract { detail: String },
    #[error("Frame kind not supported by this source")]
    UnsupportedFrame,
}

/// Feature extraction capability.
pub trait FeatureSource {
    /// Load models or assets. Called once per mode activation and on retry.
    fn init(&mut self) -> Result<(), SourceError>;

    /// Extract features from `frame`; `Ok(None)` means nothing was detected.
    fn extract(&mut self, frame: &Frame) -> Result<Option<Extraction>, SourceError>;
}

/// Live camera/microphone frames. Device lifecycle is owned elsewhere.
pub trait FrameProvider {
    /// Latest decoded frame, or `None` while the device has nothing ready.
    fn current_frame(&self) -> Option<Frame>;
}

/// Builds the feature source appropriate for a mode.
pub trait FeatureSourceProvider {
    fn source_for(&mut self, mode: Mode) -> Option<Box<dyn FeatureSource>>;
}
