//! Capture, train and predict engine for teachable-machine style sessions.
//!
//! The [`session::SessionController`] owns the mode state machine and drives
//! sample collection, background training and live prediction from a
//! per-frame tick. Feature extraction, frame capture and the output channel
//! are injected through the traits in [`features`] and [`output`].

/// Config and log directory resolution.
pub mod app_dirs;
/// `config.toml` model and persistence.
pub mod config;
/// Frames, feature sources and the per-mode detector.
pub mod features;
/// Tracing subscriber setup.
pub mod logging;
/// Trainable classification head and tensor bookkeeping.
pub mod ml;
/// Output channel and the threshold/cooldown gate in front of it.
pub mod output;
/// Session controller, capture and prediction loops.
pub mod session;
/// One-Euro landmark smoothing.
pub mod smoothing;
