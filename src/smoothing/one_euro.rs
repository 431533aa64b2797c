//! One-Euro filter: adaptive low-pass filter for noisy per-frame coordinates.
//!
//! Smooth when the signal is slow, responsive when it moves fast. The cutoff
//! frequency grows with the filtered speed of the signal.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Fixed per-stream filter parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OneEuroParams {
    /// Nominal sampling rate in Hz. Sets the smallest usable time step.
    pub freq: f64,
    /// Minimum cutoff frequency in Hz; lower is smoother at rest.
    pub min_cutoff: f64,
    /// Speed coefficient; higher means less lag during fast motion.
    pub beta: f64,
    /// Cutoff frequency for the derivative estimate in Hz.
    pub d_cutoff: f64,
}

impl Default for OneEuroParams {
    fn default() -> Self {
        Self {
            freq: 30.0,
            min_cutoff: 1.0,
            beta: 0.007,
            d_cutoff: 1.0,
        }
    }
}

impl OneEuroParams {
    /// Smallest time step in seconds, a thousandth of the nominal frame period.
    pub fn epsilon(&self) -> f64 {
        1e-3 / self.freq.max(f64::MIN_POSITIVE)
    }
}

/// Filter state for one scalar stream.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SmootherState {
    last_timestamp: f64,
    last_value: f64,
    last_derivative: f64,
}

/// One-Euro filter over a single scalar stream.
#[derive(Debug, Clone)]
pub struct OneEuroFilter {
    params: OneEuroParams,
    state: Option<SmootherState>,
}

impl OneEuroFilter {
    pub fn new(params: OneEuroParams) -> Self {
        Self {
            params,
            state: None,
        }
    }

    pub fn params(&self) -> &OneEuroParams {
        &self.params
    }

    /// Filter `x` observed at `t` seconds and return the smoothed value.
    pub fn filter(&mut self, t: f64, x: f64) -> f64 {
        let Some(prev) = self.state else {
            self.state = Some(SmootherState {
                last_timestamp: t,
                last_value: x,
                last_derivative: 0.0,
            });
            return x;
        };

        let dt = (t - prev.last_timestamp).max(self.params.epsilon());
        let dx = (x - prev.last_value) / dt;
        let alpha_d = smoothing_factor(dt, self.params.d_cutoff);
        let derivative = prev.last_derivative + alpha_d * (dx - prev.last_derivative);

        let cutoff = self.params.min_cutoff + self.params.beta * derivative.abs();
        let alpha = smoothing_factor(dt, cutoff);
        let value = prev.last_value + alpha * (x - prev.last_value);

        self.state = Some(SmootherState {
            last_timestamp: t,
            last_value: value,
            last_derivative: derivative,
        });
        value
    }

    /// Forget all history; the next sample passes through unchanged.
    pub fn reset(&mut self) {
        self.state = None;
    }

    pub fn is_primed(&self) -> bool {
        self.state.is_some()
    }
}

/// `1 / (1 + tau / dt)` with `tau = 1 / (2π·cutoff)`.
fn smoothing_factor(dt: f64, cutoff: f64) -> f64 {
    let tau = 1.0 / (2.0 * PI * cutoff.max(f64::MIN_POSITIVE));
    1.0 / (1.0 + tau / dt)
}
