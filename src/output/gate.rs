use tracing::{debug, warn};

use super::OutputChannel;
use crate::config::OutputConfig;
use crate::session::{LastSent, Mode, Prediction, SessionState};

/// Why a prediction was or was not forwarded.
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// Prediction disabled or the mode does not drive output.
    Inactive,
    Disconnected,
    NoPrediction,
    BelowThreshold,
    /// Same label as the last send, inside the cooldown window.
    CoolingDown,
    Sent(String),
    SendFailed,
}

/// Threshold plus per-label cooldown in front of an [`OutputChannel`].
#[derive(Debug, Clone)]
pub struct OutputGate {
    threshold: f32,
    cooldown_ms: f64,
    modes: Vec<Mode>,
}

impl OutputGate {
    pub fn new(threshold: f32, cooldown_ms: f64, modes: Vec<Mode>) -> Self {
        Self {
            threshold,
            cooldown_ms,
            modes,
        }
    }

    pub fn from_config(config: &OutputConfig) -> Self {
        Self::new(config.send_threshold, config.cooldown_ms, config.modes.clone())
    }

    pub fn drives(&self, mode: Mode) -> bool {
        self.modes.contains(&mode)
    }

    /// Forward `prediction` as `"{label}:{percent}"` when it clears the gate.
    ///
    /// Send failures are logged and never propagated.
    pub fn consider(
        &self,
        state: &mut SessionState,
        prediction: &Prediction,
        labels: &[String],
        channel: &mut dyn OutputChannel,
        now_ms: f64,
    ) -> GateDecision {
        if !state.predict_enabled || !self.drives(state.current_mode) {
            return GateDecision::Inactive;
        }
        if !channel.is_connected() {
            return GateDecision::Disconnected;
        }
        let (Some(best), Some(confidence)) = (prediction.best_index, prediction.confidence())
        else {
            return GateDecision::NoPrediction;
        };
        if confidence < self.threshold {
            return GateDecision::BelowThreshold;
        }
        let label = labels
            .get(best)
            .cloned()
            .unwrap_or_else(|| format!("Class {}", best + 1));
        if let Some(last) = &state.last_sent {
            if last.label == label && now_ms - last.at_ms < self.cooldown_ms {
                return GateDecision::CoolingDown;
            }
        }
        let message = format!("{label}:{}", (confidence * 100.0).round() as i32);
        // Recorded before dispatch: a failed send still starts the cooldown.
        state.last_sent = Some(LastSent {
            label,
            at_ms: now_ms,
        });
        match channel.send(&message) {
            Ok(()) => {
                debug!(%message, "Sent prediction to output channel");
                GateDecision::Sent(message)
            }
            Err(err) => {
                warn!("Output channel send failed: {err}");
                GateDecision::SendFailed
            }
        }
    }
}
