use tracing::{debug, warn};

use super::SessionController;
use crate::features::Detection;
use crate::session::prediction::Prediction;

impl SessionController {
    pub(super) fn prediction_tick(&mut self, now_ms: f64) {
        if !self.prediction.frame_loop.is_live(self.state.mode_generation) {
            return;
        }
        if !self.state.predict_enabled {
            self.prediction.frame_loop.stop();
            return;
        }
        let frame = self.frames.current_frame();
        self.state.preview_ready = frame.is_some();
        let Some(frame) = frame else {
            return;
        };
        let Some(detector) = self.detector.as_mut() else {
            return;
        };
        let detection = detector.detect(&frame);

        let profile = self.state.current_mode.profile();
        let run_model = profile.trainable && self.state.training_completed;
        match detection {
            Detection::Found { vector, landmarks } => {
                if let Some(landmarks) = landmarks.as_deref() {
                    if profile.overlay_landmarks {
                        self.observer.landmarks(landmarks);
                    }
                }
                if !run_model {
                    return;
                }
                let Some(model) = self.model.as_ref() else {
                    return;
                };
                match model.predict(&vector) {
                    Ok(distribution) => {
                        self.publish_prediction(Prediction::from_distribution(distribution), now_ms)
                    }
                    Err(err) => {
                        warn!("Prediction failed; skipping frame: {err}");
                        self.prediction.record_failure();
                    }
                }
            }
            Detection::Miss => {
                if run_model {
                    self.publish_prediction(Prediction::none(), now_ms);
                }
            }
            Detection::Busy | Detection::NotReady => {
                debug!("Prediction frame skipped; detector unavailable");
            }
        }
    }

    fn publish_prediction(&mut self, prediction: Prediction, now_ms: f64) {
        let padded = prediction.padded(self.state.classes.len());
        self.prediction.record_published();
        self.observer.prediction(&padded);
        if !prediction.is_none() {
            let labels = self.state.classes.display_names();
            self.gate.consider(
                &mut self.state,
                &prediction,
                &labels,
                self.output.as_mut(),
                now_ms,
            );
        }
        self.state.last_prediction = Some(padded);
    }
}
