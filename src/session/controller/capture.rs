use tracing::debug;

use super::SessionController;
use crate::session::dataset::ClassId;
use crate::session::errors::SessionError;

impl SessionController {
    /// Start storing samples for `class` on every frame.
    ///
    /// Rejected while a run is in flight or after training completed.
    pub fn start_collecting(&mut self, class: ClassId) -> Result<(), SessionError> {
        let mode = self.state.current_mode;
        if !mode.profile().trainable {
            return Err(SessionError::NotTrainable(mode));
        }
        if self.state.training_completed || self.training.is_running_in(self.state.mode_generation)
        {
            debug!(class, "Ignoring collect request; training started");
            return Err(SessionError::CollectionLocked);
        }
        if !self.state.classes.contains(class) {
            return Err(SessionError::UnknownClass(class));
        }
        self.state.gather_target = Some(class);
        if self.collector.frame_loop.start(self.state.mode_generation) {
            debug!(class, "Capture loop started");
        }
        Ok(())
    }

    /// Stop storing samples; the capture loop ends on its next iteration.
    pub fn stop_collecting(&mut self) {
        self.state.gather_target = None;
    }

    pub(super) fn capture_tick(&mut self, now_ms: f64) {
        if !self.collector.frame_loop.is_live(self.state.mode_generation) {
            return;
        }
        let mode = self.state.current_mode;
        let (control, step) = self.collector.step(
            now_ms,
            self.state.gather_target,
            self.frames.as_ref(),
            self.detector.as_mut(),
            &mut self.state.classes,
            mode.is_landmark(),
        );
        self.collector.frame_loop.apply(control);
        if let Some(landmarks) = step.landmarks.as_deref() {
            if mode.profile().overlay_landmarks {
                self.observer.landmarks(landmarks);
            }
        }
        if let Some((class, count)) = step.captured {
            self.observer.example_count(class, count);
        }
    }
}
