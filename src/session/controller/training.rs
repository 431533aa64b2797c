use std::sync::mpsc::TryRecvError;

use tracing::{debug, info, warn};

use super::SessionController;
use crate::ml::{FitError, Hyperparameters, TrainableModel};
use crate::session::errors::SessionError;
use crate::session::events::StatusTone;
use crate::session::training::{StartError, TrainingMessage, TrainingStatus};

impl SessionController {
    /// Train a fresh classifier on a snapshot of the collected samples.
    ///
    /// Returns the run id; the result is applied on a later `on_frame`.
    /// Non-positive hyperparameters fall back to the configured defaults.
    pub fn train(&mut self, params: Hyperparameters) -> Result<u64, SessionError> {
        let mode = self.state.current_mode;
        if !mode.profile().trainable {
            return Err(SessionError::NotTrainable(mode));
        }
        if self.training.is_running() {
            return Err(SessionError::AlreadyTraining);
        }
        if self.collector.dataset().is_empty() {
            return Err(SessionError::InsufficientData);
        }
        let params = params.sanitized(&self.config.training.hyperparameters());
        self.state.gather_target = None;
        self.dispose_model();
        self.state.training_completed = false;
        self.state.predict_enabled = false;
        self.prediction.frame_loop.stop();

        let snapshot = self.collector.dataset().snapshot();
        let started = self.training.start(
            snapshot,
            self.state.classes.len(),
            params,
            self.models.as_ref(),
            self.state.mode_generation,
        );
        match started {
            Ok(run_id) => {
                self.set_status(
                    format!("Training for {} epochs", params.epochs),
                    StatusTone::Busy,
                );
                Ok(run_id)
            }
            Err(StartError::AlreadyTraining) => Err(SessionError::AlreadyTraining),
            Err(StartError::InsufficientData) => Err(SessionError::InsufficientData),
            Err(StartError::Spawn(err)) => {
                self.set_status(format!("Training failed to start: {err}"), StatusTone::Error);
                Err(SessionError::Spawn(err))
            }
        }
    }

    pub(super) fn poll_training(&mut self) {
        loop {
            let message = match self.training.try_recv() {
                Ok(message) => message,
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            };
            match message {
                TrainingMessage::Progress { run_id, report } => {
                    if self.training.record_progress(run_id, report) {
                        debug!(
                            run_id,
                            epoch = report.epoch,
                            loss = report.loss,
                            accuracy = report.accuracy,
                            "Training progress"
                        );
                        self.observer.training_progress(&report);
                    }
                }
                TrainingMessage::Finished { run_id, outcome } => {
                    self.finish_training(run_id, outcome);
                }
            }
        }
    }

    fn finish_training(
        &mut self,
        run_id: u64,
        outcome: Result<Box<dyn TrainableModel>, FitError>,
    ) {
        let generation = self.state.mode_generation;
        let stale = match self.training.active_run() {
            Some(run) if run.id == run_id => run.discarded || run.generation != generation,
            _ => true,
        };
        if stale {
            if let Ok(mut model) = outcome {
                model.dispose();
            }
            let status = TrainingStatus::Failed("discarded after session change".to_string());
            if self.training.finish(run_id, status.clone()).is_some() {
                info!(run_id, "Discarded stale training result");
                self.observer.training_finished(run_id, &status);
            }
            return;
        }

        match outcome {
            Ok(model) => {
                self.training.finish(run_id, TrainingStatus::Completed);
                self.model = Some(model);
                self.state.training_completed = true;
                self.state.predict_enabled = true;
                self.prediction.frame_loop.start(generation);
                info!(run_id, "Training complete");
                self.set_status("Training complete", StatusTone::Info);
                self.observer
                    .training_finished(run_id, &TrainingStatus::Completed);
            }
            Err(err) => {
                warn!(run_id, "Training failed: {err}");
                let status = TrainingStatus::Failed(err.to_string());
                self.training.finish(run_id, status.clone());
                self.set_status(format!("Training failed: {err}"), StatusTone::Error);
                self.observer.training_finished(run_id, &status);
            }
        }
    }
}
