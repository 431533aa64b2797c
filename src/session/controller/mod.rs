//! Mode state machine and entry point for UI layers.

mod capture;
mod predict;
mod training;


use tracing::{debug, info, warn};

use super::collector::SampleCollector;
use super::dataset::{ClassId, ClassRegistry, Dataset};
use super::errors::SessionError;
use super::events::{NullObserver, SessionObserver, StatusTone};
use super::mode::Mode;
use super::prediction::PredictionLoop;
use super::state::SessionState;
use super::training::{ThreadSpawner, TrainingCoordinator, TrainingRun, TrainingSpawner};
use crate::config::SessionConfig;
use crate::features::{Detector, FeatureSourceProvider, FrameProvider, Readiness, SourceError};
use crate::ml::mlp::MlpFactory;
use crate::ml::{BufferLedger, ModelFactory, TrainableModel};
use crate::output::{NullOutput, OutputChannel, OutputGate};
use crate::smoothing::LandmarkSmoother;

/// Collaborators injected into a [`SessionController`].
pub struct SessionParts {
    pub frames: Box<dyn FrameProvider>,
    pub sources: Box<dyn FeatureSourceProvider>,
    /// Defaults to the bundled MLP head configured from `[training]`.
    pub models: Option<Box<dyn ModelFactory>>,
    pub output: Box<dyn OutputChannel>,
    pub observer: Box<dyn SessionObserver>,
    pub spawner: Box<dyn TrainingSpawner>,
}

impl SessionParts {
    pub fn new(frames: Box<dyn FrameProvider>, sources: Box<dyn FeatureSourceProvider>) -> Self {
        Self {
            frames,
            sources,
            models: None,
            output: Box::new(NullOutput),
            observer: Box::new(NullObserver),
            spawner: Box::new(ThreadSpawner),
        }
    }

    pub fn with_models(mut self, models: Box<dyn ModelFactory>) -> Self {
        self.models = Some(models);
        self
    }

    pub fn with_output(mut self, output: Box<dyn OutputChannel>) -> Self {
        self.output = output;
        self
    }

    pub fn with_observer(mut self, observer: Box<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_spawner(mut self, spawner: Box<dyn TrainingSpawner>) -> Self {
        self.spawner = spawner;
        self
    }
}

/// Top-level session: mode switching, capture, training and prediction.
///
/// Single-threaded; call [`SessionController::on_frame`] once per rendered
/// frame (or timer tick) to advance the loops and apply training results.
pub struct SessionController {
    config: SessionConfig,
    state: SessionState,
    frames: Box<dyn FrameProvider>,
    sources: Box<dyn FeatureSourceProvider>,
    models: Box<dyn ModelFactory>,
    output: Box<dyn OutputChannel>,
    observer: Box<dyn SessionObserver>,
    detector: Option<Detector>,
    collector: SampleCollector,
    training: TrainingCoordinator,
    prediction: PredictionLoop,
    gate: OutputGate,
    model: Option<Box<dyn TrainableModel>>,
}

impl SessionController {
    /// Build a session and activate the configured default mode.
    pub fn new(config: SessionConfig, parts: SessionParts) -> Self {
        let config = config.normalized();
        let models = parts
            .models
            .unwrap_or_else(|| Box::new(MlpFactory::new(config.training.mlp_options())));
        let classes = ClassRegistry::new(config.class_names.iter().cloned());
        let mut state = SessionState::new(config.default_mode, classes);
        state.reset_flags();
        let mut controller = Self {
            collector: SampleCollector::new(config.capture.landmark_sample_interval_ms),
            training: TrainingCoordinator::new(parts.spawner, config.training.seed),
            prediction: PredictionLoop::default(),
            gate: OutputGate::from_config(&config.output),
            state,
            frames: parts.frames,
            sources: parts.sources,
            models,
            output: parts.output,
            observer: parts.observer,
            detector: None,
            model: None,
            config,
        };
        info!(mode = %controller.state.current_mode, "Session started");
        controller.enter_mode();
        controller
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn mode(&self) -> Mode {
        self.state.current_mode
    }

    pub fn classes(&self) -> &ClassRegistry {
        &self.state.classes
    }

    pub fn dataset(&self) -> &Dataset {
        self.collector.dataset()
    }

    pub fn is_collecting(&self) -> bool {
        self.collector.is_running()
    }

    pub fn is_predicting(&self) -> bool {
        self.prediction.is_running()
    }

    pub fn is_training(&self) -> bool {
        self.training.is_running()
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub fn prediction_loop(&self) -> &PredictionLoop {
        &self.prediction
    }

    /// The in-flight run, or the last finished one.
    pub fn training_run(&self) -> Option<&TrainingRun> {
        self.training
            .active_run()
            .or_else(|| self.training.last_run())
    }

    pub fn buffer_ledger(&self) -> &BufferLedger {
        self.training.ledger()
    }

    pub fn source_readiness(&self) -> Option<&Readiness> {
        self.detector.as_ref().map(Detector::readiness)
    }

    /// Advance one frame: apply training messages, then run the loops.
    pub fn on_frame(&mut self, now_ms: f64) {
        self.poll_training();
        self.capture_tick(now_ms);
        self.prediction_tick(now_ms);
    }

    /// Select a mode. Re-selecting the current mode only republishes it.
    pub fn switch_mode(&mut self, mode: Mode) {
        if mode == self.state.current_mode {
            self.observer.mode_changed(mode);
            return;
        }
        info!(from = %self.state.current_mode, to = %mode, "Switching mode");
        self.stop_loops();
        if mode.profile().trainable {
            self.dispose_model();
        }
        self.clear_samples();
        self.state.current_mode = mode;
        self.state.reset_flags();
        self.enter_mode();
    }

    /// Drop samples, counts and the trained model but keep the mode.
    pub fn reset(&mut self) {
        info!(mode = %self.state.current_mode, "Resetting session");
        self.stop_loops();
        self.dispose_model();
        self.clear_samples();
        self.state.reset_flags();
        if let Some(detector) = self.detector.as_mut() {
            detector.reset_smoothing();
        }
        if self.state.predict_enabled {
            self.prediction.frame_loop.start(self.state.mode_generation);
        }
        self.set_status("Session reset", StatusTone::Idle);
    }

    /// Append a class. Any trained model no longer matches and is dropped.
    pub fn add_class(&mut self, name: impl Into<String>) -> ClassId {
        let id = self.state.classes.add(name);
        if self.model.is_some() || self.training.is_running() {
            info!(class = id, "Class added; trained model invalidated");
        }
        self.training.discard_active();
        self.dispose_model();
        if self.state.current_mode.profile().trainable {
            self.state.training_completed = false;
            self.state.predict_enabled = false;
            self.state.last_prediction = None;
            self.prediction.frame_loop.stop();
        }
        self.observer.example_count(id, 0);
        id
    }

    pub fn rename_class(&mut self, id: ClassId, name: impl Into<String>) -> Result<(), SessionError> {
        self.state
            .classes
            .rename(id, name)
            .map_err(|_| SessionError::UnknownClass(id))
    }

    /// Re-run feature source initialisation for the current mode.
    pub fn retry_source(&mut self) -> Result<(), SessionError> {
        let mode = self.state.current_mode;
        let result = match self.detector.as_mut() {
            Some(detector) if detector.mode() == mode => detector.initialize(),
            _ => return self.activate_source(mode),
        };
        self.report_source_init(mode, result)
    }

    /// Stop every loop and release the model and feature source.
    pub fn shutdown(&mut self) {
        info!("Shutting down session");
        self.stop_loops();
        self.state.predict_enabled = false;
        self.dispose_model();
        self.detector = None;
        self.set_status("Stopped", StatusTone::Idle);
    }

    fn set_status(&mut self, text: impl Into<String>, tone: StatusTone) {
        let text = text.into();
        self.observer.status(&text, tone);
    }

    /// Cancel both loops; stale iterations die at their next liveness check.
    fn stop_loops(&mut self) {
        self.state.bump_generation();
        self.state.gather_target = None;
        self.collector.frame_loop.stop();
        self.prediction.frame_loop.stop();
        self.training.discard_active();
    }

    fn clear_samples(&mut self) {
        self.collector.clear();
        self.state.classes.reset_counts();
        for id in 0..self.state.classes.len() {
            self.observer.example_count(id, 0);
        }
    }

    fn dispose_model(&mut self) {
        if let Some(mut model) = self.model.take() {
            model.dispose();
            debug!("Disposed trained model");
        }
    }

    /// Initialise the source for the current mode and start its loops.
    fn enter_mode(&mut self) {
        let mode = self.state.current_mode;
        let _ = self.activate_source(mode);
        if mode.profile().trainable {
            self.set_status(
                format!("{} mode: collect samples", mode.display_name()),
                StatusTone::Idle,
            );
        } else {
            self.state.predict_enabled = true;
            self.prediction.frame_loop.start(self.state.mode_generation);
            self.set_status(
                format!("{} mode: recognizing", mode.display_name()),
                StatusTone::Info,
            );
        }
        self.observer.mode_changed(mode);
    }

    fn activate_source(&mut self, mode: Mode) -> Result<(), SessionError> {
        self.detector = None;
        let Some(source) = self.sources.source_for(mode) else {
            warn!(%mode, "No feature source for mode");
            self.set_status(
                format!("No feature source for {} mode", mode.display_name()),
                StatusTone::Warning,
            );
            return Err(SessionError::NoSource(mode));
        };
        let smoother = (mode.is_landmark() && self.config.smoothing.enabled)
            .then(|| LandmarkSmoother::new(self.config.smoothing.params));
        let mut detector = Detector::new(mode, source, smoother);
        let result = detector.initialize();
        self.detector = Some(detector);
        self.report_source_init(mode, result)
    }

    fn report_source_init(
        &mut self,
        mode: Mode,
        result: Result<(), SourceError>,
    ) -> Result<(), SessionError> {
        match result {
            Ok(()) => {
                info!(%mode, "Feature source ready");
                Ok(())
            }
            Err(source) => {
                warn!(%mode, "Feature source failed to load: {source}");
                self.set_status(
                    format!("{} model failed to load: {source}", mode.display_name()),
                    StatusTone::Error,
                );
                Err(SessionError::ModelLoad { mode, source })
            }
        }
    }
}
