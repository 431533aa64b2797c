//! Single-flight training runs executed off the frame tick.
//!
//! The coordinator hands a [`TrainingJob`] to a [`TrainingSpawner`]; the job
//! reports progress and its result over a channel that the controller drains
//! on every tick.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use super::dataset::DatasetSnapshot;
use crate::ml::{
    BufferLedger, EncodedBatch, EpochReport, FitError, Hyperparameters, ModelFactory,
    TrainableModel, encode_batch,
};

#[derive(Debug, Clone, PartialEq)]
pub enum TrainingStatus {
    Pending,
    Running,
    Completed,
    Failed(String),
}

/// Bookkeeping for one call to `train`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingRun {
    pub id: u64,
    pub params: Hyperparameters,
    pub current_epoch: usize,
    pub status: TrainingStatus,
    pub last_report: Option<EpochReport>,
    /// Mode generation the run was started in.
    pub generation: u64,
    /// Set when the session moved on; the result will be thrown away.
    pub discarded: bool,
}

pub enum TrainingMessage {
    Progress {
        run_id: u64,
        report: EpochReport,
    },
    Finished {
        run_id: u64,
        outcome: Result<Box<dyn TrainableModel>, FitError>,
    },
}

/// Work item owning the model and data for one fit.
pub struct TrainingJob {
    run_id: u64,
    snapshot: DatasetSnapshot,
    n_classes: usize,
    params: Hyperparameters,
    model: Box<dyn TrainableModel>,
    ledger: BufferLedger,
    tx: Sender<TrainingMessage>,
}

impl TrainingJob {
    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    /// Encode, fit and report. Transient buffers are released before the
    /// result is sent, whatever the outcome.
    pub fn run(self) {
        let TrainingJob {
            run_id,
            snapshot,
            n_classes,
            params,
            mut model,
            ledger,
            tx,
        } = self;
        let progress_tx = tx.clone();
        let mut on_epoch = |report: EpochReport| {
            let _ = progress_tx.send(TrainingMessage::Progress { run_id, report });
        };
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            fit_snapshot(
                model.as_mut(),
                &ledger,
                &snapshot,
                n_classes,
                &params,
                &mut on_epoch,
            )
        }))
        .unwrap_or_else(|payload| {
            let detail = panic_detail(payload.as_ref());
            warn!(run_id, "Training worker panicked: {detail}");
            Err(FitError::Panicked { detail })
        });
        let outcome = match result {
            Ok(()) => Ok(model),
            Err(err) => {
                model.dispose();
                Err(err)
            }
        };
        if tx.send(TrainingMessage::Finished { run_id, outcome }).is_err() {
            debug!(run_id, "Training result dropped; session is gone");
        }
    }
}

fn panic_detail(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|text| text.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

fn fit_snapshot(
    model: &mut dyn TrainableModel,
    ledger: &BufferLedger,
    snapshot: &DatasetSnapshot,
    n_classes: usize,
    params: &Hyperparameters,
    on_epoch: &mut dyn FnMut(EpochReport),
) -> Result<(), FitError> {
    let batch: EncodedBatch = encode_batch(ledger, &snapshot.features, &snapshot.labels, n_classes)?;
    model.fit(&batch, params, on_epoch)
}

/// Runs training jobs somewhere other than the frame tick.
pub trait TrainingSpawner {
    fn spawn(&self, job: TrainingJob) -> std::io::Result<()>;
}

/// Runs each job on a dedicated worker thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSpawner;

impl TrainingSpawner for ThreadSpawner {
    fn spawn(&self, job: TrainingJob) -> std::io::Result<()> {
        let name = format!("teachable-train-{}", job.run_id());
        std::thread::Builder::new()
            .name(name)
            .spawn(move || job.run())
            .map(|_| ())
    }
}

/// Runs jobs synchronously; results still arrive through the channel.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineSpawner;

impl TrainingSpawner for InlineSpawner {
    fn spawn(&self, job: TrainingJob) -> std::io::Result<()> {
        job.run();
        Ok(())
    }
}

/// Error returned by [`TrainingCoordinator::start`].
#[derive(Debug)]
pub enum StartError {
    AlreadyTraining,
    InsufficientData,
    Spawn(std::io::Error),
}

/// Owns the active run, the result channel and the buffer ledger.
pub struct TrainingCoordinator {
    spawner: Box<dyn TrainingSpawner>,
    ledger: BufferLedger,
    tx: Sender<TrainingMessage>,
    rx: Receiver<TrainingMessage>,
    active: Option<TrainingRun>,
    last: Option<TrainingRun>,
    next_run_id: u64,
    seed: u64,
}

impl TrainingCoordinator {
    pub fn new(spawner: Box<dyn TrainingSpawner>, seed: u64) -> Self {
        let (tx, rx) = channel();
        Self {
            spawner,
            ledger: BufferLedger::new(),
            tx,
            rx,
            active: None,
            last: None,
            next_run_id: 1,
            seed,
        }
    }

    pub fn ledger(&self) -> &BufferLedger {
        &self.ledger
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Whether a run started in `generation` is still in flight.
    pub fn is_running_in(&self, generation: u64) -> bool {
        self.active
            .as_ref()
            .is_some_and(|run| run.generation == generation && !run.discarded)
    }

    pub fn active_run(&self) -> Option<&TrainingRun> {
        self.active.as_ref()
    }

    /// The most recently finished run.
    pub fn last_run(&self) -> Option<&TrainingRun> {
        self.last.as_ref()
    }

    /// Start a run on a shuffled copy of `snapshot`.
    ///
    /// `model` must be freshly built for `snapshot`'s width and `n_classes`.
    pub fn start(
        &mut self,
        mut snapshot: DatasetSnapshot,
        n_classes: usize,
        params: Hyperparameters,
        factory: &dyn ModelFactory,
        generation: u64,
    ) -> Result<u64, StartError> {
        if self.active.is_some() {
            return Err(StartError::AlreadyTraining);
        }
        if snapshot.is_empty() {
            return Err(StartError::InsufficientData);
        }
        let run_id = self.next_run_id;
        self.next_run_id += 1;
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(run_id));
        snapshot.shuffle_pairs(&mut rng);
        let model = factory.build(snapshot.dim(), n_classes);
        info!(
            run_id,
            samples = snapshot.len(),
            dim = snapshot.dim(),
            classes = n_classes,
            epochs = params.epochs,
            batch_size = params.batch_size,
            "Starting training run"
        );
        let job = TrainingJob {
            run_id,
            snapshot,
            n_classes,
            params,
            model,
            ledger: self.ledger.clone(),
            tx: self.tx.clone(),
        };
        self.active = Some(TrainingRun {
            id: run_id,
            params,
            current_epoch: 0,
            status: TrainingStatus::Running,
            last_report: None,
            generation,
            discarded: false,
        });
        if let Err(err) = self.spawner.spawn(job) {
            warn!(run_id, "Failed to spawn training worker: {err}");
            if let Some(mut run) = self.active.take() {
                run.status = TrainingStatus::Failed(err.to_string());
                self.last = Some(run);
            }
            return Err(StartError::Spawn(err));
        }
        Ok(run_id)
    }

    /// Mark the active run so its result is disposed on arrival.
    pub fn discard_active(&mut self) {
        if let Some(run) = self.active.as_mut() {
            if !run.discarded {
                debug!(run_id = run.id, "Discarding in-flight training run");
            }
            run.discarded = true;
        }
    }

    pub(crate) fn try_recv(&self) -> Result<TrainingMessage, TryRecvError> {
        self.rx.try_recv()
    }

    /// Record progress for the active run. Returns `false` for stale messages.
    pub(crate) fn record_progress(&mut self, run_id: u64, report: EpochReport) -> bool {
        match self.active.as_mut() {
            Some(run) if run.id == run_id && !run.discarded => {
                run.current_epoch = report.epoch;
                run.last_report = Some(report);
                true
            }
            _ => false,
        }
    }

    /// Close out the active run; returns it when `run_id` matches.
    pub(crate) fn finish(&mut self, run_id: u64, status: TrainingStatus) -> Option<TrainingRun> {
        if self.active.as_ref().map(|run| run.id) != Some(run_id) {
            return None;
        }
        let mut run = self.active.take()?;
        run.status = status;
        self.last = Some(run.clone());
        Some(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::mlp::MlpFactory;
    use crate::ml::{PredictError, TrainableModel};

    fn snapshot() -> DatasetSnapshot {
        DatasetSnapshot {
            features: vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![0.1, 0.9], vec![0.9, 0.1]],
            labels: vec![0, 1, 0, 1],
        }
    }

    fn drain(coordinator: &TrainingCoordinator) -> Vec<TrainingMessage> {
        std::iter::from_fn(|| coordinator.try_recv().ok()).collect()
    }

    #[test]
    fn inline_run_reports_progress_then_result() {
        let mut coordinator = TrainingCoordinator::new(Box::new(InlineSpawner), 1);
        let params = Hyperparameters {
            epochs: 3,
            batch_size: 2,
            learning_rate: 0.01,
        };
        let run_id = coordinator
            .start(snapshot(), 2, params, &MlpFactory::default(), 0)
            .unwrap();
        assert!(coordinator.is_running());
        let messages = drain(&coordinator);
        assert_eq!(messages.len(), 4);
        let mut epochs = Vec::new();
        for message in messages {
            match message {
                TrainingMessage::Progress { run_id: id, report } => {
                    assert_eq!(id, run_id);
                    assert!(coordinator.record_progress(id, report));
                    epochs.push(report.epoch);
                }
                TrainingMessage::Finished { run_id: id, outcome } => {
                    assert!(outcome.is_ok());
                    let run = coordinator.finish(id, TrainingStatus::Completed).unwrap();
                    assert_eq!(run.current_epoch, 3);
                }
            }
        }
        assert_eq!(epochs, vec![1, 2, 3]);
        assert!(!coordinator.is_running());
        assert_eq!(coordinator.ledger().live(), 0);
        assert_eq!(coordinator.ledger().allocated(), 2);
    }

    #[test]
    fn rejects_empty_and_concurrent_runs() {
        struct Parked;
        impl TrainingSpawner for Parked {
            fn spawn(&self, _job: TrainingJob) -> std::io::Result<()> {
                Ok(())
            }
        }
        let mut coordinator = TrainingCoordinator::new(Box::new(Parked), 1);
        let empty = DatasetSnapshot {
            features: Vec::new(),
            labels: Vec::new(),
        };
        assert!(matches!(
            coordinator.start(empty, 2, Hyperparameters::default(), &MlpFactory::default(), 0),
            Err(StartError::InsufficientData)
        ));
        assert!(coordinator.active_run().is_none());

        let first = coordinator
            .start(snapshot(), 2, Hyperparameters::default(), &MlpFactory::default(), 0)
            .unwrap();
        assert!(matches!(
            coordinator.start(snapshot(), 2, Hyperparameters::default(), &MlpFactory::default(), 0),
            Err(StartError::AlreadyTraining)
        ));
        let active = coordinator.active_run().unwrap();
        assert_eq!(active.id, first);
        assert_eq!(active.status, TrainingStatus::Running);
    }

    struct Broken;

    impl TrainableModel for Broken {
        fn fit(
            &mut self,
            _batch: &EncodedBatch,
            _params: &Hyperparameters,
            _on_epoch: &mut dyn FnMut(EpochReport),
        ) -> Result<(), FitError> {
            Err(FitError::Diverged { epoch: 1 })
        }

        fn predict(&self, _features: &[f32]) -> Result<Vec<f32>, PredictError> {
            Err(PredictError::NotTrained)
        }

        fn dispose(&mut self) {}

        fn is_disposed(&self) -> bool {
            false
        }
    }

    struct BrokenFactory;

    impl ModelFactory for BrokenFactory {
        fn build(&self, _input_len: usize, _n_classes: usize) -> Box<dyn TrainableModel> {
            Box::new(Broken)
        }
    }

    #[test]
    fn failed_fit_still_releases_buffers() {
        let mut coordinator = TrainingCoordinator::new(Box::new(InlineSpawner), 1);
        coordinator
            .start(snapshot(), 2, Hyperparameters::default(), &BrokenFactory, 0)
            .unwrap();
        let finished = drain(&coordinator)
            .into_iter()
            .find_map(|message| match message {
                TrainingMessage::Finished { outcome, .. } => Some(outcome),
                TrainingMessage::Progress { .. } => None,
            })
            .unwrap();
        assert!(matches!(finished, Err(FitError::Diverged { .. })));
        assert_eq!(coordinator.ledger().live(), 0);
    }

    struct Exploding;

    impl TrainableModel for Exploding {
        fn fit(
            &mut self,
            _batch: &EncodedBatch,
            _params: &Hyperparameters,
            _on_epoch: &mut dyn FnMut(EpochReport),
        ) -> Result<(), FitError> {
            panic!("kernel exploded")
        }

        fn predict(&self, _features: &[f32]) -> Result<Vec<f32>, PredictError> {
            Err(PredictError::NotTrained)
        }

        fn dispose(&mut self) {}

        fn is_disposed(&self) -> bool {
            false
        }
    }

    struct ExplodingFactory;

    impl ModelFactory for ExplodingFactory {
        fn build(&self, _input_len: usize, _n_classes: usize) -> Box<dyn TrainableModel> {
            Box::new(Exploding)
        }
    }

    #[test]
    fn panicking_fit_still_reports_a_result() {
        let mut coordinator = TrainingCoordinator::new(Box::new(InlineSpawner), 1);
        coordinator
            .start(snapshot(), 2, Hyperparameters::default(), &ExplodingFactory, 0)
            .unwrap();
        let outcome = drain(&coordinator)
            .into_iter()
            .find_map(|message| match message {
                TrainingMessage::Finished { outcome, .. } => Some(outcome),
                TrainingMessage::Progress { .. } => None,
            })
            .unwrap();
        match outcome {
            Err(FitError::Panicked { detail }) => assert_eq!(detail, "kernel exploded"),
            _ => panic!("expected a panicked fit"),
        }
        assert_eq!(coordinator.ledger().live(), 0);
    }

    #[test]
    fn malformed_labels_fail_without_buffers() {
        let mut coordinator = TrainingCoordinator::new(Box::new(InlineSpawner), 1);
        let bad = DatasetSnapshot {
            features: vec![vec![1.0], vec![2.0]],
            labels: vec![0, 5],
        };
        coordinator
            .start(bad, 2, Hyperparameters::default(), &MlpFactory::default(), 0)
            .unwrap();
        let outcome = drain(&coordinator)
            .into_iter()
            .find_map(|message| match message {
                TrainingMessage::Finished { outcome, .. } => Some(outcome),
                TrainingMessage::Progress { .. } => None,
            })
            .unwrap();
        assert!(matches!(outcome, Err(FitError::Encode(_))));
        assert_eq!(coordinator.ledger().allocated(), 0);
    }

    #[test]
    fn discarded_run_stops_recording_progress() {
        let mut coordinator = TrainingCoordinator::new(Box::new(InlineSpawner), 1);
        let run_id = coordinator
            .start(snapshot(), 2, Hyperparameters::default(), &MlpFactory::default(), 3)
            .unwrap();
        assert!(coordinator.is_running_in(3));
        coordinator.discard_active();
        assert!(!coordinator.is_running_in(3));
        let report = EpochReport {
            epoch: 1,
            total_epochs: 20,
            loss: 0.5,
            accuracy: 1.0,
        };
        assert!(!coordinator.record_progress(run_id, report));
    }
}
