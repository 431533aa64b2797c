use std::{
    cell::{Cell, RefCell},
    rc::Rc,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use teachable::features::{
    Extraction, FeatureSource, FeatureSourceProvider, Frame, FrameProvider, SourceError,
};
use teachable::ml::mlp::MlpFactory;
use teachable::ml::{
    EncodedBatch, EpochReport, FitError, Hyperparameters, ModelFactory, PredictError,
    TrainableModel,
};
use teachable::session::{
    ClassId, Mode, Prediction, SessionObserver, StatusTone, TrainingJob, TrainingSpawner,
    TrainingStatus,
};

/// The vector the fake source reports for the next frame; `None` is a miss.
pub type Feed = Rc<RefCell<Option<Vec<f32>>>>;

/// Camera that always has a tiny frame unless switched off.
#[derive(Clone)]
pub struct FakeCamera {
    pub on: Rc<Cell<bool>>,
}

impl FakeCamera {
    pub fn new() -> Self {
        Self {
            on: Rc::new(Cell::new(true)),
        }
    }
}

impl FrameProvider for FakeCamera {
    fn current_frame(&self) -> Option<Frame> {
        self.on
            .get()
            .then(|| Frame::image(0.0, 1, 1, vec![0u8, 0, 0, 255]))
    }
}

struct FeedSource {
    feed: Feed,
}

impl FeatureSource for FeedSource {
    fn init(&mut self) -> Result<(), SourceError> {
        Ok(())
    }

    fn extract(&mut self, _frame: &Frame) -> Result<Option<Extraction>, SourceError> {
        Ok(self.feed.borrow().clone().map(Extraction::Features))
    }
}

/// Hands every mode a source that replays the shared feed.
pub struct FeedSources {
    pub feed: Feed,
    pub built: Rc<RefCell<Vec<Mode>>>,
}

impl FeedSources {
    pub fn new(feed: Feed) -> Self {
        Self {
            feed,
            built: Rc::default(),
        }
    }
}

impl FeatureSourceProvider for FeedSources {
    fn source_for(&mut self, mode: Mode) -> Option<Box<dyn FeatureSource>> {
        self.built.borrow_mut().push(mode);
        Some(Box::new(FeedSource {
            feed: self.feed.clone(),
        }))
    }
}

/// Shared counters for [`CountingFactory`].
#[derive(Clone, Default)]
pub struct ModelCounters {
    pub built: Arc<AtomicUsize>,
    pub disposed: Arc<AtomicUsize>,
}

impl ModelCounters {
    pub fn built(&self) -> usize {
        self.built.load(Ordering::SeqCst)
    }

    pub fn disposed(&self) -> usize {
        self.disposed.load(Ordering::SeqCst)
    }
}

struct CountingModel {
    inner: Box<dyn TrainableModel>,
    counters: ModelCounters,
}

impl TrainableModel for CountingModel {
    fn fit(
        &mut self,
        batch: &EncodedBatch,
        params: &Hyperparameters,
        on_epoch: &mut dyn FnMut(EpochReport),
    ) -> Result<(), FitError> {
        self.inner.fit(batch, params, on_epoch)
    }

    fn predict(&self, features: &[f32]) -> Result<Vec<f32>, PredictError> {
        self.inner.predict(features)
    }

    fn dispose(&mut self) {
        self.counters.disposed.fetch_add(1, Ordering::SeqCst);
        self.inner.dispose();
    }

    fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }
}

/// MLP factory that counts builds and dispose calls.
pub struct CountingFactory {
    pub counters: ModelCounters,
}

impl ModelFactory for CountingFactory {
    fn build(&self, input_len: usize, n_classes: usize) -> Box<dyn TrainableModel> {
        self.counters.built.fetch_add(1, Ordering::SeqCst);
        Box::new(CountingModel {
            inner: MlpFactory::default().build(input_len, n_classes),
            counters: self.counters.clone(),
        })
    }
}

/// Holds jobs until the test releases them.
#[derive(Clone, Default)]
pub struct ParkedSpawner {
    pub jobs: Rc<RefCell<Vec<TrainingJob>>>,
}

impl ParkedSpawner {
    pub fn release_all(&self) {
        let jobs: Vec<TrainingJob> = self.jobs.borrow_mut().drain(..).collect();
        for job in jobs {
            job.run();
        }
    }
}

impl TrainingSpawner for ParkedSpawner {
    fn spawn(&self, job: TrainingJob) -> std::io::Result<()> {
        self.jobs.borrow_mut().push(job);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct Recorded {
    pub statuses: Vec<(String, StatusTone)>,
    pub modes: Vec<Mode>,
    pub counts: Vec<(ClassId, usize)>,
    pub epochs: Vec<EpochReport>,
    pub finished: Vec<(u64, TrainingStatus)>,
    pub predictions: Vec<Prediction>,
}

#[derive(Clone, Default)]
pub struct RecordingObserver {
    pub events: Rc<RefCell<Recorded>>,
}

impl SessionObserver for RecordingObserver {
    fn status(&mut self, text: &str, tone: StatusTone) {
        self.events
            .borrow_mut()
            .statuses
            .push((text.to_string(), tone));
    }

    fn mode_changed(&mut self, mode: Mode) {
        self.events.borrow_mut().modes.push(mode);
    }

    fn example_count(&mut self, class: ClassId, count: usize) {
        self.events.borrow_mut().counts.push((class, count));
    }

    fn training_progress(&mut self, report: &EpochReport) {
        self.events.borrow_mut().epochs.push(*report);
    }

    fn training_finished(&mut self, run_id: u64, status: &TrainingStatus) {
        self.events
            .borrow_mut()
            .finished
            .push((run_id, status.clone()));
    }

    fn prediction(&mut self, prediction: &Prediction) {
        self.events.borrow_mut().predictions.push(prediction.clone());
    }
}

/// Five samples per class in four dimensions, well separated.
pub fn two_class_rows() -> [Vec<Vec<f32>>; 2] {
    fn rows(f: fn(f32) -> Vec<f32>) -> Vec<Vec<f32>> {
        (0..5).map(|i| f(i as f32 * 0.05)).collect()
    }
    [
        rows(|j| vec![1.0 + j, 0.2 - j, 0.5 + j, 0.1]),
        rows(|j| vec![0.1 - j, 0.9 + j, 0.4, 0.8 - j]),
    ]
}

pub fn mean(rows: &[Vec<f32>]) -> Vec<f32> {
    let dim = rows[0].len();
    (0..dim)
        .map(|d| rows.iter().map(|row| row[d]).sum::<f32>() / rows.len() as f32)
        .collect()
}
