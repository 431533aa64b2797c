//! Headless demo session.
//!
//! Collects two synthetic camera scenes, trains on them in the background and
//! writes gated predictions (`label:confidence`) to stdout.

use std::cell::Cell;
use std::rc::Rc;
use std::thread;
use std::time::Duration;

use teachable::config::{self, SessionConfig};
use teachable::features::{
    FeatureSource, FeatureSourceProvider, Frame, FrameProvider, SpectrumSource, ThumbnailSource,
};
use teachable::logging;
use teachable::ml::EpochReport;
use teachable::output::WriterOutput;
use teachable::session::{
    Mode, SessionController, SessionObserver, SessionParts, StatusTone, TrainingStatus,
};
use tracing::{debug, error, info, warn};

const FRAME_MS: f64 = 33.0;
const FRAME_SIDE: u32 = 32;
const SAMPLES_PER_CLASS: usize = 24;
const PREDICT_FRAMES: usize = 120;

/// Renders one of two scenes: a bright left half or a bright right half.
struct SyntheticCamera {
    scene: Rc<Cell<usize>>,
    clock: Rc<Cell<f64>>,
}

impl FrameProvider for SyntheticCamera {
    fn current_frame(&self) -> Option<Frame> {
        let scene = self.scene.get();
        let t = self.clock.get();
        let jitter = (t / FRAME_MS) as u32;
        let mut rgba = Vec::with_capacity((FRAME_SIDE * FRAME_SIDE * 4) as usize);
        for y in 0..FRAME_SIDE {
            for x in 0..FRAME_SIDE {
                let lit = (x < FRAME_SIDE / 2) == (scene == 0);
                let noise = ((x + y + jitter) % 7) as u8 * 4;
                let value = if lit { 220 - noise } else { 20 + noise };
                rgba.extend_from_slice(&[value, value, value, 255]);
            }
        }
        Some(Frame::image(t, FRAME_SIDE, FRAME_SIDE, rgba))
    }
}

/// The reference sources shipped with the crate.
struct BundledSources;

impl FeatureSourceProvider for BundledSources {
    fn source_for(&mut self, mode: Mode) -> Option<Box<dyn FeatureSource>> {
        match mode {
            Mode::Image => Some(Box::new(ThumbnailSource::default())),
            Mode::Audio => Some(Box::new(SpectrumSource::default())),
            _ => None,
        }
    }
}

struct LogObserver;

impl SessionObserver for LogObserver {
    fn status(&mut self, text: &str, tone: StatusTone) {
        match tone {
            StatusTone::Error => error!("{text}"),
            StatusTone::Warning => warn!("{text}"),
            _ => info!("{text}"),
        }
    }

    fn example_count(&mut self, class: usize, count: usize) {
        debug!(class, count, "Example count");
    }

    fn training_progress(&mut self, report: &EpochReport) {
        info!(
            epoch = report.epoch,
            total = report.total_epochs,
            loss = report.loss,
            accuracy = report.accuracy,
            "Epoch finished"
        );
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }
    let config = match config::load_or_default() {
        Ok(config) => config,
        Err(err) => {
            warn!("Falling back to default config: {err}");
            SessionConfig::default()
        }
    };
    let config = SessionConfig {
        default_mode: Mode::Image,
        ..config
    };

    let scene = Rc::new(Cell::new(0));
    let clock = Rc::new(Cell::new(0.0));
    let parts = SessionParts::new(
        Box::new(SyntheticCamera {
            scene: scene.clone(),
            clock: clock.clone(),
        }),
        Box::new(BundledSources),
    )
    .with_output(Box::new(WriterOutput::new(std::io::stdout())))
    .with_observer(Box::new(LogObserver));
    let mut controller = SessionController::new(config, parts);
    let tick = |controller: &mut SessionController| {
        clock.set(clock.get() + FRAME_MS);
        controller.on_frame(clock.get());
    };

    for class in 0..2 {
        scene.set(class);
        controller.start_collecting(class)?;
        for _ in 0..SAMPLES_PER_CLASS {
            tick(&mut controller);
        }
        controller.stop_collecting();
        tick(&mut controller);
    }

    let params = controller.config().training.hyperparameters();
    let run_id = controller.train(params)?;
    while controller.is_training() {
        thread::sleep(Duration::from_millis(FRAME_MS as u64));
        tick(&mut controller);
    }
    let failure = controller
        .training_run()
        .and_then(|run| match &run.status {
            TrainingStatus::Failed(reason) => Some(reason.clone()),
            _ => None,
        });
    if let Some(reason) = failure {
        controller.shutdown();
        return Err(format!("training run {run_id} failed: {reason}").into());
    }

    for frame in 0..PREDICT_FRAMES {
        scene.set((frame / 40) % 2);
        tick(&mut controller);
        thread::sleep(Duration::from_millis(FRAME_MS as u64));
    }
    if let Some(prediction) = &controller.state().last_prediction {
        info!(
            best = ?prediction.best_index,
            confidence = ?prediction.confidence(),
            "Final prediction"
        );
    }
    controller.shutdown();
    Ok(())
}
