/// What a loop iteration asks for next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    /// Run again on the next frame.
    Continue,
    /// Terminate without rescheduling.
    Stop,
}

/// A frame-driven loop: a "run on the next tick" flag tied to the mode
/// generation it was started in.
///
/// A loop whose generation no longer matches the session's is dead; it is
/// cancelled at its next liveness check instead of being interrupted.
#[derive(Debug, Default)]
pub struct FrameLoop {
    scheduled: bool,
    generation: u64,
}

impl FrameLoop {
    /// Schedule the loop. Returns `false` if it was already running in this
    /// generation.
    pub fn start(&mut self, generation: u64) -> bool {
        if self.scheduled && self.generation == generation {
            return false;
        }
        self.scheduled = true;
        self.generation = generation;
        true
    }

    pub fn stop(&mut self) {
        self.scheduled = false;
    }

    pub fn is_running(&self) -> bool {
        self.scheduled
    }

    /// Liveness check: whether an iteration should run for `generation`.
    pub fn is_live(&mut self, generation: u64) -> bool {
        if self.scheduled && self.generation != generation {
            self.scheduled = false;
        }
        self.scheduled
    }

    pub fn apply(&mut self, control: LoopControl) {
        if control == LoopControl::Stop {
            self.scheduled = false;
        }
    }
}
