use crate::session::Mode;

pub(super) fn default_mode() -> Mode {
    Mode::Image
}

pub(super) fn default_class_names() -> Vec<String> {
    vec!["Class 1".to_string(), "Class 2".to_string()]
}

pub(super) fn default_true() -> bool {
    true
}

pub(super) fn default_epochs() -> usize {
    20
}

pub(super) fn default_batch_size() -> usize {
    16
}

pub(super) fn default_learning_rate() -> f32 {
    0.01
}

pub(super) fn default_hidden_size() -> usize {
    128
}

pub(super) fn default_l2_penalty() -> f32 {
    1e-4
}

pub(super) fn default_seed() -> u64 {
    42
}

pub(super) fn default_landmark_sample_interval_ms() -> f64 {
    100.0
}

pub(super) fn default_send_threshold() -> f32 {
    0.6
}

pub(super) fn default_cooldown_ms() -> f64 {
    500.0
}

pub(super) fn default_output_modes() -> Vec<Mode> {
    Mode::ALL
        .into_iter()
        .filter(|mode| mode.profile().drives_output)
        .collect()
}

pub(super) fn positive_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        fallback
    }
}
