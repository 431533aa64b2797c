//! Persisted session settings (`.teachable/config.toml`).

mod defaults;
mod io;


use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ml::Hyperparameters;
use crate::ml::mlp::MlpOptions;
use crate::session::Mode;
use crate::smoothing::OneEuroParams;
use defaults::*;

pub use io::{CONFIG_FILE_NAME, config_path, load_from, load_or_default, save, save_to_path};

/// Top-level settings for one teaching session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Mode selected when the session starts.
    #[serde(default = "default_mode")]
    pub default_mode: Mode,
    /// Initial class labels, in display order.
    #[serde(default = "default_class_names")]
    pub class_names: Vec<String>,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub smoothing: SmoothingConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_mode: default_mode(),
            class_names: default_class_names(),
            training: TrainingConfig::default(),
            capture: CaptureConfig::default(),
            output: OutputConfig::default(),
            smoothing: SmoothingConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Replace out-of-range values with defaults.
    pub fn normalized(mut self) -> Self {
        if self.class_names.is_empty() {
            self.class_names = default_class_names();
        }
        self.training = self.training.normalized();
        self.capture.landmark_sample_interval_ms = positive_or(
            self.capture.landmark_sample_interval_ms,
            default_landmark_sample_interval_ms(),
        );
        self.output.send_threshold = if self.output.send_threshold.is_finite() {
            self.output.send_threshold.clamp(0.0, 1.0)
        } else {
            default_send_threshold()
        };
        if !self.output.cooldown_ms.is_finite() || self.output.cooldown_ms < 0.0 {
            self.output.cooldown_ms = default_cooldown_ms();
        }
        let mut seen = Vec::new();
        self.output.modes.retain(|mode| {
            let fresh = !seen.contains(mode);
            seen.push(*mode);
            fresh
        });
        self.smoothing = self.smoothing.normalized();
        self
    }
}

/// Training defaults plus the classifier head's architecture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f32,
    #[serde(default = "default_hidden_size")]
    pub hidden_size: usize,
    #[serde(default = "default_l2_penalty")]
    pub l2_penalty: f32,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: default_epochs(),
            batch_size: default_batch_size(),
            learning_rate: default_learning_rate(),
            hidden_size: default_hidden_size(),
            l2_penalty: default_l2_penalty(),
            seed: default_seed(),
        }
    }
}

impl TrainingConfig {
    fn normalized(mut self) -> Self {
        let base = Hyperparameters {
            epochs: default_epochs(),
            batch_size: default_batch_size(),
            learning_rate: default_learning_rate(),
        };
        let clean = self.hyperparameters().sanitized(&base);
        self.epochs = clean.epochs;
        self.batch_size = clean.batch_size;
        self.learning_rate = clean.learning_rate;
        if self.hidden_size == 0 {
            self.hidden_size = default_hidden_size();
        }
        if !self.l2_penalty.is_finite() || self.l2_penalty < 0.0 {
            self.l2_penalty = default_l2_penalty();
        }
        self
    }

    pub fn hyperparameters(&self) -> Hyperparameters {
        Hyperparameters {
            epochs: self.epochs,
            batch_size: self.batch_size,
            learning_rate: self.learning_rate,
        }
    }

    pub fn mlp_options(&self) -> MlpOptions {
        MlpOptions {
            hidden_size: self.hidden_size,
            l2_penalty: self.l2_penalty,
            seed: self.seed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Minimum spacing between stored samples in landmark modes.
    #[serde(default = "default_landmark_sample_interval_ms")]
    pub landmark_sample_interval_ms: f64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            landmark_sample_interval_ms: default_landmark_sample_interval_ms(),
        }
    }
}

/// Confidence gate in front of the external output channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_send_threshold")]
    pub send_threshold: f32,
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: f64,
    /// Modes whose predictions are forwarded to the channel.
    #[serde(default = "default_output_modes")]
    pub modes: Vec<Mode>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            send_threshold: default_send_threshold(),
            cooldown_ms: default_cooldown_ms(),
            modes: default_output_modes(),
        }
    }
}

/// One-Euro settings applied to landmark modes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmoothingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(flatten)]
    pub params: OneEuroParams,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            params: OneEuroParams::default(),
        }
    }
}

impl SmoothingConfig {
    fn normalized(mut self) -> Self {
        let base = OneEuroParams::default();
        self.params = OneEuroParams {
            freq: positive_or(self.params.freq, base.freq),
            min_cutoff: positive_or(self.params.min_cutoff, base.min_cutoff),
            beta: if self.params.beta.is_finite() && self.params.beta >= 0.0 {
                self.params.beta
            } else {
                base.beta
            },
            d_cutoff: positive_or(self.params.d_cutoff, base.d_cutoff),
        };
        self
    }
}

/// Errors that may occur while loading or saving the session configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unable to create config directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config to TOML at {path}: {source}")]
    SerializeToml {
        path: PathBuf,
        source: toml::ser::Error,
    },
    #[error(transparent)]
    AppDir(#[from] crate::app_dirs::AppDirError),
}
