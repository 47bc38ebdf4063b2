use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::defaults::{
    MIN_FOLDS, clamp_threshold, clamp_worker_count, default_decision_threshold,
    default_f0_max_hz, default_f0_min_hz, default_log_level, default_model, default_num_folds,
    default_pitch_unit, default_worker_count,
};
use crate::analysis::{PitchRange, PitchRangeError, PitchUnit};
use crate::ml::{ClassificationError, CrossValOptions, ModelKind};

/// Settings persisted in `config.toml`.
///
/// Config keys (TOML): `log_level`, `extraction`, `classification`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Default tracing filter when `VOICESCREEN_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub extraction: ExtractionSettings,
    #[serde(default)]
    pub classification: ClassificationSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            extraction: ExtractionSettings::default(),
            classification: ClassificationSettings::default(),
        }
    }
}

impl Settings {
    pub(crate) fn normalized(mut self) -> Self {
        self.extraction.worker_count = clamp_worker_count(self.extraction.worker_count);
        self.classification.num_folds = self.classification.num_folds.max(MIN_FOLDS);
        self.classification.decision_threshold =
            clamp_threshold(self.classification.decision_threshold);
        if self.log_level.trim().is_empty() {
            self.log_level = default_log_level();
        }
        self
    }
}

/// Acoustic analysis parameters.
///
/// Config keys: `f0_min_hz`, `f0_max_hz`, `pitch_unit`, `worker_count`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionSettings {
    #[serde(default = "default_f0_min_hz")]
    pub f0_min_hz: f64,
    #[serde(default = "default_f0_max_hz")]
    pub f0_max_hz: f64,
    /// Unit of the pitch mean and standard deviation, e.g. "Hertz" or "semitones re 100 Hz".
    #[serde(default = "default_pitch_unit")]
    pub pitch_unit: PitchUnit,
    /// Extraction threads (0 = one per available core).
    #[serde(default = "default_worker_count")]
    pub worker_count: u32,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            f0_min_hz: default_f0_min_hz(),
            f0_max_hz: default_f0_max_hz(),
            pitch_unit: default_pitch_unit(),
            worker_count: default_worker_count(),
        }
    }
}

impl ExtractionSettings {
    pub fn pitch_range(&self) -> Result<PitchRange, PitchRangeError> {
        PitchRange::new(self.f0_min_hz, self.f0_max_hz)
    }
}

/// Cross-validation and prediction parameters.
///
/// Config keys: `model`, `num_folds`, `seed`, `decision_threshold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationSettings {
    /// One of `nb`, `lr`, `svm`.
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_num_folds")]
    pub num_folds: u32,
    /// Fixed fold shuffle seed; unset draws a new partition per run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default = "default_decision_threshold")]
    pub decision_threshold: f64,
}

impl Default for ClassificationSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            num_folds: default_num_folds(),
            seed: None,
            decision_threshold: default_decision_threshold(),
        }
    }
}

impl ClassificationSettings {
    pub fn model_kind(&self) -> Result<ModelKind, ClassificationError> {
        self.model.parse()
    }

    pub fn cross_val_options(&self) -> Result<CrossValOptions, ClassificationError> {
        Ok(CrossValOptions {
            num_folds: self.num_folds as usize,
            model: self.model_kind()?,
            seed: self.seed,
        })
    }
}

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
    #[error("No suitable config directory found")]
    NoConfigDir,
}
