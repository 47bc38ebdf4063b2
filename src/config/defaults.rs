use crate::analysis::PitchUnit;

pub(super) const MAX_WORKER_COUNT: u32 = 64;
pub(super) const MIN_FOLDS: u32 = 2;

pub(super) fn clamp_worker_count(value: u32) -> u32 {
    value.min(MAX_WORKER_COUNT)
}

pub(super) fn clamp_threshold(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        default_decision_threshold()
    }
}

pub(super) fn default_f0_min_hz() -> f64 {
    75.0
}

pub(super) fn default_f0_max_hz() -> f64 {
    300.0
}

pub(super) fn default_pitch_unit() -> PitchUnit {
    PitchUnit::Hertz
}

pub(super) fn default_worker_count() -> u32 {
    0
}

pub(super) fn default_model() -> String {
    "svm".to_string()
}

pub(super) fn default_num_folds() -> u32 {
    5
}

pub(super) fn default_decision_threshold() -> f64 {
    0.5
}

pub(super) fn default_log_level() -> String {
    "info".to_string()
}
