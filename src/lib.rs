//! Voice-based screening for type 2 diabetes: acoustic feature extraction and
//! cross-validated binary classification.
/// Waveform loading, voice measures and the 14-feature extractor.
pub mod analysis;
/// Application directories for config and logs.
pub mod app_dirs;
/// Persisted settings.
pub mod config;
/// Cohort and result tables.
pub mod dataset;
/// Tracing subscriber setup.
pub mod logging;
/// Classifiers, fold pipeline and cross-validation.
pub mod ml;
