use std::path::PathBuf;

use thiserror::Error;

/// Acoustic analysis could not produce a measurement for a recording.
///
/// The extractor recovers from every variant by substituting a zero feature vector.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The waveform could not be read or decoded.
    #[error("failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },
    /// The waveform is shorter than the analysis window of a measure.
    #[error("sound lasts {duration:.4} s but {measure} needs at least {required:.4} s")]
    TooShort {
        measure: &'static str,
        duration: f64,
        required: f64,
    },
    /// The pitch tracker found no voiced frame.
    #[error("no voiced frames found between the pitch floor and ceiling")]
    NoVoicedFrames,
    /// A measure had no defined value (too few periods, silent frames, ...).
    #[error("{measure} is undefined for this recording")]
    Undefined { measure: &'static str },
}

/// Invalid pitch search bounds.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PitchRangeError {
    #[error("pitch floor must be a positive frequency, got {0} Hz")]
    InvalidFloor(f64),
    #[error("pitch ceiling must be a positive frequency, got {0} Hz")]
    InvalidCeiling(f64),
    #[error("pitch floor {floor} Hz must be below the ceiling {ceiling} Hz")]
    Inverted { floor: f64, ceiling: f64 },
}
