//! The acoustic feature extractor: one recording in, one [`FeatureVector`] out.
//!
//! Analysis failures never escape: they are logged with the recording identifier and replaced
//! by [`FeatureVector::zeroed`].

use std::path::{Path, PathBuf};
use std::thread;

use super::audio_decode::load_sound;
use super::error::{AnalysisError, PitchRangeError};
use super::features::FeatureVector;
use super::harmonicity::{HarmonicitySettings, to_harmonicity_cc};
use super::intensity::{Averaging, IntensitySettings, to_intensity};
use super::jitter::{jitter_local, jitter_local_absolute, jitter_ppq5, jitter_rap};
use super::periods::PeriodFilter;
use super::pitch::{PitchSettings, to_pitch};
use super::point_process::to_point_process_periodic_cc;
use super::shimmer::{AmplitudeFilter, PeriodAmplitudes};
use super::sound::Sound;
use super::units::PitchUnit;

/// Validated pitch search bounds in Hz.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchRange {
    floor: f64,
    ceiling: f64,
}

impl PitchRange {
    pub fn new(floor: f64, ceiling: f64) -> Result<Self, PitchRangeError> {
        if !floor.is_finite() || floor <= 0.0 {
            return Err(PitchRangeError::InvalidFloor(floor));
        }
        if !ceiling.is_finite() || ceiling <= 0.0 {
            return Err(PitchRangeError::InvalidCeiling(ceiling));
        }
        if floor >= ceiling {
            return Err(PitchRangeError::Inverted { floor, ceiling });
        }
        Ok(Self { floor, ceiling })
    }

    pub fn floor(&self) -> f64 {
        self.floor
    }

    pub fn ceiling(&self) -> f64 {
        self.ceiling
    }
}

impl Default for PitchRange {
    fn default() -> Self {
        Self {
            floor: 75.0,
            ceiling: 300.0,
        }
    }
}

/// Where the waveform of a recording comes from.
#[derive(Debug, Clone)]
pub enum RecordingSource {
    File(PathBuf),
    Sound(Sound),
}

/// One waveform plus the settings it is analysed with.
#[derive(Debug, Clone)]
pub struct Recording {
    id: String,
    source: RecordingSource,
    pitch_range: PitchRange,
    unit: PitchUnit,
}

impl Recording {
    /// A recording read from `path`, identified by its path.
    pub fn from_file(path: impl Into<PathBuf>, pitch_range: PitchRange, unit: PitchUnit) -> Self {
        let path = path.into();
        Self {
            id: path.display().to_string(),
            source: RecordingSource::File(path),
            pitch_range,
            unit,
        }
    }

    /// A recording already held in memory.
    pub fn from_sound(
        id: impl Into<String>,
        sound: Sound,
        pitch_range: PitchRange,
        unit: PitchUnit,
    ) -> Self {
        Self {
            id: id.into(),
            source: RecordingSource::Sound(sound),
            pitch_range,
            unit,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source(&self) -> &RecordingSource {
        &self.source
    }

    pub fn pitch_range(&self) -> PitchRange {
        self.pitch_range
    }

    pub fn unit(&self) -> PitchUnit {
        self.unit
    }
}

/// Whether a feature vector was measured or substituted.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionStatus {
    Measured,
    Failed { reason: String },
}

/// Extractor output for one recording.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub recording_id: String,
    pub features: FeatureVector,
    pub status: ExtractionStatus,
}

impl Extraction {
    pub fn is_measured(&self) -> bool {
        self.status == ExtractionStatus::Measured
    }
}

/// Compute the feature vector of `recording`, or the zero vector if analysis fails.
pub fn extract(recording: &Recording) -> FeatureVector {
    extract_with_status(recording).features
}

/// Like [`extract`], but also reports whether the vector was measured.
pub fn extract_with_status(recording: &Recording) -> Extraction {
    match measure(recording) {
        Ok(features) => Extraction {
            recording_id: recording.id.clone(),
            features,
            status: ExtractionStatus::Measured,
        },
        Err(err) => {
            let reason = err.to_string();
            tracing::warn!(
                recording = %recording.id,
                reason = %reason,
                "acoustic analysis failed; substituting zero feature vector"
            );
            Extraction {
                recording_id: recording.id.clone(),
                features: FeatureVector::zeroed(),
                status: ExtractionStatus::Failed { reason },
            }
        }
    }
}

/// Run the full analysis, surfacing the first failure.
pub fn measure(recording: &Recording) -> Result<FeatureVector, AnalysisError> {
    match &recording.source {
        RecordingSource::File(path) => {
            let sound = load_sound(path)?;
            measure_sound(&sound, recording.pitch_range, recording.unit)
        }
        RecordingSource::Sound(sound) => {
            measure_sound(sound, recording.pitch_range, recording.unit)
        }
    }
}

pub fn measure_sound(
    sound: &Sound,
    range: PitchRange,
    unit: PitchUnit,
) -> Result<FeatureVector, AnalysisError> {
    let pitch = to_pitch(sound, &PitchSettings::new(range.floor, range.ceiling))?;
    let mean_f0 = defined(pitch.mean(unit), "mean F0")?;
    let stdev_f0 = defined(pitch.standard_deviation(unit), "F0 standard deviation")?;

    let intensity = to_intensity(sound, &IntensitySettings::default())?;
    let mean_intensity = defined(intensity.mean(Averaging::Energy), "mean intensity")?;
    let stdev_intensity = defined(
        intensity.standard_deviation(Averaging::Energy),
        "intensity standard deviation",
    )?;

    let harmonicity = to_harmonicity_cc(sound, &HarmonicitySettings::default())?;
    let hnr = defined(harmonicity.mean(), "HNR")?;

    let points = to_point_process_periodic_cc(sound, &pitch)?;
    let periods = PeriodFilter::default();
    let local_jitter = defined(jitter_local(&points, &periods), "local jitter")?;
    let local_absolute_jitter = defined(
        jitter_local_absolute(&points, &periods),
        "local absolute jitter",
    )?;
    let rap_jitter = defined(jitter_rap(&points, &periods), "rap jitter")?;
    let ppq5_jitter = defined(jitter_ppq5(&points, &periods), "ppq5 jitter")?;

    let amplitudes = PeriodAmplitudes::new(sound, &points, AmplitudeFilter::default());
    let features = FeatureVector {
        mean_f0,
        stdev_f0,
        mean_intensity,
        stdev_intensity,
        hnr,
        local_jitter,
        local_absolute_jitter,
        rap_jitter,
        ppq5_jitter,
        local_shimmer: defined(amplitudes.shimmer_local(), "local shimmer")?,
        local_db_shimmer: defined(amplitudes.shimmer_local_db(), "local dB shimmer")?,
        apq3_shimmer: defined(amplitudes.shimmer_apq3(), "apq3 shimmer")?,
        apq5_shimmer: defined(amplitudes.shimmer_apq5(), "apq5 shimmer")?,
        apq11_shimmer: defined(amplitudes.shimmer_apq11(), "apq11 shimmer")?,
    };
    if !features.all_finite() {
        return Err(AnalysisError::Undefined {
            measure: "feature vector",
        });
    }
    Ok(features)
}

fn defined(value: Option<f64>, measure: &'static str) -> Result<f64, AnalysisError> {
    value
        .filter(|v| v.is_finite())
        .ok_or(AnalysisError::Undefined { measure })
}

/// Extract every recording, in input order, using up to `worker_count` threads.
///
/// A `worker_count` of 0 uses the available parallelism.
pub fn extract_batch(recordings: &[Recording], worker_count: usize) -> Vec<Extraction> {
    if recordings.is_empty() {
        return Vec::new();
    }
    let workers = match worker_count {
        0 => thread::available_parallelism().map_or(1, |n| n.get()),
        n => n,
    }
    .min(recordings.len());
    if workers <= 1 {
        return recordings.iter().map(extract_with_status).collect();
    }

    let chunk_len = recordings.len().div_ceil(workers);
    thread::scope(|scope| {
        let handles: Vec<_> = recordings
            .chunks(chunk_len)
            .map(|chunk| {
                (
                    chunk,
                    scope.spawn(move || chunk.iter().map(extract_with_status).collect::<Vec<_>>()),
                )
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|(chunk, handle)| {
                handle.join().unwrap_or_else(|_| {
                    chunk
                        .iter()
                        .map(|recording| {
                            tracing::error!(recording = %recording.id, "extraction worker panicked");
                            Extraction {
                                recording_id: recording.id.clone(),
                                features: FeatureVector::zeroed(),
                                status: ExtractionStatus::Failed {
                                    reason: "extraction worker panicked".to_string(),
                                },
                            }
                        })
                        .collect()
                })
            })
            .collect()
    })
}

/// Convenience for the common case of a list of files sharing one configuration.
pub fn recordings_from_paths<P: AsRef<Path>>(
    paths: &[P],
    pitch_range: PitchRange,
    unit: PitchUnit,
) -> Vec<Recording> {
    paths
        .iter()
        .map(|path| Recording::from_file(path.as_ref(), pitch_range, unit))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::features::FEATURE_COUNT;
    use crate::analysis::test_signals::{silence, sine, vibrato};

    #[test]
    fn pitch_range_rejects_bad_bounds() {
        assert_eq!(
            PitchRange::new(0.0, 300.0),
            Err(PitchRangeError::InvalidFloor(0.0))
        );
        assert_eq!(
            PitchRange::new(75.0, f64::NAN).unwrap_err().to_string(),
            "pitch ceiling must be a positive frequency, got NaN Hz"
        );
        assert!(matches!(
            PitchRange::new(300.0, 75.0),
            Err(PitchRangeError::Inverted { .. })
        ));
        assert!(PitchRange::new(75.0, 300.0).is_ok());
    }

    #[test]
    fn voiced_sound_yields_finite_features() {
        let recording = Recording::from_sound(
            "vibrato",
            vibrato(140.0, 5.0, 16_000, 1.0),
            PitchRange::default(),
            PitchUnit::Hertz,
        );
        let extraction = extract_with_status(&recording);
        assert!(extraction.is_measured(), "{:?}", extraction.status);
        let values = extraction.features.to_array();
        assert_eq!(values.len(), FEATURE_COUNT);
        assert!(values.iter().all(|v| v.is_finite()));
        assert!((extraction.features.mean_f0 - 140.0).abs() < 5.0);
        assert!(extraction.features.mean_intensity > 50.0);
    }

    #[test]
    fn silence_yields_the_zero_vector() {
        let recording = Recording::from_sound(
            "quiet",
            silence(16_000, 1.0),
            PitchRange::default(),
            PitchUnit::Hertz,
        );
        let extraction = extract_with_status(&recording);
        assert!(extraction.features.is_zeroed());
        assert!(matches!(extraction.status, ExtractionStatus::Failed { .. }));
    }

    #[test]
    fn empty_sound_is_an_analysis_failure() {
        let sound = Sound::new(Vec::new(), 16_000);
        assert!(measure_sound(&sound, PitchRange::default(), PitchUnit::Hertz).is_err());
    }

    #[test]
    fn short_tone_fails_after_the_early_measures() {
        let sound = vibrato(120.0, 0.0, 16_000, 0.12);
        let err = measure_sound(&sound, PitchRange::default(), PitchUnit::Hertz).unwrap_err();
        assert!(
            matches!(
                &err,
                AnalysisError::Undefined { measure }
                    if measure.contains("jitter") || measure.contains("shimmer")
            ),
            "{err}"
        );

        let recording =
            Recording::from_sound("short", sound, PitchRange::default(), PitchUnit::Hertz);
        assert_eq!(extract(&recording).to_array(), [0.0; FEATURE_COUNT]);
    }

    #[test]
    fn unit_changes_only_pitch_statistics() {
        let sound = vibrato(200.0, 5.0, 16_000, 1.0);
        let hertz = measure_sound(&sound, PitchRange::default(), PitchUnit::Hertz).unwrap();
        let mel = measure_sound(&sound, PitchRange::default(), PitchUnit::Mel).unwrap();
        assert!((mel.mean_f0 - PitchUnit::Mel.from_hertz(hertz.mean_f0)).abs() < 1.0);
        assert_eq!(hertz.mean_intensity, mel.mean_intensity);
        assert_eq!(hertz.local_jitter, mel.local_jitter);
    }

    #[test]
    fn batch_preserves_input_order() {
        let recordings: Vec<Recording> = (0..6)
            .map(|idx| {
                let sound = if idx % 2 == 0 {
                    silence(16_000, 0.3)
                } else {
                    sine(120.0 + 20.0 * idx as f64, 0.5, 16_000, 0.5)
                };
                Recording::from_sound(format!("r{idx}"), sound, PitchRange::default(), PitchUnit::Hertz)
            })
            .collect();
        let results = extract_batch(&recordings, 3);
        let ids: Vec<_> = results.iter().map(|r| r.recording_id.as_str()).collect();
        assert_eq!(ids, vec!["r0", "r1", "r2", "r3", "r4", "r5"]);
        for (idx, result) in results.iter().enumerate() {
            assert_eq!(result.features.is_zeroed(), idx % 2 == 0);
        }
        let serial = extract_batch(&recordings, 1);
        assert_eq!(serial, results);
    }
}
