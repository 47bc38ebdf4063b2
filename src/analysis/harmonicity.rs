//! Harmonics-to-noise ratio from forward cross-correlation.
//!
//! Every frame correlates a window of `periods_per_window / minimum_pitch` seconds with the same
//! window shifted by each candidate lag up to one period of the minimum pitch. The best
//! interpolated correlation `r` maps to `10 log10(r / (1 - r))` dB.

use super::error::AnalysisError;
use super::sound::Sound;

/// Level assigned to frames below the silence threshold.
pub const SILENT_FRAME_DB: f64 = -200.0;
const HNR_LIMIT_DB: f64 = 150.0;

/// Parameters of the cross-correlation harmonicity analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct HarmonicitySettings {
    pub time_step: f64,
    pub minimum_pitch: f64,
    /// Frames whose peak falls below this fraction of the global peak count as silent.
    pub silence_threshold: f64,
    pub periods_per_window: f64,
}

impl Default for HarmonicitySettings {
    fn default() -> Self {
        Self {
            time_step: 0.01,
            minimum_pitch: 75.0,
            silence_threshold: 0.1,
            periods_per_window: 1.0,
        }
    }
}

/// Harmonicity contour in dB, with silent frames at [`SILENT_FRAME_DB`].
#[derive(Debug, Clone, PartialEq)]
pub struct Harmonicity {
    time_step: f64,
    values_db: Vec<f64>,
}

impl Harmonicity {
    pub fn values_db(&self) -> &[f64] {
        &self.values_db
    }

    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    /// Mean over non-silent frames.
    pub fn mean(&self) -> Option<f64> {
        let (sum, count) = self
            .values_db
            .iter()
            .filter(|&&db| db != SILENT_FRAME_DB)
            .fold((0.0, 0usize), |(sum, count), db| (sum + db, count + 1));
        (count > 0).then(|| sum / count as f64)
    }
}

pub fn to_harmonicity_cc(
    sound: &Sound,
    settings: &HarmonicitySettings,
) -> Result<Harmonicity, AnalysisError> {
    let sample_rate = sound.sample_rate() as f64;
    let window_len = (settings.periods_per_window / settings.minimum_pitch * sample_rate).ceil() as usize;
    let max_lag = (sample_rate / settings.minimum_pitch).ceil() as usize;
    let min_lag = 2;
    // One extra lag on top for the local-maximum test at `max_lag`.
    let span = window_len + max_lag + 1;
    if window_len < 2 || max_lag <= min_lag || sound.len() < span {
        return Err(AnalysisError::TooShort {
            measure: "harmonicity",
            duration: sound.duration(),
            required: span as f64 / sample_rate,
        });
    }

    let samples = sound.samples();
    let global_peak = sound.absolute_peak();
    let span_duration = span as f64 / sample_rate;
    let frame_count = ((sound.duration() - span_duration) / settings.time_step).floor() as usize + 1;
    let first_time = 0.5 * (sound.duration() - (frame_count - 1) as f64 * settings.time_step);

    let mut correlations = vec![0.0; max_lag + 2];
    let mut values_db = Vec::with_capacity(frame_count);
    for frame in 0..frame_count {
        let time = first_time + frame as f64 * settings.time_step;
        let start = (sound.time_to_index(time).round() as isize - (span / 2) as isize)
            .clamp(0, (samples.len() - span) as isize) as usize;
        let segment = &samples[start..start + span];
        let local_peak = segment.iter().fold(0.0_f64, |peak, v| peak.max(v.abs()));
        if global_peak <= 0.0 || local_peak < settings.silence_threshold * global_peak {
            values_db.push(SILENT_FRAME_DB);
            continue;
        }

        let reference = &segment[..window_len];
        let reference_energy: f64 = reference.iter().map(|v| v * v).sum();
        for (lag, slot) in correlations.iter_mut().enumerate().skip(min_lag - 1) {
            let shifted = &segment[lag..lag + window_len];
            let shifted_energy: f64 = shifted.iter().map(|v| v * v).sum();
            let denominator = (reference_energy * shifted_energy).sqrt();
            *slot = if denominator > 0.0 {
                reference.iter().zip(shifted).map(|(a, b)| a * b).sum::<f64>() / denominator
            } else {
                0.0
            };
        }
        let best = best_interpolated_peak(&correlations, min_lag, max_lag);
        values_db.push(correlation_to_db(best));
    }

    Ok(Harmonicity {
        time_step: settings.time_step,
        values_db,
    })
}

fn best_interpolated_peak(r: &[f64], min_lag: usize, max_lag: usize) -> f64 {
    let mut best = 0.0_f64;
    for lag in min_lag..=max_lag {
        let (prev, here, next) = (r[lag - 1], r[lag], r[lag + 1]);
        if here <= prev || here < next {
            continue;
        }
        let curvature = 2.0 * here - prev - next;
        let peak = if curvature > 0.0 {
            let slope = 0.5 * (next - prev);
            here + 0.5 * slope * slope / curvature
        } else {
            here
        };
        best = best.max(peak.min(1.0));
    }
    best
}

fn correlation_to_db(r: f64) -> f64 {
    if r <= 1e-15 {
        -HNR_LIMIT_DB
    } else if r >= 1.0 - 1e-15 {
        HNR_LIMIT_DB
    } else {
        (10.0 * (r / (1.0 - r)).log10()).clamp(-HNR_LIMIT_DB, HNR_LIMIT_DB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_signals::{noisy_sine, silence, sine};

    #[test]
    fn clean_tone_is_strongly_harmonic() {
        let sound = sine(150.0, 0.5, 16_000, 0.5);
        let hnr = to_harmonicity_cc(&sound, &HarmonicitySettings::default()).unwrap();
        assert!(hnr.mean().unwrap() > 30.0);
    }

    #[test]
    fn noise_lowers_harmonicity() {
        let clean = sine(150.0, 0.5, 16_000, 0.5);
        let noisy = noisy_sine(150.0, 0.5, 0.2, 16_000, 0.5);
        let settings = HarmonicitySettings::default();
        let clean_db = to_harmonicity_cc(&clean, &settings).unwrap().mean().unwrap();
        let noisy_db = to_harmonicity_cc(&noisy, &settings).unwrap().mean().unwrap();
        assert!(noisy_db < clean_db, "{noisy_db} !< {clean_db}");
        assert!(noisy_db.is_finite());
    }

    #[test]
    fn silent_frames_are_excluded_from_the_mean() {
        let sound = silence(16_000, 0.3);
        let hnr = to_harmonicity_cc(&sound, &HarmonicitySettings::default()).unwrap();
        assert!(hnr.values_db().iter().all(|&db| db == SILENT_FRAME_DB));
        assert!(hnr.mean().is_none());
    }

    #[test]
    fn correlation_mapping_is_clamped() {
        assert_eq!(correlation_to_db(0.0), -150.0);
        assert_eq!(correlation_to_db(1.0), 150.0);
        assert!((correlation_to_db(0.5)).abs() < 1e-12);
    }
}
