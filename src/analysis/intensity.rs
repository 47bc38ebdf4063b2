use std::f64::consts::PI;

use super::error::AnalysisError;
use super::sound::Sound;

/// Squared reference pressure (2e-5 Pa) for dB conversion.
const REFERENCE_POWER: f64 = 4.0e-10;
/// Level reported for frames without energy.
const FLOOR_DB: f64 = -300.0;

/// Parameters of the intensity contour.
#[derive(Debug, Clone, PartialEq)]
pub struct IntensitySettings {
    /// Lowest pitch the window must resolve; sets window length and default step.
    pub minimum_pitch: f64,
    /// Frame step in seconds; `None` uses `0.8 / minimum_pitch`.
    pub time_step: Option<f64>,
    /// Remove the window mean before measuring energy.
    pub subtract_mean: bool,
}

impl Default for IntensitySettings {
    fn default() -> Self {
        Self {
            minimum_pitch: 75.0,
            time_step: None,
            subtract_mean: true,
        }
    }
}

/// How frame levels are averaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Averaging {
    /// Average the underlying power, then convert back to dB.
    Energy,
    /// Average the dB values directly.
    Decibels,
}

/// Intensity contour in dB.
#[derive(Debug, Clone, PartialEq)]
pub struct Intensity {
    time_step: f64,
    values_db: Vec<f64>,
}

impl Intensity {
    pub fn values_db(&self) -> &[f64] {
        &self.values_db
    }

    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    pub fn mean(&self, averaging: Averaging) -> Option<f64> {
        if self.values_db.is_empty() {
            return None;
        }
        let n = self.values_db.len() as f64;
        let mean = match averaging {
            Averaging::Energy => {
                let power = self.values_db.iter().map(|&db| db_to_power(db)).sum::<f64>() / n;
                power_to_db(power)
            }
            Averaging::Decibels => self.values_db.iter().sum::<f64>() / n,
        };
        Some(mean)
    }

    /// Spread of the dB contour, each frame weighted by its power.
    ///
    /// `Decibels` gives the plain sample standard deviation. `None` with fewer than two frames.
    pub fn standard_deviation(&self, averaging: Averaging) -> Option<f64> {
        let n = self.values_db.len();
        if n < 2 {
            return None;
        }
        let weights: Vec<f64> = match averaging {
            Averaging::Energy => self.values_db.iter().map(|&db| db_to_power(db)).collect(),
            Averaging::Decibels => {
                let mean = self.values_db.iter().sum::<f64>() / n as f64;
                let sum_sq: f64 = self.values_db.iter().map(|v| (v - mean).powi(2)).sum();
                return Some((sum_sq / (n - 1) as f64).sqrt());
            }
        };
        let total: f64 = weights.iter().sum();
        if total <= 0.0 || !total.is_finite() {
            return Some(0.0);
        }
        let mean = weights
            .iter()
            .zip(&self.values_db)
            .map(|(w, db)| w * db)
            .sum::<f64>()
            / total;
        let variance = weights
            .iter()
            .zip(&self.values_db)
            .map(|(w, db)| w * (db - mean).powi(2))
            .sum::<f64>()
            / total;
        Some(variance.max(0.0).sqrt())
    }
}

/// Compute the intensity contour of `sound` with a Kaiser-Bessel window of `6.4 / minimum_pitch`.
pub fn to_intensity(sound: &Sound, settings: &IntensitySettings) -> Result<Intensity, AnalysisError> {
    let time_step = settings
        .time_step
        .filter(|step| *step > 0.0)
        .unwrap_or(0.8 / settings.minimum_pitch);
    let window_duration = 6.4 / settings.minimum_pitch;
    let duration = sound.duration();
    if duration < window_duration {
        return Err(AnalysisError::TooShort {
            measure: "intensity",
            duration,
            required: window_duration,
        });
    }
    let half_window = (0.5 * window_duration * sound.sample_rate() as f64).floor() as usize;
    let window = kaiser_window(half_window);
    let frame_count = ((duration - window_duration) / time_step).floor() as usize + 1;
    let first_time = 0.5 * (duration - (frame_count - 1) as f64 * time_step);

    let samples = sound.samples();
    let last = samples.len() as isize - 1;
    let mut values_db = Vec::with_capacity(frame_count);
    for frame in 0..frame_count {
        let centre = sound
            .time_to_index(first_time + frame as f64 * time_step)
            .round() as isize;
        let from = (centre - half_window as isize).max(0);
        let to = (centre + half_window as isize).min(last);
        let mut sum_w = 0.0;
        let mut sum_xw = 0.0;
        let mut sum_xxw = 0.0;
        for idx in from..=to {
            let w = window[(idx - centre + half_window as isize) as usize];
            let x = samples[idx as usize];
            sum_w += w;
            sum_xw += x * w;
            sum_xxw += x * x * w;
        }
        let power = if sum_w > 0.0 {
            let mean = if settings.subtract_mean { sum_xw / sum_w } else { 0.0 };
            (sum_xxw / sum_w - mean * mean).max(0.0)
        } else {
            0.0
        };
        values_db.push(power_to_db(power));
    }
    Ok(Intensity {
        time_step,
        values_db,
    })
}

fn kaiser_window(half: usize) -> Vec<f64> {
    let beta = 2.0 * PI * PI + 0.5;
    let norm = bessel_i0(beta);
    let len = 2 * half + 1;
    (0..len)
        .map(|idx| {
            let x = (idx as f64 - half as f64) / (half as f64 + 1.0);
            bessel_i0(beta * (1.0 - x * x).max(0.0).sqrt()) / norm
        })
        .collect()
}

fn bessel_i0(x: f64) -> f64 {
    let half = 0.5 * x;
    let mut term = 1.0;
    let mut sum = 1.0;
    for k in 1..200 {
        term *= half / k as f64;
        let squared = term * term;
        sum += squared;
        if squared < sum * 1e-16 {
            break;
        }
    }
    sum
}

fn power_to_db(power: f64) -> f64 {
    if power > 1e-30 {
        10.0 * (power / REFERENCE_POWER).log10()
    } else {
        FLOOR_DB
    }
}

fn db_to_power(db: f64) -> f64 {
    REFERENCE_POWER * 10f64.powf(db / 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_signals::{silence, sine};

    #[test]
    fn steady_tone_has_flat_intensity() {
        let sound = sine(150.0, 0.5, 16_000, 1.0);
        let intensity = to_intensity(&sound, &IntensitySettings::default()).unwrap();
        let expected = 10.0 * (0.125_f64 / REFERENCE_POWER).log10();
        let mean = intensity.mean(Averaging::Energy).unwrap();
        assert!((mean - expected).abs() < 0.5, "mean {mean} expected {expected}");
        let stdev = intensity.standard_deviation(Averaging::Energy).unwrap();
        assert!(stdev < 0.5, "stdev {stdev}");
    }

    #[test]
    fn energy_mean_is_dominated_by_loud_frames() {
        let intensity = Intensity {
            time_step: 0.01,
            values_db: vec![40.0, 80.0],
        };
        let energy = intensity.mean(Averaging::Energy).unwrap();
        let plain = intensity.mean(Averaging::Decibels).unwrap();
        assert!((plain - 60.0).abs() < 1e-9);
        assert!((energy - (80.0 - 10.0 * 2f64.log10())).abs() < 1e-3);
        let weighted = intensity.standard_deviation(Averaging::Energy).unwrap();
        let unweighted = intensity.standard_deviation(Averaging::Decibels).unwrap();
        assert!(weighted < unweighted);
    }

    #[test]
    fn silence_sits_at_the_floor() {
        let sound = silence(16_000, 0.3);
        let intensity = to_intensity(&sound, &IntensitySettings::default()).unwrap();
        assert!(intensity.values_db().iter().all(|&db| db == FLOOR_DB));
    }

    #[test]
    fn rejects_sound_shorter_than_window() {
        let sound = sine(150.0, 0.5, 16_000, 0.05);
        assert!(to_intensity(&sound, &IntensitySettings::default()).is_err());
    }
}
