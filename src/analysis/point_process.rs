//! Glottal pulse instants located by periodic cross-correlation.
//!
//! Within each voiced interval of the pitch contour, the loudest sample near the interval centre
//! anchors the first pulse. Pulses are then chained outwards one period at a time, each placed at
//! the best-correlating lag within 20% of the local period.

use super::error::AnalysisError;
use super::pitch::Pitch;
use super::sound::Sound;

const LAG_SEARCH_FRACTION: f64 = 0.2;
const MINIMUM_CORRELATION: f64 = 0.3;

/// Sorted pulse times in seconds.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PointProcess {
    times: Vec<f64>,
}

impl PointProcess {
    pub fn from_times(mut times: Vec<f64>) -> Self {
        times.retain(|t| t.is_finite());
        times.sort_by(f64::total_cmp);
        times.dedup();
        Self { times }
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Backward,
    Forward,
}

pub fn to_point_process_periodic_cc(
    sound: &Sound,
    pitch: &Pitch,
) -> Result<PointProcess, AnalysisError> {
    let intervals = pitch.voiced_intervals();
    if intervals.is_empty() {
        return Err(AnalysisError::NoVoicedFrames);
    }
    let mut times = Vec::new();
    for (start, end) in intervals {
        let middle = 0.5 * (start + end);
        let Some(f0) = pitch.frequency_at(middle) else {
            continue;
        };
        let half_period = 0.5 / f0;
        let Some(anchor) =
            sound.time_of_absolute_extremum(middle - half_period, middle + half_period)
        else {
            continue;
        };
        times.push(anchor);
        for direction in [Direction::Backward, Direction::Forward] {
            follow_pulses(sound, pitch, anchor, (start, end), direction, &mut times);
        }
    }
    if times.is_empty() {
        return Err(AnalysisError::Undefined {
            measure: "point process",
        });
    }
    Ok(PointProcess::from_times(times))
}

fn follow_pulses(
    sound: &Sound,
    pitch: &Pitch,
    anchor: f64,
    (start, end): (f64, f64),
    direction: Direction,
    times: &mut Vec<f64>,
) {
    let sample_rate = sound.sample_rate() as f64;
    let mut time = anchor;
    loop {
        let Some(f0) = pitch.frequency_at(time) else {
            break;
        };
        let period = sample_rate / f0;
        let expected = match direction {
            Direction::Forward => period,
            Direction::Backward => -period,
        };
        let Some((lag, r)) = best_lag(sound.samples(), sound.time_to_index(time), expected, period)
        else {
            break;
        };
        if r < MINIMUM_CORRELATION {
            break;
        }
        let next = time + lag / sample_rate;
        if next < start || next > end {
            break;
        }
        times.push(next);
        time = next;
    }
}

/// Best normalized correlation between the period-long window at `centre` and windows shifted by
/// lags within `LAG_SEARCH_FRACTION * period` of `expected` (all in samples).
fn best_lag(samples: &[f64], centre: f64, expected: f64, period: f64) -> Option<(f64, f64)> {
    let half = (0.5 * period).round() as isize;
    let spread = (LAG_SEARCH_FRACTION * period).ceil() as isize;
    let centre = centre.round() as isize;
    let nominal = expected.round() as isize;
    let lag_from = nominal - spread - 1;
    let lag_to = nominal + spread + 1;
    let lowest = centre - half + lag_from.min(0);
    let highest = centre + half + lag_to.max(0);
    if half < 1 || lowest < 0 || highest >= samples.len() as isize {
        return None;
    }

    let window = |offset: isize| {
        let from = (centre - half + offset) as usize;
        &samples[from..=from + 2 * half as usize]
    };
    let reference = window(0);
    let reference_energy: f64 = reference.iter().map(|v| v * v).sum();
    if reference_energy <= 0.0 {
        return None;
    }
    let correlations: Vec<f64> = (lag_from..=lag_to)
        .map(|lag| {
            let shifted = window(lag);
            let energy: f64 = shifted.iter().map(|v| v * v).sum();
            if energy <= 0.0 {
                return 0.0;
            }
            reference.iter().zip(shifted).map(|(a, b)| a * b).sum::<f64>()
                / (reference_energy * energy).sqrt()
        })
        .collect();

    // Ends of `correlations` only serve as neighbours for interpolation.
    let (best_idx, best) = correlations[1..correlations.len() - 1]
        .iter()
        .enumerate()
        .map(|(idx, &r)| (idx + 1, r))
        .max_by(|a, b| a.1.total_cmp(&b.1))?;
    let (prev, next) = (correlations[best_idx - 1], correlations[best_idx + 1]);
    let curvature = 2.0 * best - prev - next;
    let (offset, peak) = if curvature > 0.0 {
        let offset = 0.5 * (next - prev) / curvature;
        (offset.clamp(-0.5, 0.5), best + 0.25 * (next - prev) * offset)
    } else {
        (0.0, best)
    };
    let lag = (lag_from + best_idx as isize) as f64 + offset;
    if lag == 0.0 {
        return None;
    }
    Some((lag, peak.min(1.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::pitch::{PitchSettings, to_pitch};
    use crate::analysis::test_signals::{silence, sine};

    #[test]
    fn pulses_follow_the_period_of_a_tone() {
        let sound = sine(125.0, 0.5, 16_000, 0.8);
        let pitch = to_pitch(&sound, &PitchSettings::new(75.0, 300.0)).unwrap();
        let points = to_point_process_periodic_cc(&sound, &pitch).unwrap();
        assert!(points.len() > 50, "only {} pulses", points.len());
        for pair in points.times().windows(2) {
            let period = pair[1] - pair[0];
            assert!((period - 0.008).abs() < 0.0002, "period {period}");
        }
    }

    #[test]
    fn silence_yields_no_pulses() {
        let sound = silence(16_000, 0.5);
        let pitch = to_pitch(&sound, &PitchSettings::new(75.0, 300.0)).unwrap();
        assert!(matches!(
            to_point_process_periodic_cc(&sound, &pitch),
            Err(AnalysisError::NoVoicedFrames)
        ));
    }

    #[test]
    fn from_times_sorts_and_dedups() {
        let points = PointProcess::from_times(vec![0.3, 0.1, f64::NAN, 0.1, 0.2]);
        assert_eq!(points.times(), &[0.1, 0.2, 0.3]);
    }
}
