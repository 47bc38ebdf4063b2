//! Amplitude perturbation measures over a pulse train.
//!
//! The amplitude of a period is the peak absolute sample between its two pulses.

use super::jitter::mean;
use super::periods::{PeriodFilter, ratio};
use super::point_process::PointProcess;
use super::sound::Sound;

/// Period rules plus the largest ratio allowed between neighbouring period amplitudes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmplitudeFilter {
    pub periods: PeriodFilter,
    pub max_amplitude_factor: f64,
}

impl Default for AmplitudeFilter {
    fn default() -> Self {
        Self {
            periods: PeriodFilter::default(),
            max_amplitude_factor: 1.6,
        }
    }
}

/// Per-period amplitudes of a pulse train, computed once and shared by all shimmer measures.
pub struct PeriodAmplitudes<'a> {
    points: &'a PointProcess,
    filter: AmplitudeFilter,
    amplitudes: Vec<f64>,
}

impl<'a> PeriodAmplitudes<'a> {
    pub fn new(sound: &Sound, points: &'a PointProcess, filter: AmplitudeFilter) -> Self {
        let samples = sound.samples();
        let last = samples.len().saturating_sub(1);
        let amplitudes = points
            .times()
            .windows(2)
            .map(|pair| {
                let from = (sound.time_to_index(pair[0]).round().max(0.0) as usize).min(last);
                let to = (sound.time_to_index(pair[1]).round().max(0.0) as usize).min(last);
                samples
                    .get(from..=to)
                    .unwrap_or(&[])
                    .iter()
                    .fold(0.0_f64, |peak, v| peak.max(v.abs()))
            })
            .collect();
        Self {
            points,
            filter,
            amplitudes,
        }
    }

    fn windows(&self, count: usize) -> impl Iterator<Item = &[f64]> + '_ {
        self.filter
            .periods
            .windows(self.points, count)
            .map(move |(first, _)| &self.amplitudes[first..first + count])
            .filter(|amps| {
                amps.iter().all(|&a| a > 0.0)
                    && amps
                        .windows(2)
                        .all(|pair| ratio(pair[0], pair[1]) <= self.filter.max_amplitude_factor)
            })
    }

    fn mean_amplitude(&self) -> Option<f64> {
        let times = self.points.times();
        mean(
            (0..self.amplitudes.len())
                .filter(|&idx| self.filter.periods.is_period(times, idx))
                .map(|idx| self.amplitudes[idx]),
        )
    }

    fn relative(&self, numerator: Option<f64>) -> Option<f64> {
        let denominator = self.mean_amplitude().filter(|m| *m > 0.0)?;
        Some(numerator? / denominator)
    }

    fn smoothed_deviation(&self, width: usize) -> Option<f64> {
        mean(self.windows(width).map(|amps| {
            let average = amps.iter().sum::<f64>() / width as f64;
            (amps[width / 2] - average).abs()
        }))
    }

    /// Mean absolute difference of consecutive amplitudes relative to the mean amplitude.
    pub fn shimmer_local(&self) -> Option<f64> {
        self.relative(mean(self.windows(2).map(|a| (a[1] - a[0]).abs())))
    }

    /// Mean absolute level difference of consecutive periods in dB.
    pub fn shimmer_local_db(&self) -> Option<f64> {
        mean(self.windows(2).map(|a| (20.0 * (a[1] / a[0]).log10()).abs()))
    }

    pub fn shimmer_apq3(&self) -> Option<f64> {
        self.relative(self.smoothed_deviation(3))
    }

    pub fn shimmer_apq5(&self) -> Option<f64> {
        self.relative(self.smoothed_deviation(5))
    }

    pub fn shimmer_apq11(&self) -> Option<f64> {
        self.relative(self.smoothed_deviation(11))
    }
}
