//! Period perturbation measures over a pulse train.

use super::periods::PeriodFilter;
use super::point_process::PointProcess;

/// Mean absolute difference between consecutive periods, in seconds.
pub fn jitter_local_absolute(points: &PointProcess, filter: &PeriodFilter) -> Option<f64> {
    mean(filter.windows(points, 2).map(|(_, p)| (p[1] - p[0]).abs()))
}

/// [`jitter_local_absolute`] relative to the mean period.
pub fn jitter_local(points: &PointProcess, filter: &PeriodFilter) -> Option<f64> {
    relative(jitter_local_absolute(points, filter), points, filter)
}

/// Relative average perturbation: each period against the mean of itself and its two neighbours.
pub fn jitter_rap(points: &PointProcess, filter: &PeriodFilter) -> Option<f64> {
    relative(smoothed_deviation(points, filter, 3), points, filter)
}

/// Five-point period perturbation quotient.
pub fn jitter_ppq5(points: &PointProcess, filter: &PeriodFilter) -> Option<f64> {
    relative(smoothed_deviation(points, filter, 5), points, filter)
}

fn smoothed_deviation(points: &PointProcess, filter: &PeriodFilter, width: usize) -> Option<f64> {
    mean(filter.windows(points, width).map(|(_, periods)| {
        let average = periods.iter().sum::<f64>() / width as f64;
        (periods[width / 2] - average).abs()
    }))
}

fn relative(numerator: Option<f64>, points: &PointProcess, filter: &PeriodFilter) -> Option<f64> {
    let mean_period = filter.mean_period(points)?;
    Some(numerator? / mean_period)
}

pub(crate) fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}
