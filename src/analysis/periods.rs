use super::point_process::PointProcess;

/// Rules deciding which intervals between pulses count as glottal periods.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodFilter {
    /// Shortest admissible period in seconds.
    pub shortest: f64,
    /// Longest admissible period in seconds.
    pub longest: f64,
    /// Largest ratio allowed between neighbouring periods.
    pub max_factor: f64,
}

impl Default for PeriodFilter {
    fn default() -> Self {
        Self {
            shortest: 0.0001,
            longest: 0.02,
            max_factor: 1.3,
        }
    }
}

impl PeriodFilter {
    fn in_range(&self, period: f64) -> bool {
        period > 0.0 && period >= self.shortest && period <= self.longest
    }

    /// Whether the interval starting at pulse `index` is a period.
    ///
    /// The interval must lie in range and, when it has neighbours, be within `max_factor` of at
    /// least one of them.
    pub fn is_period(&self, times: &[f64], index: usize) -> bool {
        let Some(&right) = times.get(index + 1) else {
            return false;
        };
        let interval = right - times[index];
        if !self.in_range(interval) {
            return false;
        }
        let previous = index
            .checked_sub(1)
            .map(|left| times[index] - times[left])
            .filter(|p| *p > 0.0);
        let next = times.get(index + 2).map(|t| t - right).filter(|p| *p > 0.0);
        if previous.is_none() && next.is_none() {
            return true;
        }
        [previous, next]
            .into_iter()
            .flatten()
            .any(|neighbour| ratio(interval, neighbour) <= self.max_factor)
    }

    /// Mean length of the intervals accepted by [`Self::is_period`].
    pub fn mean_period(&self, points: &PointProcess) -> Option<f64> {
        let times = points.times();
        let (sum, count) = (0..times.len().saturating_sub(1))
            .filter(|&idx| self.is_period(times, idx))
            .fold((0.0, 0usize), |(sum, count), idx| {
                (sum + times[idx + 1] - times[idx], count + 1)
            });
        (count > 0).then(|| sum / count as f64)
    }

    /// Runs of `count` consecutive periods, each in range and within `max_factor` of the next.
    ///
    /// Yields the index of the first pulse with the period lengths.
    pub fn windows<'a>(
        &'a self,
        points: &'a PointProcess,
        count: usize,
    ) -> impl Iterator<Item = (usize, Vec<f64>)> + 'a {
        let times = points.times();
        (0..times.len().saturating_sub(count)).filter_map(move |first| {
            let periods: Vec<f64> = times[first..=first + count]
                .windows(2)
                .map(|pair| pair[1] - pair[0])
                .collect();
            let admissible = periods.iter().all(|&p| self.in_range(p))
                && periods
                    .windows(2)
                    .all(|pair| ratio(pair[0], pair[1]) <= self.max_factor);
            admissible.then_some((first, periods))
        })
    }
}

/// Ratio of the larger to the smaller value.
pub(crate) fn ratio(a: f64, b: f64) -> f64 {
    if a > b { a / b } else { b / a }
}
