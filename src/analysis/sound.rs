/// Mono waveform with its sample rate, the common input of every acoustic measure.
///
/// Sample `i` sits at time `i / sample_rate` seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct Sound {
    samples: Vec<f64>,
    sample_rate: u32,
}

impl Sound {
    /// Wrap mono samples; non-finite values are replaced with silence.
    pub fn new(mut samples: Vec<f64>, sample_rate: u32) -> Self {
        for sample in &mut samples {
            if !sample.is_finite() {
                *sample = 0.0;
            }
        }
        Self {
            samples,
            sample_rate: sample_rate.max(1),
        }
    }

    /// Downmix interleaved samples to mono by averaging channels.
    pub fn from_interleaved(samples: &[f32], sample_rate: u32, channels: u16) -> Self {
        let channels = channels.max(1) as usize;
        let mono = samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().map(|&v| v as f64).sum::<f64>() / channels as f64)
            .collect();
        Self::new(mono, sample_rate)
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Total duration in seconds.
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Largest absolute sample value.
    pub fn absolute_peak(&self) -> f64 {
        self.samples.iter().fold(0.0_f64, |peak, v| peak.max(v.abs()))
    }

    pub(crate) fn time_to_index(&self, time: f64) -> f64 {
        time * self.sample_rate as f64
    }

    pub(crate) fn index_to_time(&self, index: f64) -> f64 {
        index / self.sample_rate as f64
    }

    /// Time of the sample with the largest magnitude in `[from, to]`.
    pub(crate) fn time_of_absolute_extremum(&self, from: f64, to: f64) -> Option<f64> {
        let last = self.samples.len().checked_sub(1)?;
        let start = self.time_to_index(from).ceil().max(0.0) as usize;
        let end = (self.time_to_index(to).floor().max(0.0) as usize).min(last);
        if start > end {
            return None;
        }
        let (offset, _) = self.samples[start..=end]
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))?;
        Some(self.index_to_time((start + offset) as f64))
    }
}
