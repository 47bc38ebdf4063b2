use std::f64::consts::PI;
use std::sync::Arc;

use rustfft::{Fft, FftPlanner, num_complex::Complex};

/// Symmetric Hann window sampled at bin centres.
pub(crate) fn hann_window(length: usize) -> Vec<f64> {
    let n = length.max(1) as f64;
    (0..length.max(1))
        .map(|i| 0.5 - 0.5 * (2.0 * PI * (i as f64 + 0.5) / n).cos())
        .collect()
}

/// Reusable FFT plans for linear (zero-padded) autocorrelation of fixed-length frames.
pub(crate) struct Autocorrelator {
    frame_len: usize,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
    buffer: Vec<Complex<f64>>,
}

impl Autocorrelator {
    pub(crate) fn new(frame_len: usize) -> Self {
        let fft_len = (2 * frame_len.max(1)).next_power_of_two();
        let mut planner = FftPlanner::<f64>::new();
        Self {
            frame_len,
            forward: planner.plan_fft_forward(fft_len),
            inverse: planner.plan_fft_inverse(fft_len),
            buffer: vec![Complex::new(0.0, 0.0); fft_len],
        }
    }

    /// Write the raw autocorrelation `sum(x[i] * x[i + lag])` for lags `0..out.len()`.
    pub(crate) fn autocorrelate(&mut self, frame: &[f64], out: &mut [f64]) {
        let fft_len = self.buffer.len();
        for (idx, slot) in self.buffer.iter_mut().enumerate() {
            let value = if idx < self.frame_len {
                frame.get(idx).copied().unwrap_or(0.0)
            } else {
                0.0
            };
            *slot = Complex::new(value, 0.0);
        }
        self.forward.process(&mut self.buffer);
        for bin in &mut self.buffer {
            *bin = Complex::new(bin.norm_sqr(), 0.0);
        }
        self.inverse.process(&mut self.buffer);
        let scale = 1.0 / fft_len as f64;
        for (lag, value) in out.iter_mut().enumerate() {
            *value = self.buffer.get(lag).map(|c| c.re * scale).unwrap_or(0.0);
        }
    }
}
