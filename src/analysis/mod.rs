//! Acoustic analysis: waveform loading, voice measures and the feature extractor.

mod audio_decode;
mod error;
mod extract;
mod features;
mod fft;
pub mod harmonicity;
pub mod intensity;
pub mod jitter;
pub mod periods;
pub mod pitch;
pub mod point_process;
pub mod shimmer;
mod sound;
mod units;

pub use audio_decode::load_sound;
pub use error::{AnalysisError, PitchRangeError};
pub use extract::{
    Extraction, ExtractionStatus, PitchRange, Recording, RecordingSource, extract, extract_batch,
    extract_with_status, measure, measure_sound, recordings_from_paths,
};
pub use features::{FEATURE_COUNT, FEATURE_NAMES, FeatureVector};
pub use sound::Sound;
pub use units::PitchUnit;

#[cfg(test)]
pub(crate) mod test_signals {
    use std::f64::consts::PI;

    use rand::{Rng, SeedableRng, rngs::StdRng};

    use super::Sound;

    fn sample_count(sample_rate: u32, seconds: f64) -> usize {
        (seconds * sample_rate as f64).round() as usize
    }

    pub(crate) fn sine(frequency: f64, amplitude: f64, sample_rate: u32, seconds: f64) -> Sound {
        let sr = sample_rate as f64;
        let samples = (0..sample_count(sample_rate, seconds))
            .map(|i| amplitude * (2.0 * PI * frequency * i as f64 / sr).sin())
            .collect();
        Sound::new(samples, sample_rate)
    }

    pub(crate) fn silence(sample_rate: u32, seconds: f64) -> Sound {
        Sound::new(vec![0.0; sample_count(sample_rate, seconds)], sample_rate)
    }

    /// Sine plus uniform noise of peak `noise` from a fixed seed.
    pub(crate) fn noisy_sine(
        frequency: f64,
        amplitude: f64,
        noise: f64,
        sample_rate: u32,
        seconds: f64,
    ) -> Sound {
        let mut rng = StdRng::seed_from_u64(7);
        let clean = sine(frequency, amplitude, sample_rate, seconds);
        let samples = clean
            .samples()
            .iter()
            .map(|v| v + noise * rng.random_range(-1.0..=1.0))
            .collect();
        Sound::new(samples, sample_rate)
    }

    /// Tone whose frequency swings by `depth` Hz around `base` five times a second.
    pub(crate) fn vibrato(base: f64, depth: f64, sample_rate: u32, seconds: f64) -> Sound {
        let sr = sample_rate as f64;
        let mut phase = 0.0_f64;
        let samples = (0..sample_count(sample_rate, seconds))
            .map(|i| {
                let t = i as f64 / sr;
                let frequency = base + depth * (2.0 * PI * 5.0 * t).sin();
                let value = 0.5 * phase.sin() + 0.15 * (2.0 * phase).sin();
                phase += 2.0 * PI * frequency / sr;
                value
            })
            .collect();
        Sound::new(samples, sample_rate)
    }
}
