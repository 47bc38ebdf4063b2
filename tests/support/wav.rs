use std::f32::consts::PI;
use std::path::Path;

pub const SAMPLE_RATE: u32 = 16_000;

pub fn write_test_wav(path: &Path, samples: &[f32], sample_rate: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create wav parent dirs");
    }
    let mut writer = hound::WavWriter::create(path, spec).expect("create wav writer");
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer.write_sample(value).expect("write wav sample");
    }
    writer.finalize().expect("finalize wav");
}

/// Sustained vowel stand-in: a two-harmonic tone with a 5 Hz vibrato around `base_hz`.
pub fn sustained_vowel(base_hz: f32, seconds: f32) -> Vec<f32> {
    let sr = SAMPLE_RATE as f32;
    let count = (seconds * sr).round() as usize;
    let mut phase = 0.0_f32;
    (0..count)
        .map(|i| {
            let t = i as f32 / sr;
            let frequency = base_hz + 5.0 * (2.0 * PI * 5.0 * t).sin();
            let value = 0.5 * phase.sin() + 0.15 * (2.0 * phase).sin();
            phase = (phase + 2.0 * PI * frequency / sr) % (2.0 * PI);
            value
        })
        .collect()
}

pub fn silence(seconds: f32) -> Vec<f32> {
    vec![0.0; (seconds * SAMPLE_RATE as f32).round() as usize]
}
