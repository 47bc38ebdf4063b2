use std::f64::consts::PI;
use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use voicescreen::analysis::{PitchRange, PitchUnit, Sound, measure_sound};

const SAMPLE_RATE: u32 = 16_000;

fn sustained_vowel(seconds: f64) -> Sound {
    let sr = SAMPLE_RATE as f64;
    let mut phase = 0.0_f64;
    let samples = (0..(seconds * sr) as usize)
        .map(|i| {
            let t = i as f64 / sr;
            let frequency = 160.0 + 4.0 * (2.0 * PI * 5.0 * t).sin();
            let value = 0.5 * phase.sin() + 0.15 * (2.0 * phase).sin();
            phase += 2.0 * PI * frequency / sr;
            value
        })
        .collect();
    Sound::new(samples, SAMPLE_RATE)
}

fn bench_measure(c: &mut Criterion) {
    for seconds in [1.0, 3.0] {
        let sound = sustained_vowel(seconds);
        c.bench_with_input(
            BenchmarkId::new("measure_sound", format!("{seconds}s")),
            &sound,
            |b, sound| {
                b.iter(|| {
                    measure_sound(black_box(sound), PitchRange::default(), PitchUnit::Hertz)
                        .expect("measure_sound");
                });
            },
        );
    }
}

criterion_group!(benches, bench_measure);
criterion_main!(benches);
