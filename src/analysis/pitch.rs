//! Autocorrelation pitch tracker with a Viterbi path through per-frame candidates.
//!
//! Each frame holds up to `max_candidates` candidates: one unvoiced candidate plus the strongest
//! local maxima of the window-corrected, normalized autocorrelation inside
//! `[1 / ceiling, 1 / floor]`. The final contour is the path maximizing candidate strength minus
//! voiced/unvoiced switches and octave jumps.

use super::error::AnalysisError;
use super::fft::{Autocorrelator, hann_window};
use super::sound::Sound;
use super::units::PitchUnit;

/// Parameters of the autocorrelation pitch tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct PitchSettings {
    /// Lowest pitch searched for, in Hz.
    pub floor: f64,
    /// Highest pitch searched for, in Hz.
    pub ceiling: f64,
    /// Frame step in seconds; `None` uses `0.75 / floor`.
    pub time_step: Option<f64>,
    pub periods_per_window: f64,
    pub max_candidates: usize,
    pub silence_threshold: f64,
    pub voicing_threshold: f64,
    pub octave_cost: f64,
    pub octave_jump_cost: f64,
    pub voiced_unvoiced_cost: f64,
}

impl PitchSettings {
    pub fn new(floor: f64, ceiling: f64) -> Self {
        Self {
            floor,
            ceiling,
            time_step: None,
            periods_per_window: 3.0,
            max_candidates: 15,
            silence_threshold: 0.03,
            voicing_threshold: 0.45,
            octave_cost: 0.01,
            octave_jump_cost: 0.35,
            voiced_unvoiced_cost: 0.14,
        }
    }

    fn effective_time_step(&self) -> f64 {
        self.time_step
            .filter(|step| *step > 0.0)
            .unwrap_or(0.75 / self.floor)
    }
}

/// One analysis frame of a pitch contour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchFrame {
    /// Frame centre in seconds.
    pub time: f64,
    /// Selected frequency in Hz, `None` when unvoiced.
    pub frequency: Option<f64>,
    /// Correlation strength of the selected candidate.
    pub strength: f64,
}

/// Pitch contour sampled at a fixed time step.
#[derive(Debug, Clone, PartialEq)]
pub struct Pitch {
    time_step: f64,
    duration: f64,
    frames: Vec<PitchFrame>,
}

impl Pitch {
    pub fn frames(&self) -> &[PitchFrame] {
        &self.frames
    }

    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    /// Voiced frame frequencies converted to `unit`.
    pub fn voiced_values(&self, unit: PitchUnit) -> Vec<f64> {
        self.frames
            .iter()
            .filter_map(|frame| frame.frequency)
            .map(|hz| unit.from_hertz(hz))
            .collect()
    }

    /// Mean over voiced frames, `None` if nothing is voiced.
    pub fn mean(&self, unit: PitchUnit) -> Option<f64> {
        let values = self.voiced_values(unit);
        if values.is_empty() {
            return None;
        }
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }

    /// Sample standard deviation over voiced frames, `None` with fewer than two voiced frames.
    pub fn standard_deviation(&self, unit: PitchUnit) -> Option<f64> {
        let values = self.voiced_values(unit);
        if values.len() < 2 {
            return None;
        }
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let sum_sq: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
        Some((sum_sq / (values.len() - 1) as f64).sqrt())
    }

    /// Frequency in Hz at `time`, linearly interpolated between neighbouring voiced frames.
    pub fn frequency_at(&self, time: f64) -> Option<f64> {
        let first = self.frames.first()?;
        let position = (time - first.time) / self.time_step;
        let last_index = self.frames.len() - 1;
        if position <= 0.0 {
            return first.frequency;
        }
        if position >= last_index as f64 {
            return self.frames[last_index].frequency;
        }
        let left = position.floor() as usize;
        let fraction = position - left as f64;
        match (self.frames[left].frequency, self.frames[left + 1].frequency) {
            (Some(a), Some(b)) => Some(a + (b - a) * fraction),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        }
    }

    /// Time spans covered by consecutive voiced frames.
    pub fn voiced_intervals(&self) -> Vec<(f64, f64)> {
        let half = 0.5 * self.time_step;
        let mut intervals = Vec::new();
        let mut open: Option<(f64, f64)> = None;
        for frame in &self.frames {
            if frame.frequency.is_some() {
                match open.as_mut() {
                    Some(span) => span.1 = frame.time + half,
                    None => open = Some((frame.time - half, frame.time + half)),
                }
            } else if let Some(span) = open.take() {
                intervals.push(span);
            }
        }
        intervals.extend(open);
        intervals
            .into_iter()
            .map(|(start, end)| (start.max(0.0), end.min(self.duration)))
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    frequency: Option<f64>,
    strength: f64,
}

/// Track pitch through `sound` with the autocorrelation method.
pub fn to_pitch(sound: &Sound, settings: &PitchSettings) -> Result<Pitch, AnalysisError> {
    let sample_rate = sound.sample_rate() as f64;
    let time_step = settings.effective_time_step();
    let window_duration = settings.periods_per_window / settings.floor;
    let window_len = (window_duration * sample_rate).round() as usize;
    if window_len < 4 || sound.len() < window_len {
        return Err(AnalysisError::TooShort {
            measure: "pitch",
            duration: sound.duration(),
            required: window_duration,
        });
    }
    let min_lag = ((sample_rate / settings.ceiling).floor() as usize).max(2);
    let max_lag = ((sample_rate / settings.floor).ceil() as usize).min(window_len / 2);
    if max_lag <= min_lag + 1 {
        return Err(AnalysisError::Undefined { measure: "pitch" });
    }

    let duration = sound.duration();
    let frame_count = ((duration - window_duration) / time_step).floor() as usize + 1;
    let first_time = 0.5 * (duration - (frame_count - 1) as f64 * time_step);

    let samples = sound.samples();
    let global_mean = samples.iter().sum::<f64>() / samples.len() as f64;
    let global_peak = samples
        .iter()
        .fold(0.0_f64, |peak, v| peak.max((v - global_mean).abs()));

    let window = hann_window(window_len);
    let mut autocorrelator = Autocorrelator::new(window_len);
    let mut window_ac = vec![0.0; max_lag + 2];
    autocorrelator.autocorrelate(&window, &mut window_ac);
    let window_energy = window_ac[0];

    let mut frame_buf = vec![0.0; window_len];
    let mut frame_ac = vec![0.0; max_lag + 2];
    let mut normalized = vec![0.0; max_lag + 2];
    let mut candidates_per_frame = Vec::with_capacity(frame_count);
    for frame_idx in 0..frame_count {
        let time = first_time + frame_idx as f64 * time_step;
        let start = (sound.time_to_index(time).round() as isize - (window_len / 2) as isize)
            .clamp(0, (samples.len() - window_len) as isize) as usize;
        let segment = &samples[start..start + window_len];
        let local_mean = segment.iter().sum::<f64>() / window_len as f64;
        let mut local_peak = 0.0_f64;
        for (slot, (&value, &w)) in frame_buf.iter_mut().zip(segment.iter().zip(&window)) {
            let centred = value - local_mean;
            local_peak = local_peak.max(centred.abs());
            *slot = centred * w;
        }

        let intensity_ratio = if global_peak > 0.0 {
            local_peak / global_peak
        } else {
            0.0
        };
        let unvoiced_strength = settings.voicing_threshold
            + (2.0
                - intensity_ratio / (settings.silence_threshold / (1.0 + settings.voicing_threshold)))
                .max(0.0);
        let mut candidates = vec![Candidate {
            frequency: None,
            strength: unvoiced_strength,
        }];

        autocorrelator.autocorrelate(&frame_buf, &mut frame_ac);
        if frame_ac[0] > 0.0 {
            for lag in 0..normalized.len() {
                normalized[lag] = (frame_ac[lag] / frame_ac[0]) / (window_ac[lag] / window_energy);
            }
            collect_voiced_candidates(
                &normalized,
                min_lag,
                max_lag,
                sample_rate,
                settings,
                &mut candidates,
            );
        }
        candidates_per_frame.push((time, candidates));
    }

    let path = viterbi_path(&candidates_per_frame, time_step, settings);
    let frames = candidates_per_frame
        .iter()
        .zip(path)
        .map(|((time, candidates), choice)| {
            let candidate = candidates[choice];
            PitchFrame {
                time: *time,
                frequency: candidate.frequency,
                strength: candidate.strength,
            }
        })
        .collect();
    Ok(Pitch {
        time_step,
        duration,
        frames,
    })
}

fn collect_voiced_candidates(
    r: &[f64],
    min_lag: usize,
    max_lag: usize,
    sample_rate: f64,
    settings: &PitchSettings,
    candidates: &mut Vec<Candidate>,
) {
    let mut voiced = Vec::new();
    for lag in min_lag..=max_lag {
        let (prev, here, next) = (r[lag - 1], r[lag], r[lag + 1]);
        if here <= 0.5 * settings.voicing_threshold || here <= prev || here < next {
            continue;
        }
        let slope = 0.5 * (next - prev);
        let curvature = 2.0 * here - prev - next;
        let (offset, mut peak) = if curvature > 0.0 {
            let offset = slope / curvature;
            (offset, here + 0.5 * slope * offset)
        } else {
            (0.0, here)
        };
        if peak > 1.0 {
            peak = 1.0 / peak;
        }
        let frequency = sample_rate / (lag as f64 + offset);
        if frequency < settings.floor || frequency > settings.ceiling {
            continue;
        }
        let strength = peak + settings.octave_cost * (frequency / settings.floor).log2();
        voiced.push(Candidate {
            frequency: Some(frequency),
            strength,
        });
    }
    voiced.sort_by(|a, b| b.strength.total_cmp(&a.strength));
    voiced.truncate(settings.max_candidates.saturating_sub(1));
    candidates.extend(voiced);
}

fn viterbi_path(
    frames: &[(f64, Vec<Candidate>)],
    time_step: f64,
    settings: &PitchSettings,
) -> Vec<usize> {
    let Some((_, first)) = frames.first() else {
        return Vec::new();
    };
    let correction = 0.01 / time_step;
    let jump_cost = settings.octave_jump_cost * correction;
    let switch_cost = settings.voiced_unvoiced_cost * correction;
    let transition = |from: &Candidate, to: &Candidate| match (from.frequency, to.frequency) {
        (None, None) => 0.0,
        (Some(a), Some(b)) => jump_cost * (a / b).log2().abs(),
        _ => switch_cost,
    };

    let mut score: Vec<f64> = first.iter().map(|c| c.strength).collect();
    let mut back: Vec<Vec<usize>> = Vec::with_capacity(frames.len());
    back.push(vec![0; first.len()]);
    for window in frames.windows(2) {
        let (previous, current) = (&window[0].1, &window[1].1);
        let mut next_score = Vec::with_capacity(current.len());
        let mut pointers = Vec::with_capacity(current.len());
        for to in current {
            let (best_idx, best) = previous
                .iter()
                .enumerate()
                .map(|(idx, from)| (idx, score[idx] - transition(from, to)))
                .max_by(|a, b| a.1.total_cmp(&b.1))
                .unwrap_or((0, f64::NEG_INFINITY));
            next_score.push(best + to.strength);
            pointers.push(best_idx);
        }
        score = next_score;
        back.push(pointers);
    }

    let mut choice = score
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    let mut path = vec![0; frames.len()];
    for frame in (0..frames.len()).rev() {
        path[frame] = choice;
        choice = back[frame][choice];
    }
    path
}
