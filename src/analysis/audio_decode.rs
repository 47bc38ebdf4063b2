use std::fs::File;
use std::path::Path;

use symphonia::core::{
    audio::SampleBuffer, codecs::DecoderOptions, errors::Error, formats::FormatOptions,
    io::MediaSourceStream, meta::MetadataOptions, probe::Hint,
};

use super::error::AnalysisError;
use super::sound::Sound;

/// Raw decoded audio in interleaved `f32` samples.
struct DecodedAudio {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

/// Load a recording as a mono [`Sound`].
///
/// WAV files are read with `hound`; anything else (or a WAV `hound` rejects) goes through
/// symphonia's probe.
pub fn load_sound(path: &Path) -> Result<Sound, AnalysisError> {
    let is_wav = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wav") || ext.eq_ignore_ascii_case("wave"));
    let decoded = if is_wav {
        decode_with_hound(path).or_else(|hound_err| {
            decode_with_symphonia(path)
                .map_err(|err| format!("{hound_err}; fallback decoder: {err}"))
        })
    } else {
        decode_with_symphonia(path)
    }
    .map_err(|reason| AnalysisError::Decode {
        path: path.to_path_buf(),
        reason,
    })?;
    tracing::debug!(
        path = %path.display(),
        sample_rate = decoded.sample_rate,
        channels = decoded.channels,
        frames = decoded.samples.len() / decoded.channels.max(1) as usize,
        "decoded recording"
    );
    Ok(Sound::from_interleaved(
        &decoded.samples,
        decoded.sample_rate,
        decoded.channels,
    ))
}

fn decode_with_hound(path: &Path) -> Result<DecodedAudio, String> {
    let mut reader = hound::WavReader::open(path).map_err(|err| format!("Open WAV: {err}"))?;
    let spec = reader.spec();
    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| format!("Read WAV samples: {err}"))?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1_i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|v| v as f32 * scale))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|err| format!("Read WAV samples: {err}"))?
        }
    };
    if samples.is_empty() {
        return Err("WAV file holds no samples".to_string());
    }
    Ok(DecodedAudio {
        samples,
        sample_rate: spec.sample_rate.max(1),
        channels: spec.channels.max(1),
    })
}

fn decode_with_symphonia(path: &Path) -> Result<DecodedAudio, String> {
    let file = File::open(path).map_err(|err| format!("Open {}: {err}", path.display()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|err| format!("Symphonia probe failed: {err}"))?;
    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| "No default track".to_string())?;
    let codec_params = &track.codec_params;
    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| "Missing sample rate".to_string())?;
    let channels = codec_params
        .channels
        .ok_or_else(|| "Missing channel count".to_string())?
        .count() as u16;

    let mut decoder = symphonia::default::get_codecs()
        .make(codec_params, &DecoderOptions::default())
        .map_err(|err| format!("Symphonia decoder failed: {err}"))?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(Error::IoError(_)) => break,
            Err(err) => return Err(format!("Symphonia packet read failed: {err}")),
        };
        let audio_buf = match decoder.decode(&packet) {
            Ok(audio_buf) => audio_buf,
            Err(Error::DecodeError(_)) => continue,
            Err(err) => return Err(format!("Symphonia decode failed: {err}")),
        };
        let spec = *audio_buf.spec();
        let mut sample_buf = SampleBuffer::<f32>::new(audio_buf.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(audio_buf);
        samples.extend_from_slice(sample_buf.samples());
    }

    if samples.is_empty() {
        return Err("Symphonia decoded 0 samples".to_string());
    }

    Ok(DecodedAudio {
        samples,
        sample_rate: sample_rate.max(1),
        channels: channels.max(1),
    })
}
