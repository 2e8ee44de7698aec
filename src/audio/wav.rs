//! WAV decoding into normalized mono waveforms.
//!
//! Integer PCM is scaled by the format's positive maximum so full-scale input
//! maps to [-1, 1]. Multi-channel recordings keep only their first channel.

use std::path::Path;

use super::Waveform;
use crate::error::AudioError;

/// Load a WAV file, optionally resampling to `target_rate`
pub fn load_wav<P: AsRef<Path>>(path: P, target_rate: Option<u32>) -> Result<Waveform, AudioError> {
    let path = path.as_ref();
    let wave = read_wav(path)?;
    if wave.sample_rate == 0 {
        return Err(AudioError::InvalidSampleRate { rate: 0 });
    }

    match target_rate {
        Some(rate) if rate != wave.sample_rate => {
            tracing::debug!(
                "[Wav] Resampling {} from {} Hz to {} Hz",
                path.display(),
                wave.sample_rate,
                rate
            );
            Ok(wave.resampled(rate))
        }
        _ => Ok(wave),
    }
}

/// Write a mono 32-bit float WAV file
pub fn write_wav<P: AsRef<Path>>(path: P, wave: &Waveform) -> Result<(), AudioError> {
    let path = path.as_ref();
    let write_err = |err: hound::Error| AudioError::WriteFailed {
        path: path.to_path_buf(),
        reason: err.to_string(),
    };

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: wave.sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec).map_err(write_err)?;
    for &sample in &wave.samples {
        writer.write_sample(sample).map_err(write_err)?;
    }
    writer.finalize().map_err(write_err)
}

fn read_wav(path: &Path) -> Result<Waveform, AudioError> {
    let decode_err = |err: hound::Error| AudioError::DecodeFailed {
        path: path.to_path_buf(),
        reason: err.to_string(),
    };

    let mut reader = hound::WavReader::open(path).map_err(decode_err)?;
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(AudioError::DecodeFailed {
            path: path.to_path_buf(),
            reason: "zero channels".to_string(),
        });
    }

    let interleaved = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|sample| sample.map_err(decode_err))
            .collect::<Result<Vec<f32>, _>>()?,
        hound::SampleFormat::Int => match spec.bits_per_sample {
            8 => reader
                .samples::<i8>()
                .map(|sample| sample.map(|v| v as f32 / i8::MAX as f32).map_err(decode_err))
                .collect::<Result<Vec<f32>, _>>()?,
            16 => reader
                .samples::<i16>()
                .map(|sample| sample.map(|v| v as f32 / i16::MAX as f32).map_err(decode_err))
                .collect::<Result<Vec<f32>, _>>()?,
            24 | 32 => {
                let max = ((1i64 << (spec.bits_per_sample - 1)) - 1) as f32;
                reader
                    .samples::<i32>()
                    .map(|sample| sample.map(|v| v as f32 / max).map_err(decode_err))
                    .collect::<Result<Vec<f32>, _>>()?
            }
            bits => {
                return Err(AudioError::UnsupportedFormat {
                    path: path.to_path_buf(),
                    bits,
                })
            }
        },
    };

    let samples = if spec.channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(spec.channels as usize)
            .map(|frame| frame[0])
            .collect()
    };

    Ok(Waveform::new(samples, spec.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let wave = Waveform::new(vec![0.0, 0.5, -0.25, 1.0], 8_000);
        write_wav(&path, &wave).unwrap();

        let loaded = load_wav(&path, None).unwrap();
        assert_eq!(loaded, wave);
    }

    #[test]
    fn test_stereo_keeps_first_channel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for (left, right) in [(i16::MAX, 0i16), (0, i16::MAX), (-i16::MAX, 100)] {
            writer.write_sample(left).unwrap();
            writer.write_sample(right).unwrap();
        }
        writer.finalize().unwrap();

        let loaded = load_wav(&path, None).unwrap();
        assert_eq!(loaded.sample_rate, 16_000);
        assert_eq!(loaded.samples, vec![1.0, 0.0, -1.0]);
    }

    #[test]
    fn test_load_with_target_rate_resamples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.wav");
        write_wav(&path, &Waveform::new(vec![0.1; 8_000], 8_000)).unwrap();

        let loaded = load_wav(&path, Some(16_000)).unwrap();
        assert_eq!(loaded.sample_rate, 16_000);
        assert_eq!(loaded.len(), 16_000);
    }

    #[test]
    fn test_missing_file_is_decode_error() {
        let err = load_wav("/nonexistent/clip.wav", None).unwrap_err();
        assert!(matches!(err, AudioError::DecodeFailed { .. }));
    }
}
