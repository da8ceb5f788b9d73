//! In-memory 16-bit PCM WAV encoding and decoding.

use std::io::Cursor;

use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use super::Waveform;

/// Convert float samples to 16-bit PCM.
///
/// Samples are clamped to \[-1.0, 1.0\] and scaled by 32767, truncating
/// toward zero.
pub fn quantize_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
        .collect()
}

/// Encode mono PCM16 samples as a WAV file held in memory.
pub fn encode_wav_pcm16(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>> {
    anyhow::ensure!(sample_rate > 0, "sample_rate must be > 0");
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    {
        let mut writer =
            WavWriter::new(&mut cursor, spec).context("Failed to start WAV stream")?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize().context("Failed to finalize WAV stream")?;
    }
    Ok(cursor.into_inner())
}

/// Decode an in-memory WAV file into a mono float waveform.
pub fn decode_wav_pcm16(bytes: &[u8]) -> Result<Waveform> {
    let reader = WavReader::new(Cursor::new(bytes)).context("Invalid WAV data")?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    let mono = if channels > 1 {
        samples
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    } else {
        samples
    };

    Ok(Waveform::new(mono, spec.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantize_scale_and_clamp() {
        let pcm = quantize_pcm16(&[0.0, 1.0, -1.0, 0.5, 2.0, -3.0]);
        assert_eq!(pcm, vec![0, 32767, -32767, 16383, 32767, -32767]);
    }

    #[test]
    fn test_encode_header() {
        let wav = encode_wav_pcm16(&[0, 1, -1, 100], 24000).unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(wav.len(), 44 + 4 * 2);

        let reader = WavReader::new(Cursor::new(&wav)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 24000);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_format, SampleFormat::Int);
    }

    #[test]
    fn test_decode_written_wav() {
        let pcm = quantize_pcm16(&[0.25, -0.5, 0.75]);
        let wav = encode_wav_pcm16(&pcm, 16000).unwrap();
        let wave = decode_wav_pcm16(&wav).unwrap();
        assert_eq!(wave.sample_rate, 16000);
        assert_eq!(wave.len(), 3);
        assert!((wave.samples[1] + 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_zero_rate_rejected() {
        assert!(encode_wav_pcm16(&[0, 0], 0).is_err());
    }

    #[test]
    fn test_decode_invalid_bytes() {
        assert!(decode_wav_pcm16(b"RIFFnope").is_err());
    }
}
