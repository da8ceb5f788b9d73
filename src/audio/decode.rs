//! Compressed/uncompressed audio decoding via symphonia.

use std::io::Cursor;

use anyhow::{anyhow, bail, Context, Result};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::Waveform;

/// Lowest source sample rate accepted from an upload.
pub const MIN_SOURCE_SAMPLE_RATE: u32 = 8000;
/// Highest source sample rate accepted from an upload.
pub const MAX_SOURCE_SAMPLE_RATE: u32 = 192_000;

/// Bounds checked while decoding, before the whole stream is held in memory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodeLimits {
    pub min_sample_rate: u32,
    pub max_sample_rate: u32,
    /// Longest accepted stream; `None` decodes everything.
    pub max_secs: Option<f32>,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            min_sample_rate: MIN_SOURCE_SAMPLE_RATE,
            max_sample_rate: MAX_SOURCE_SAMPLE_RATE,
            max_secs: None,
        }
    }
}

impl DecodeLimits {
    pub fn with_max_secs(mut self, secs: f32) -> Self {
        self.max_secs = Some(secs);
        self
    }
}

/// Decode an in-memory audio file into a mono waveform at its native rate.
///
/// `extension` is only a probing hint; the container is detected from the
/// bytes. Multi-channel input is downmixed by averaging channels. The stream
/// is rejected as soon as it breaks one of `limits`.
pub fn decode(bytes: Vec<u8>, extension: Option<&str>, limits: &DecodeLimits) -> Result<Waveform> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .context("Unrecognized audio container")?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| anyhow!("No audio track found"))?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| anyhow!("Unknown sample rate"))?;
    if sample_rate < limits.min_sample_rate || sample_rate > limits.max_sample_rate {
        bail!(
            "Sample rate of {sample_rate} Hz is outside the supported {}-{} Hz range",
            limits.min_sample_rate,
            limits.max_sample_rate
        );
    }
    let max_frames = limits
        .max_secs
        .map(|secs| (secs.max(0.0) as f64 * sample_rate as f64).ceil() as usize);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Unsupported audio codec")?;

    let mut interleaved: Vec<f32> = Vec::new();
    let mut channels = 1usize;
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                tracing::warn!(error = %e, "Error reading packet, stopping decode");
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                tracing::warn!(error = %e, "Skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(anyhow!("Audio decode failed: {e}")),
        };

        if sample_buf.is_none() {
            let spec = *decoded.spec();
            channels = spec.channels.count().max(1);
            sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
        }

        if let Some(buf) = sample_buf.as_mut() {
            buf.copy_interleaved_ref(decoded);
            interleaved.extend_from_slice(buf.samples());
        }

        if let (Some(max_frames), Some(max_secs)) = (max_frames, limits.max_secs) {
            if interleaved.len() / channels > max_frames {
                bail!("Audio is longer than {max_secs:.0}s");
            }
        }
    }

    if interleaved.is_empty() {
        bail!("Audio file contains no samples");
    }

    let samples = if channels > 1 {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    } else {
        interleaved
    };

    tracing::debug!(
        sample_rate,
        channels,
        samples = samples.len(),
        "Decoded uploaded audio"
    );

    Ok(Waveform::new(samples, sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{SampleFormat, WavSpec, WavWriter};

    fn wav_bytes(channels: u16, sample_rate: u32, frames: &[Vec<i16>]) -> Vec<u8> {
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
            for frame in frames {
                for &s in frame {
                    writer.write_sample(s).unwrap();
                }
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_decode_mono_wav() {
        let frames: Vec<Vec<i16>> = (0..1600).map(|i| vec![(i % 100) as i16 * 100]).collect();
        let wave = decode(wav_bytes(1, 16000, &frames), Some("wav"), &DecodeLimits::default()).unwrap();
        assert_eq!(wave.sample_rate, 16000);
        assert_eq!(wave.len(), 1600);
    }

    #[test]
    fn test_decode_stereo_downmix() {
        // Left at +half scale, right silent: the mono mix is a quarter scale.
        let frames: Vec<Vec<i16>> = (0..800).map(|_| vec![16384, 0]).collect();
        let wave = decode(wav_bytes(2, 22050, &frames), None, &DecodeLimits::default()).unwrap();
        assert_eq!(wave.sample_rate, 22050);
        assert_eq!(wave.len(), 800);
        assert!((wave.samples[10] - 0.25).abs() < 1e-3);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let result = decode(b"definitely not audio".to_vec(), Some("mp3"), &DecodeLimits::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_empty_wav_fails() {
        let result = decode(wav_bytes(1, 24000, &[]), Some("wav"), &DecodeLimits::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_mp3() {
        let bytes = include_bytes!("../../tests/fixtures/sample.mp3").to_vec();
        let wave = decode(bytes, Some("mp3"), &DecodeLimits::default()).unwrap();
        assert_eq!(wave.sample_rate, 22050);
        assert!(!wave.is_empty());
        assert!(wave.samples.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_decode_ogg_vorbis() {
        let bytes = include_bytes!("../../tests/fixtures/silence.ogg").to_vec();
        let wave = decode(bytes, Some("ogg"), &DecodeLimits::default()).unwrap();
        assert_eq!(wave.sample_rate, 16000);
        assert!(!wave.is_empty());
        assert!(wave.samples.iter().all(|s| s.abs() < 1e-3));
    }

    #[test]
    fn test_decode_flac() {
        let bytes = include_bytes!("../../tests/fixtures/tone.flac").to_vec();
        let wave = decode(bytes, Some("flac"), &DecodeLimits::default()).unwrap();
        assert_eq!(wave.sample_rate, 16000);
        assert_eq!(wave.len(), 8192);
        let peak = wave.samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!((peak - 0.5).abs() < 0.01, "peak {peak}");
    }

    #[test]
    fn test_decode_rejects_low_sample_rate() {
        let frames: Vec<Vec<i16>> = (0..40_000).map(|i| vec![(i % 200) as i16 * 50]).collect();
        let err = decode(wav_bytes(1, 8, &frames), Some("wav"), &DecodeLimits::default())
            .unwrap_err();
        assert!(err.to_string().contains("8 Hz"), "{err}");
    }

    #[test]
    fn test_decode_stops_past_max_secs() {
        let frames: Vec<Vec<i16>> = (0..16000 * 3).map(|_| vec![1000]).collect();
        let limits = DecodeLimits::default().with_max_secs(1.0);
        let err = decode(wav_bytes(1, 16000, &frames), Some("wav"), &limits).unwrap_err();
        assert!(err.to_string().contains("longer than"), "{err}");

        let limits = DecodeLimits::default().with_max_secs(5.0);
        let wave = decode(wav_bytes(1, 16000, &frames), Some("wav"), &limits).unwrap();
        assert_eq!(wave.len(), 16000 * 3);
    }
}
