//! Audio preprocessing for uploaded voice samples
//!
//! This module provides:
//! - Decoding of WAV, MP3, OGG and FLAC uploads
//! - Audio resampling
//! - Leading/trailing silence trimming
//! - 16-bit PCM WAV encoding

mod decode;
pub mod resample;
mod trim;
mod wav;

pub use decode::{decode, DecodeLimits, MAX_SOURCE_SAMPLE_RATE, MIN_SOURCE_SAMPLE_RATE};
pub use resample::{resample, ResampleQuality, Resampler};
pub use trim::{trim_silence, TrimConfig};
pub use wav::{decode_wav_pcm16, encode_wav_pcm16, quantize_pcm16};

/// Mono waveform with samples in \[-1.0, 1.0\].
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Duration in seconds
    pub fn duration(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Copy of this waveform with leading and trailing silence removed.
    pub fn trimmed(&self, config: &TrimConfig) -> Waveform {
        let range = trim_silence(&self.samples, config);
        Waveform::new(self.samples[range].to_vec(), self.sample_rate)
    }
}
