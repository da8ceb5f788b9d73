//! Voice-sample preprocessing: turns whatever the user uploaded into a clean
//! mono 16-bit WAV at the model's sample rate.
//!
//! Steps, in order:
//! 1. extension and upload-size checks
//! 2. decode and downmix, bounded by sample rate and raw duration
//! 3. resample to [`TARGET_SAMPLE_RATE`]
//! 4. trim leading/trailing silence
//! 5. reference-duration check
//! 6. quantize to PCM16 and encode as WAV

use std::str::FromStr;
use std::time::Instant;

use serde::Serialize;

use crate::audio::{self, DecodeLimits, ResampleQuality, Resampler, TrimConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::limits::InputLimits;

/// Native sample rate of the speaker encoder.
pub const TARGET_SAMPLE_RATE: u32 = 24000;

/// Accepted upload containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Wav,
    Mp3,
    Ogg,
    Flac,
}

impl AudioFormat {
    pub const ALL: [AudioFormat; 4] = [
        AudioFormat::Wav,
        AudioFormat::Mp3,
        AudioFormat::Ogg,
        AudioFormat::Flac,
    ];

    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Flac => "flac",
        }
    }

    /// Format implied by the text after the last `.` of a file name.
    pub fn from_filename(filename: &str) -> PipelineResult<Self> {
        let (_, ext) = filename
            .rsplit_once('.')
            .ok_or(PipelineError::UnsupportedFormat)?;
        ext.parse()
    }
}

impl FromStr for AudioFormat {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wav" | "wave" => Ok(AudioFormat::Wav),
            "mp3" => Ok(AudioFormat::Mp3),
            "ogg" | "oga" => Ok(AudioFormat::Ogg),
            "flac" => Ok(AudioFormat::Flac),
            _ => Err(PipelineError::UnsupportedFormat),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreprocessConfig {
    pub target_sample_rate: u32,
    pub trim: TrimConfig,
    pub resample_quality: ResampleQuality,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: TARGET_SAMPLE_RATE,
            trim: TrimConfig::default(),
            resample_quality: ResampleQuality::Normal,
        }
    }
}

/// Reference voice ready for the model.
#[derive(Debug, Clone)]
pub struct ProcessedSample {
    /// Mono PCM16 WAV bytes
    pub wav: Vec<u8>,
    pub format: AudioFormat,
    pub sample_rate: u32,
    pub num_samples: usize,
    /// Duration after trimming
    pub duration_secs: f32,
    /// Silence removed by trimming
    pub trimmed_secs: f32,
}

/// Validate, decode and normalise an uploaded voice sample.
pub fn process_upload(
    filename: &str,
    bytes: Vec<u8>,
    limits: &InputLimits,
    config: &PreprocessConfig,
) -> PipelineResult<ProcessedSample> {
    let start = Instant::now();
    let format = AudioFormat::from_filename(filename)?;
    limits.validate_upload_size(bytes.len())?;
    let upload_bytes = bytes.len();

    let decode_limits = DecodeLimits::default().with_max_secs(limits.max_decoded_secs());
    let decoded = audio::decode(bytes, Some(format.extension()), &decode_limits)
        .map_err(PipelineError::Audio)?;
    let resampled = Resampler::new(config.resample_quality)
        .resample(&decoded, config.target_sample_rate)
        .map_err(PipelineError::Audio)?;
    let trimmed = resampled.trimmed(&config.trim);

    let duration_secs = trimmed.duration();
    let trimmed_secs = (resampled.duration() - duration_secs).max(0.0);
    limits.validate_reference_duration(duration_secs)?;

    let pcm = audio::quantize_pcm16(&trimmed.samples);
    let wav =
        audio::encode_wav_pcm16(&pcm, config.target_sample_rate).map_err(PipelineError::Audio)?;

    tracing::info!(
        filename,
        format = format.extension(),
        upload_bytes,
        source_rate = decoded.sample_rate,
        duration_secs,
        trimmed_secs,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Preprocessed voice sample"
    );

    Ok(ProcessedSample {
        wav,
        format,
        sample_rate: config.target_sample_rate,
        num_samples: pcm.len(),
        duration_secs,
        trimmed_secs,
    })
}
