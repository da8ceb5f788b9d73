//! Voice-cloned synthesis.
//!
//! [`VoiceCloner`] is the seam between the web layer and the pretrained
//! model. [`Qwen3Cloner`] is the production backend: it loads the model once
//! and shares it across requests.

use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use qwen3_tts::{device_info, parse_device, AudioBuffer, Language, ModelType, Qwen3TTS, SynthesisOptions};
use serde::{Deserialize, Serialize};

use crate::audio;
use crate::error::{PipelineError, PipelineResult};
use crate::preprocess::ProcessedSample;

/// Codec frames generated per second of audio.
pub const FRAME_RATE_HZ: f64 = 12.5;

/// Optional sampling overrides from the form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SynthesisSettings {
    pub duration_seconds: Option<f64>,
    pub temperature: Option<f64>,
    pub top_k: Option<usize>,
    pub top_p: Option<f64>,
    pub repetition_penalty: Option<f64>,
    pub seed: Option<u64>,
}

impl SynthesisSettings {
    /// Longest output the model generates by default, in seconds.
    pub fn max_duration_seconds() -> f64 {
        SynthesisOptions::default().max_length as f64 / FRAME_RATE_HZ
    }

    pub fn validate(&self) -> PipelineResult<()> {
        let invalid = |msg: &str| Err(PipelineError::InvalidOption(msg.to_string()));
        if let Some(d) = self.duration_seconds {
            if !(d > 0.0 && d.is_finite()) {
                return invalid("duration_seconds must be > 0");
            }
            let max = Self::max_duration_seconds();
            if d > max {
                return invalid(&format!("duration_seconds must be at most {max:.1}"));
            }
        }
        if let Some(t) = self.temperature {
            if !(t > 0.0 && t.is_finite()) {
                return invalid("temperature must be > 0");
            }
        }
        if self.top_k == Some(0) {
            return invalid("top_k must be > 0");
        }
        if let Some(p) = self.top_p {
            if !(p > 0.0 && p <= 1.0) {
                return invalid("top_p must be in (0, 1]");
            }
        }
        if let Some(r) = self.repetition_penalty {
            if !(r > 0.0 && r.is_finite()) {
                return invalid("repetition_penalty must be > 0");
            }
        }
        Ok(())
    }

    /// Merge the overrides onto the model defaults.
    pub fn to_options(&self) -> SynthesisOptions {
        let mut options = SynthesisOptions::default();
        if let Some(duration) = self.duration_seconds {
            options.max_length =
                ((duration * FRAME_RATE_HZ).round() as usize).clamp(1, options.max_length);
        }
        if let Some(v) = self.temperature {
            options.temperature = v;
        }
        if let Some(v) = self.top_k {
            options.top_k = v;
        }
        if let Some(v) = self.top_p {
            options.top_p = v;
        }
        if let Some(v) = self.repetition_penalty {
            options.repetition_penalty = v;
        }
        if let Some(v) = self.seed {
            options.seed = Some(v);
        }
        options
    }
}

/// Everything one synthesis needs.
#[derive(Debug, Clone)]
pub struct CloneRequest {
    pub text: String,
    pub language: Language,
    pub reference: ProcessedSample,
    /// Transcript of the reference; enables in-context cloning when present.
    pub reference_text: Option<String>,
    pub settings: SynthesisSettings,
}

/// Synthesized speech as a WAV file.
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    pub wav: Vec<u8>,
    pub sample_rate: u32,
    pub duration_secs: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct BackendInfo {
    pub model: String,
    pub device: String,
}

/// A model able to speak text in a reference voice.
///
/// Calls block for the full synthesis; run them off the async runtime.
pub trait VoiceCloner: Send + Sync {
    fn clone_voice(&self, request: &CloneRequest) -> Result<SynthesizedAudio>;

    fn info(&self) -> BackendInfo;
}

/// Qwen3-TTS Base model with speaker-encoder voice cloning.
pub struct Qwen3Cloner {
    model: Mutex<Qwen3TTS>,
    model_dir: String,
    device: String,
}

impl Qwen3Cloner {
    /// Load the model from a local directory. Only Base variants carry the
    /// speaker encoder, so anything else is rejected here.
    pub fn load(model_dir: &str, tokenizer_dir: Option<&str>, device: &str) -> Result<Self> {
        let device = parse_device(device).context("Failed to initialise device")?;
        let device_label = device_info(&device);
        tracing::info!(model_dir, device = %device_label, "Loading voice-cloning model");

        let start = Instant::now();
        let model = Qwen3TTS::from_pretrained_with_tokenizer(model_dir, tokenizer_dir, device)
            .with_context(|| format!("Failed to load model {model_dir}"))?;

        match model.model_type() {
            Some(ModelType::Base) | None => {}
            Some(other) => bail!("{model_dir} is a {other:?} model; voice cloning needs a Base model"),
        }
        if !model.supports_voice_cloning() {
            bail!("{model_dir} has no speaker encoder weights; voice cloning needs a Base model");
        }

        tracing::info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Model loaded"
        );

        Ok(Self {
            model: Mutex::new(model),
            model_dir: model_dir.to_string(),
            device: device_label,
        })
    }
}

impl VoiceCloner for Qwen3Cloner {
    fn clone_voice(&self, request: &CloneRequest) -> Result<SynthesizedAudio> {
        let reference = audio::decode_wav_pcm16(&request.reference.wav)
            .context("Failed to read preprocessed voice sample")?;
        let reference = AudioBuffer::new(reference.samples, reference.sample_rate);

        let start = Instant::now();
        let output = {
            let model = self.model.lock().unwrap_or_else(PoisonError::into_inner);
            let prompt = model
                .create_voice_clone_prompt(&reference, request.reference_text.as_deref())
                .context("Voice prompt creation failed")?;
            model
                .synthesize_voice_clone(
                    &request.text,
                    &prompt,
                    request.language,
                    Some(request.settings.to_options()),
                )
                .context("Voice clone synthesis failed")?
        };
        tracing::info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            audio_secs = output.duration(),
            "Synthesis finished"
        );

        // Removed when `tmp` drops.
        let tmp = tempfile::Builder::new()
            .prefix("cloned-")
            .suffix(".wav")
            .tempfile()
            .context("Failed to create temp output file")?;
        output.save(tmp.path())?;
        let wav = std::fs::read(tmp.path()).context("Failed to read synthesized audio")?;

        Ok(SynthesizedAudio {
            wav,
            sample_rate: output.sample_rate,
            duration_secs: output.duration(),
        })
    }

    fn info(&self) -> BackendInfo {
        BackendInfo {
            model: self.model_dir.clone(),
            device: self.device.clone(),
        }
    }
}
