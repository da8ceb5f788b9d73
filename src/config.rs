//! Server configuration. Every flag can also be set through the environment.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;

use crate::audio::ResampleQuality;
use crate::limits::{
    InputLimits, DEFAULT_MAX_REFERENCE_SECS, DEFAULT_MAX_TEXT_CHARS, DEFAULT_MAX_UPLOAD_BYTES,
    DEFAULT_MIN_REFERENCE_SECS,
};
use crate::memory::{MemoryThresholds, DEFAULT_LIMIT_MB, DEFAULT_WARN_MB};
use crate::preprocess::PreprocessConfig;

/// Voice cloning web form
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct ServerConfig {
    /// Directory of a Qwen3-TTS Base model (config.json, model.safetensors,
    /// speech_tokenizer/)
    #[arg(long, env = "BASE_MODEL_DIR")]
    pub model_dir: String,

    /// Tokenizer directory or HuggingFace ID (defaults to the model directory)
    #[arg(long, env = "TOKENIZER_DIR")]
    pub tokenizer_dir: Option<String>,

    /// Device for inference (auto, cpu, cuda, cuda:N, metal)
    #[arg(long, env = "DEVICE", default_value = "auto")]
    pub device: String,

    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Syntheses allowed to run at once
    #[arg(long, env = "MAX_CONCURRENCY", default_value_t = 1)]
    pub max_concurrency: usize,

    /// Largest accepted voice sample upload
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,

    /// Longest accepted text, in characters
    #[arg(long, env = "MAX_TEXT_CHARS", default_value_t = DEFAULT_MAX_TEXT_CHARS)]
    pub max_text_chars: usize,

    /// Longest voice sample after silence trimming, in seconds
    #[arg(long, env = "MAX_REFERENCE_SECS", default_value_t = DEFAULT_MAX_REFERENCE_SECS)]
    pub max_reference_secs: f32,

    /// Shortest voice sample after silence trimming, in seconds
    #[arg(long, env = "MIN_REFERENCE_SECS", default_value_t = DEFAULT_MIN_REFERENCE_SECS)]
    pub min_reference_secs: f32,

    /// Resident memory (MB) at which a warning is logged
    #[arg(long, env = "MEMORY_WARN_MB", default_value_t = DEFAULT_WARN_MB)]
    pub memory_warn_mb: u64,

    /// Resident memory (MB) at which new syntheses are refused
    #[arg(long, env = "MEMORY_LIMIT_MB", default_value_t = DEFAULT_LIMIT_MB)]
    pub memory_limit_mb: u64,

    /// Resampler used to bring uploads to the model's sample rate
    #[arg(long, env = "RESAMPLE_QUALITY", value_enum, default_value_t = ResampleQuality::Normal)]
    pub resample_quality: ResampleQuality,
}

impl ServerConfig {
    pub fn limits(&self) -> Result<InputLimits> {
        let limits = InputLimits {
            max_upload_bytes: self.max_upload_bytes,
            max_text_chars: self.max_text_chars,
            max_reference_secs: self.max_reference_secs,
            min_reference_secs: self.min_reference_secs,
        };
        limits.validate().context("Invalid input limits")?;
        Ok(limits)
    }

    pub fn preprocess(&self) -> PreprocessConfig {
        PreprocessConfig {
            resample_quality: self.resample_quality,
            ..Default::default()
        }
    }

    pub fn thresholds(&self) -> Result<MemoryThresholds> {
        MemoryThresholds::new(self.memory_warn_mb, self.memory_limit_mb)
            .context("Invalid memory thresholds")
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid HOST/PORT: {}:{}", self.host, self.port))
    }

    pub fn concurrency(&self) -> Result<usize> {
        anyhow::ensure!(self.max_concurrency > 0, "MAX_CONCURRENCY must be > 0");
        Ok(self.max_concurrency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::try_parse_from(["serve", "--model-dir", "/models/base"]).unwrap();
        assert_eq!(config.model_dir, "/models/base");
        assert_eq!(config.device, "auto");
        assert_eq!(config.port, 8000);
        assert_eq!(config.limits().unwrap(), InputLimits::default());
        assert_eq!(config.thresholds().unwrap(), MemoryThresholds::default());
        assert_eq!(config.concurrency().unwrap(), 1);
        assert_eq!(config.preprocess(), PreprocessConfig::default());
    }

    #[test]
    fn test_resample_quality_flag() {
        let config =
            ServerConfig::try_parse_from(["serve", "--model-dir", "m", "--resample-quality", "high"])
                .unwrap();
        assert_eq!(config.preprocess().resample_quality, ResampleQuality::High);

        let result =
            ServerConfig::try_parse_from(["serve", "--model-dir", "m", "--resample-quality", "best"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::try_parse_from([
            "serve",
            "--model-dir",
            "m",
            "--host",
            "127.0.0.1",
            "--port",
            "9000",
            "--max-text-chars",
            "200",
            "--memory-warn-mb",
            "1000",
            "--memory-limit-mb",
            "2000",
        ])
        .unwrap();
        assert_eq!(config.bind_addr().unwrap().to_string(), "127.0.0.1:9000");
        assert_eq!(config.limits().unwrap().max_text_chars, 200);
        assert_eq!(config.thresholds().unwrap().limit_mb, 2000);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = ServerConfig::try_parse_from([
            "serve",
            "--model-dir",
            "m",
            "--memory-warn-mb",
            "5000",
            "--memory-limit-mb",
            "100",
            "--max-concurrency",
            "0",
        ])
        .unwrap();
        assert!(config.thresholds().is_err());
        assert!(config.concurrency().is_err());
    }

    #[test]
    fn test_bad_host() {
        let config = ServerConfig::try_parse_from(["serve", "--model-dir", "m", "--host", "not a host"])
            .unwrap();
        assert!(config.bind_addr().is_err());
    }
}
