//! User-facing pipeline errors.

use thiserror::Error;

/// Failures surfaced to whoever submitted the form.
///
/// Each variant maps onto a single HTTP status in the server.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Unsupported file format. Please use WAV, MP3, OGG, or FLAC.")]
    UnsupportedFormat,

    #[error("Voice sample is empty")]
    EmptyUpload,

    #[error("Voice sample is {size} bytes; the limit is {limit} bytes")]
    UploadTooLarge { size: usize, limit: usize },

    #[error("Text to speak is empty")]
    EmptyText,

    #[error("Text is {chars} characters long; the limit is {limit}")]
    TextTooLong { chars: usize, limit: usize },

    #[error("Voice sample has {secs:.1}s of audio after trimming silence; at least {min:.1}s is needed")]
    ReferenceTooShort { secs: f32, min: f32 },

    #[error("Voice sample is {secs:.1}s long; the limit is {max:.1}s")]
    ReferenceTooLong { secs: f32, max: f32 },

    #[error("Unsupported language: {0}")]
    UnknownLanguage(String),

    #[error("Invalid synthesis option: {0}")]
    InvalidOption(String),

    #[error("Audio processing error: {0:#}")]
    Audio(anyhow::Error),

    #[error("Memory usage is {rss_mb:.0} MB, at or above the {limit_mb} MB limit. Try again later.")]
    MemoryPressure { rss_mb: f64, limit_mb: u64 },

    #[error("Synthesis failed: {0:#}")]
    Synthesis(anyhow::Error),
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_format_message() {
        assert_eq!(
            PipelineError::UnsupportedFormat.to_string(),
            "Unsupported file format. Please use WAV, MP3, OGG, or FLAC."
        );
    }

    #[test]
    fn test_audio_error_includes_context_chain() {
        let err = anyhow::anyhow!("bad header").context("Unrecognized audio container");
        let msg = PipelineError::Audio(err).to_string();
        assert!(msg.starts_with("Audio processing error:"));
        assert!(msg.contains("Unrecognized audio container"));
        assert!(msg.contains("bad header"));
    }
}
