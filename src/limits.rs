//! Input-size limits applied before any audio is decoded or any text reaches
//! the model.

use serde::Serialize;

use crate::error::{PipelineError, PipelineResult};

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_MAX_TEXT_CHARS: usize = 1000;
pub const DEFAULT_MAX_REFERENCE_SECS: f32 = 30.0;
pub const DEFAULT_MIN_REFERENCE_SECS: f32 = 1.0;

/// Silence an upload may carry on top of `max_reference_secs` before trimming.
pub const SILENCE_ALLOWANCE_SECS: f32 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InputLimits {
    pub max_upload_bytes: usize,
    pub max_text_chars: usize,
    pub max_reference_secs: f32,
    pub min_reference_secs: f32,
}

impl Default for InputLimits {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_text_chars: DEFAULT_MAX_TEXT_CHARS,
            max_reference_secs: DEFAULT_MAX_REFERENCE_SECS,
            min_reference_secs: DEFAULT_MIN_REFERENCE_SECS,
        }
    }
}

impl InputLimits {
    /// Check the limits are internally consistent.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.max_upload_bytes > 0, "max_upload_bytes must be > 0");
        anyhow::ensure!(self.max_text_chars > 0, "max_text_chars must be > 0");
        anyhow::ensure!(
            self.min_reference_secs >= 0.0,
            "min_reference_secs must be >= 0"
        );
        anyhow::ensure!(
            self.max_reference_secs > self.min_reference_secs,
            "max_reference_secs ({}) must exceed min_reference_secs ({})",
            self.max_reference_secs,
            self.min_reference_secs
        );
        Ok(())
    }

    /// Reject empty text or text longer than `max_text_chars` characters.
    pub fn validate_text(&self, text: &str) -> PipelineResult<()> {
        if text.trim().is_empty() {
            return Err(PipelineError::EmptyText);
        }
        let chars = text.chars().count();
        if chars > self.max_text_chars {
            return Err(PipelineError::TextTooLong {
                chars,
                limit: self.max_text_chars,
            });
        }
        Ok(())
    }

    pub fn validate_upload_size(&self, size: usize) -> PipelineResult<()> {
        if size == 0 {
            return Err(PipelineError::EmptyUpload);
        }
        if size > self.max_upload_bytes {
            return Err(PipelineError::UploadTooLarge {
                size,
                limit: self.max_upload_bytes,
            });
        }
        Ok(())
    }

    /// Bounds on the voice sample after silence has been trimmed.
    pub fn validate_reference_duration(&self, secs: f32) -> PipelineResult<()> {
        if secs < self.min_reference_secs {
            return Err(PipelineError::ReferenceTooShort {
                secs,
                min: self.min_reference_secs,
            });
        }
        if secs > self.max_reference_secs {
            return Err(PipelineError::ReferenceTooLong {
                secs,
                max: self.max_reference_secs,
            });
        }
        Ok(())
    }

    /// Longest audio accepted from the decoder, before silence is trimmed.
    pub fn max_decoded_secs(&self) -> f32 {
        self.max_reference_secs + SILENCE_ALLOWANCE_SECS
    }

    /// HTTP body limit: the upload cap plus room for the text fields and
    /// multipart framing.
    pub fn request_body_limit(&self) -> usize {
        self.max_upload_bytes
            .saturating_add(self.max_text_chars.saturating_mul(4))
            .saturating_add(64 * 1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoded_cap_leaves_room_for_silence() {
        let limits = InputLimits::default();
        assert_eq!(limits.max_decoded_secs(), 60.0);
        assert!(limits.max_decoded_secs() > limits.max_reference_secs);
    }

    #[test]
    fn test_defaults_are_valid() {
        InputLimits::default().validate().unwrap();
    }

    #[test]
    fn test_inverted_reference_bounds_rejected() {
        let limits = InputLimits {
            max_reference_secs: 1.0,
            min_reference_secs: 2.0,
            ..Default::default()
        };
        assert!(limits.validate().is_err());
    }

    #[test]
    fn test_text_limits() {
        let limits = InputLimits {
            max_text_chars: 5,
            ..Default::default()
        };
        assert!(limits.validate_text("hello").is_ok());
        assert!(matches!(
            limits.validate_text("hello!"),
            Err(PipelineError::TextTooLong { chars: 6, limit: 5 })
        ));
        assert!(matches!(
            limits.validate_text("   \n"),
            Err(PipelineError::EmptyText)
        ));
    }

    #[test]
    fn test_text_limit_counts_characters_not_bytes() {
        let limits = InputLimits {
            max_text_chars: 4,
            ..Default::default()
        };
        // 4 characters, 12 bytes
        assert!(limits.validate_text("日本語だ").is_ok());
    }

    #[test]
    fn test_upload_size_limits() {
        let limits = InputLimits {
            max_upload_bytes: 100,
            ..Default::default()
        };
        assert!(limits.validate_upload_size(100).is_ok());
        assert!(matches!(
            limits.validate_upload_size(101),
            Err(PipelineError::UploadTooLarge {
                size: 101,
                limit: 100
            })
        ));
        assert!(matches!(
            limits.validate_upload_size(0),
            Err(PipelineError::EmptyUpload)
        ));
    }

    #[test]
    fn test_reference_duration_limits() {
        let limits = InputLimits::default();
        assert!(limits.validate_reference_duration(5.0).is_ok());
        assert!(matches!(
            limits.validate_reference_duration(0.2),
            Err(PipelineError::ReferenceTooShort { .. })
        ));
        assert!(matches!(
            limits.validate_reference_duration(45.0),
            Err(PipelineError::ReferenceTooLong { .. })
        ));
    }

    #[test]
    fn test_body_limit_exceeds_upload_limit() {
        let limits = InputLimits::default();
        assert!(limits.request_body_limit() > limits.max_upload_bytes);
    }
}
