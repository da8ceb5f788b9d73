//! Pre-downloading model weights from HuggingFace Hub.
//!
//! Files land in the HuggingFace cache. The returned directories can be passed
//! straight to the server as `--model-dir` / `--tokenizer-dir`.
//!
//! # Example
//!
//! ```rust,ignore
//! use voice_clone_web::hub::ModelFiles;
//!
//! let files = ModelFiles::download(None, None, None)?;
//! println!("{}", files.model_dir().display());
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hf_hub::api::sync::{Api, ApiRepo};
use hf_hub::{Repo, RepoType};

/// Default HuggingFace repos.
pub mod model_ids {
    /// Base variant, the one with the speaker encoder
    pub const VOICE_CLONE: &str = "Qwen/Qwen3-TTS-12Hz-0.6B-Base";

    /// Text tokenizer (Qwen2 vocabulary)
    pub const TEXT_TOKENIZER: &str = "Qwen/Qwen2-0.5B";
}

pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Local paths of a downloaded model.
#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub config: PathBuf,
    pub model_weights: PathBuf,
    pub speech_tokenizer_config: PathBuf,
    pub speech_tokenizer_weights: PathBuf,
    pub tokenizer: PathBuf,
}

impl ModelFiles {
    /// Download every file the server needs.
    ///
    /// # Arguments
    ///
    /// * `model_id` - Model repo, defaults to [`model_ids::VOICE_CLONE`]
    /// * `tokenizer_id` - Tokenizer repo, defaults to [`model_ids::TEXT_TOKENIZER`]
    /// * `revision` - Branch, tag or commit of the model repo (tokenizer uses `main`)
    pub fn download(
        model_id: Option<&str>,
        tokenizer_id: Option<&str>,
        revision: Option<&str>,
    ) -> Result<Self> {
        let api = Api::new().context("Failed to create HuggingFace API")?;
        let model_id = model_id.unwrap_or(model_ids::VOICE_CLONE);
        let tokenizer_id = tokenizer_id.unwrap_or(model_ids::TEXT_TOKENIZER);

        tracing::info!(model_id, revision = revision.unwrap_or("main"), "Downloading model");
        let model_repo = match revision {
            Some(rev) => api.repo(Repo::with_revision(
                model_id.to_string(),
                RepoType::Model,
                rev.to_string(),
            )),
            None => api.model(model_id.to_string()),
        };

        let config = fetch(&model_repo, "config.json")?;
        let model_weights = fetch(&model_repo, "model.safetensors")?;
        let speech_tokenizer_config = fetch(&model_repo, "speech_tokenizer/config.json")?;
        let speech_tokenizer_weights = fetch(&model_repo, "speech_tokenizer/model.safetensors")?;

        tracing::info!(tokenizer_id, "Downloading text tokenizer");
        let tokenizer = fetch(&api.model(tokenizer_id.to_string()), TOKENIZER_FILE)?;

        let files = Self {
            config,
            model_weights,
            speech_tokenizer_config,
            speech_tokenizer_weights,
            tokenizer,
        };
        tracing::info!("Download complete");
        Ok(files)
    }

    /// Snapshot directory holding `config.json` and `speech_tokenizer/`.
    pub fn model_dir(&self) -> &Path {
        parent_or_self(&self.config)
    }

    /// Directory holding `tokenizer.json`.
    pub fn tokenizer_dir(&self) -> &Path {
        parent_or_self(&self.tokenizer)
    }
}

fn fetch(repo: &ApiRepo, file: &str) -> Result<PathBuf> {
    tracing::info!("  Fetching {file}");
    repo.get(file)
        .with_context(|| format!("Failed to download {file}"))
}

fn parent_or_self(path: &Path) -> &Path {
    path.parent().unwrap_or(path)
}
