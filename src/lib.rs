//! # voice-clone-web
//!
//! A small web form for voice-cloned speech synthesis. Upload a short voice
//! sample, type some text, and get the text back spoken in that voice as a
//! WAV file to play or download.
//!
//! ## Pipeline
//!
//! 1. **Load** the pretrained [Qwen3-TTS](https://github.com/QwenLM/Qwen3-TTS)
//!    Base model once at startup and share it between requests.
//! 2. **Preprocess** the upload ([`preprocess::process_upload`]): decode,
//!    resample to 24 kHz, trim silence, quantize to 16-bit PCM.
//! 3. **Synthesize** through a [`synth::VoiceCloner`].
//!
//! Around the pipeline sit input-size limits ([`limits`]) and a process memory
//! guard ([`memory`]) that refuses new work when resident memory gets too high.
//!
//! ## Binaries
//!
//! - `serve` runs the web form.
//! - `download_model` pre-fetches the model weights into the HuggingFace cache.

pub mod audio;
pub mod config;
pub mod error;
pub mod hub;
pub mod languages;
pub mod limits;
pub mod memory;
pub mod preprocess;
pub mod server;
pub mod synth;

pub use config::ServerConfig;
pub use error::{PipelineError, PipelineResult};
pub use limits::InputLimits;
pub use memory::{MemoryLevel, MemoryMonitor, MemoryReport, MemoryThresholds};
pub use preprocess::{process_upload, AudioFormat, PreprocessConfig, ProcessedSample};
pub use server::{router, AppState};
pub use synth::{CloneRequest, Qwen3Cloner, SynthesisSettings, SynthesizedAudio, VoiceCloner};

/// Install the fmt subscriber, honouring `RUST_LOG` (default `info`).
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
