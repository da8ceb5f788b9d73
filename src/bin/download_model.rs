//! Pre-download the voice-cloning model so the server starts offline.
//!
//! Usage:
//!     cargo run --bin download_model
//!     cargo run --bin download_model -- --model Qwen/Qwen3-TTS-12Hz-1.7B-Base

use clap::Parser;

use voice_clone_web::hub::{model_ids, ModelFiles};
use voice_clone_web::init_tracing;

/// Download Qwen3-TTS weights into the HuggingFace cache
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Model repo on HuggingFace Hub (must be a Base variant)
    #[arg(long, default_value = model_ids::VOICE_CLONE)]
    model: String,

    /// Text tokenizer repo
    #[arg(long, default_value = model_ids::TEXT_TOKENIZER)]
    tokenizer: String,

    /// Git revision of the model repo
    #[arg(long)]
    revision: Option<String>,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    println!("🚚 Downloading {} ...", args.model);
    let files = ModelFiles::download(
        Some(&args.model),
        Some(&args.tokenizer),
        args.revision.as_deref(),
    )?;

    println!("✅ Model downloaded to: {}", files.model_dir().display());
    println!("   Tokenizer: {}", files.tokenizer_dir().display());
    println!();
    println!("Start the server with:");
    println!(
        "   serve --model-dir {} --tokenizer-dir {}",
        files.model_dir().display(),
        files.tokenizer_dir().display()
    );
    Ok(())
}
