use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use voice_clone_web::{init_tracing, router, AppState, MemoryMonitor, Qwen3Cloner, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = ServerConfig::parse();

    let limits = config.limits()?;
    let memory = Arc::new(MemoryMonitor::new(config.thresholds()?));
    let max_concurrency = config.concurrency()?;
    let addr = config.bind_addr()?;
    memory.log_usage("startup");

    let model_dir = config.model_dir.clone();
    let tokenizer_dir = config.tokenizer_dir.clone();
    let device = config.device.clone();
    let cloner = tokio::task::spawn_blocking(move || {
        Qwen3Cloner::load(&model_dir, tokenizer_dir.as_deref(), &device)
    })
    .await
    .context("Model loading task failed")??;
    memory.log_usage("model loaded");

    let state = AppState::new(Arc::new(cloner), limits, memory, max_concurrency)
        .with_preprocess(config.preprocess());
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, router(state))
        .await
        .context("Server error")?;
    Ok(())
}
