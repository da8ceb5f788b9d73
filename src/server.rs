//! HTTP front end: the upload form plus a small JSON API behind it.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio::sync::Semaphore;

use crate::error::PipelineError;
use crate::languages::{self, LanguageEntry, DEFAULT_LANGUAGE, SUPPORTED_LANGUAGES};
use crate::limits::InputLimits;
use crate::memory::{MemoryMonitor, MemoryReport};
use crate::preprocess::{self, AudioFormat, PreprocessConfig};
use crate::synth::{BackendInfo, CloneRequest, SynthesisSettings, VoiceCloner};

const INDEX_HTML: &str = include_str!("../assets/index.html");

/// File name offered to the browser for the result.
pub const DOWNLOAD_FILENAME: &str = "cloned.wav";

pub struct AppState {
    cloner: Arc<dyn VoiceCloner>,
    limits: InputLimits,
    preprocess: PreprocessConfig,
    memory: Arc<MemoryMonitor>,
    semaphore: Arc<Semaphore>,
    max_concurrency: usize,
}

impl AppState {
    pub fn new(
        cloner: Arc<dyn VoiceCloner>,
        limits: InputLimits,
        memory: Arc<MemoryMonitor>,
        max_concurrency: usize,
    ) -> Self {
        let max_concurrency = max_concurrency.max(1);
        Self {
            cloner,
            limits,
            preprocess: PreprocessConfig::default(),
            memory,
            semaphore: Arc::new(Semaphore::new(max_concurrency)),
            max_concurrency,
        }
    }

    pub fn with_preprocess(mut self, preprocess: PreprocessConfig) -> Self {
        self.preprocess = preprocess;
        self
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        let status = match &err {
            PipelineError::UploadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            PipelineError::MemoryPressure { .. } => StatusCode::SERVICE_UNAVAILABLE,
            PipelineError::Synthesis(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self {
            status: err.status(),
            message: format!("Invalid form data: {}", err.body_text()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, "{}", self.message);
        } else {
            tracing::warn!(status = %self.status, "{}", self.message);
        }
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

#[derive(Debug, Serialize)]
struct ConcurrencyStatus {
    limit: usize,
    available: usize,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    backend: BackendInfo,
    target_sample_rate: u32,
    formats: Vec<&'static str>,
    limits: InputLimits,
    memory: MemoryReport,
    concurrency: ConcurrencyStatus,
}

/// Fields of the clone form as submitted.
#[derive(Debug, Default)]
struct CloneForm {
    voice: Option<(String, Vec<u8>)>,
    text: Option<String>,
    language: Option<String>,
    reference_text: Option<String>,
    settings: SynthesisSettings,
}

impl CloneForm {
    async fn read(multipart: &mut Multipart) -> Result<Self, ApiError> {
        let mut form = CloneForm::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or("").to_string();
            match name.as_str() {
                "voice" => {
                    let filename = field.file_name().unwrap_or("").to_string();
                    let bytes = field.bytes().await?;
                    form.voice = Some((filename, bytes.to_vec()));
                }
                "text" => form.text = Some(field.text().await?),
                "language" => form.language = non_empty(field).await?,
                "reference_text" => form.reference_text = non_empty(field).await?,
                "duration_seconds" => form.settings.duration_seconds = parse_field(field).await?,
                "temperature" => form.settings.temperature = parse_field(field).await?,
                "top_k" => form.settings.top_k = parse_field(field).await?,
                "top_p" => form.settings.top_p = parse_field(field).await?,
                "repetition_penalty" => {
                    form.settings.repetition_penalty = parse_field(field).await?
                }
                "seed" => form.settings.seed = parse_field(field).await?,
                other => tracing::debug!(field = other, "Ignoring unknown form field"),
            }
        }
        Ok(form)
    }
}

/// Text field value, with blank treated as absent.
async fn non_empty(field: Field<'_>) -> Result<Option<String>, ApiError> {
    let value = field.text().await?;
    let value = value.trim();
    Ok((!value.is_empty()).then(|| value.to_string()))
}

async fn parse_field<T: std::str::FromStr>(field: Field<'_>) -> Result<Option<T>, ApiError> {
    let name = field.name().unwrap_or("").to_string();
    match non_empty(field).await? {
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ApiError::from(PipelineError::InvalidOption(format!("{name}: '{value}'")))),
        None => Ok(None),
    }
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn list_languages() -> Json<&'static [LanguageEntry]> {
    Json(SUPPORTED_LANGUAGES)
}

async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let memory = state.memory.clone();
    let report = tokio::task::spawn_blocking(move || memory.snapshot())
        .await
        .unwrap_or_else(|_| state.memory.snapshot());
    Json(StatusResponse {
        backend: state.cloner.info(),
        target_sample_rate: state.preprocess.target_sample_rate,
        formats: AudioFormat::ALL.iter().map(|f| f.extension()).collect(),
        limits: state.limits,
        memory: report,
        concurrency: ConcurrencyStatus {
            limit: state.max_concurrency,
            available: state.semaphore.available_permits(),
        },
    })
}

async fn clone_voice(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = CloneForm::read(&mut multipart).await?;

    let language = match form.language.as_deref() {
        Some(code) => languages::lookup(code)
            .ok_or_else(|| PipelineError::UnknownLanguage(code.to_string()))?,
        None => DEFAULT_LANGUAGE,
    };
    let text = form.text.unwrap_or_default();
    state.limits.validate_text(&text)?;
    form.settings.validate()?;
    let (filename, bytes) = form
        .voice
        .ok_or_else(|| ApiError::bad_request("Voice sample is required"))?;
    // Reject oversized uploads before queueing behind other requests.
    state.limits.validate_upload_size(bytes.len())?;

    state.memory.ensure_headroom()?;
    // Held by the blocking task, so a dropped request still counts until its work ends.
    let permit = state
        .semaphore
        .clone()
        .acquire_owned()
        .await
        .map_err(|_| ApiError::internal("Server is shutting down"))?;

    tracing::info!(
        language = language.code,
        text_chars = text.chars().count(),
        upload_bytes = bytes.len(),
        "Voice clone requested"
    );

    let worker = state.clone();
    let reference_text = form.reference_text;
    let settings = form.settings;
    let (reference_secs, audio) = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        let start = Instant::now();
        let reference =
            preprocess::process_upload(&filename, bytes, &worker.limits, &worker.preprocess)?;
        let reference_secs = reference.duration_secs;

        worker.memory.ensure_headroom()?;
        worker.memory.log_usage("before synthesis");
        let request = CloneRequest {
            text,
            language: language.model_language(),
            reference,
            reference_text,
            settings,
        };
        let audio = worker
            .cloner
            .clone_voice(&request)
            .map_err(PipelineError::Synthesis)?;
        worker.memory.log_usage("after synthesis");

        tracing::info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            audio_secs = audio.duration_secs,
            "Voice clone done"
        );
        Ok::<_, PipelineError>((reference_secs, audio))
    })
    .await
    .map_err(|e| ApiError::internal(format!("Task join error: {e}")))??;

    let mut response = (StatusCode::OK, audio.wav).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("audio/wav"));
    if let Ok(value) =
        HeaderValue::from_str(&format!("attachment; filename=\"{DOWNLOAD_FILENAME}\""))
    {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    for (name, secs) in [
        ("x-audio-duration", audio.duration_secs),
        ("x-reference-duration", reference_secs),
    ] {
        if let Ok(value) = HeaderValue::from_str(&format!("{secs:.3}")) {
            headers.insert(name, value);
        }
    }
    Ok(response)
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let body_limit = state.limits.request_body_limit();
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/languages", get(list_languages))
        .route("/api/status", get(status))
        .route("/api/clone", post(clone_voice))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(Arc::new(state))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_error_statuses() {
        let cases = [
            (PipelineError::UnsupportedFormat, StatusCode::BAD_REQUEST),
            (
                PipelineError::UploadTooLarge { size: 2, limit: 1 },
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (
                PipelineError::MemoryPressure {
                    rss_mb: 10.0,
                    limit_mb: 5,
                },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                PipelineError::Synthesis(anyhow::anyhow!("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (PipelineError::EmptyText, StatusCode::BAD_REQUEST),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }

    #[test]
    fn test_index_is_a_form() {
        assert!(INDEX_HTML.contains("<form"));
        assert!(INDEX_HTML.contains("/api/clone"));
        assert!(INDEX_HTML.contains(DOWNLOAD_FILENAME));
    }
}
