//! Suara server library.
//!
//! Exposes the router, application state and startup wiring so the binary
//! and integration tests build the service the same way.

pub mod api;
pub mod config;

use axum::{
    extract::{DefaultBodyLimit, Extension},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use suara_voice::{
    build_phonemizer, HttpReplyEngine, PhonemeNormalizer, SttService, TtsService, VoiceError,
    VoicePipeline,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Upper bound on a request body.
pub const MAX_REQUEST_BODY_BYTES: usize = 25 * 1024 * 1024;

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub pipeline: Arc<VoicePipeline>,
}

impl AppState {
    pub fn new(pipeline: VoicePipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

/// Builds the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(api::root_handler))
        .route("/health", get(api::health_handler))
        .route("/voice-chat", post(api::voice_chat_handler))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}

/// Wires the engines described by `config` into a pipeline.
///
/// Engine binaries and model files are checked per request, so a missing
/// whisper model only fails `/voice-chat` calls. The phonemizer and reply
/// client are built here and fail startup instead.
pub fn build_pipeline(config: &config::Config) -> Result<VoicePipeline, VoiceError> {
    let phonemizer = build_phonemizer(&config.phonemizer)?;
    let reply = HttpReplyEngine::new(&config.reply)?;
    tracing::info!(
        endpoint = reply.endpoint(),
        model = %config.reply.model,
        "reply engine configured"
    );

    let stt = SttService::from_config(&config.stt);
    let tts = TtsService::new(&config.tts, PhonemeNormalizer::new(phonemizer));

    std::fs::create_dir_all(&config.workspace.root)?;

    Ok(VoicePipeline::new(
        Arc::new(stt),
        Arc::new(reply),
        Arc::new(tts),
        config.workspace.root.clone(),
    ))
}
