//! HTTP handlers for the voice chat surface.

use crate::AppState;
use axum::{
    extract::{multipart::Field, Extension, Multipart},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use suara_types::{AudioBuffer, ErrorKind};
use suara_voice::PipelineFailure;
use thiserror::Error;

/// Multipart field carrying the recording.
pub const AUDIO_FIELD: &str = "audio";

/// Errors returned by the API, rendered as `{"detail": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unprocessable(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error("{0}")]
    InternalServerError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "detail": message
        }));

        (status, body).into_response()
    }
}

impl From<PipelineFailure> for ApiError {
    fn from(failure: PipelineFailure) -> Self {
        match failure.kind() {
            ErrorKind::ValidationError => ApiError::Unprocessable(failure.error.to_string()),
            _ => ApiError::InternalServerError(failure.to_string()),
        }
    }
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(e.body_text())
    } else {
        ApiError::Unprocessable(format!("multipart error: {}", e))
    }
}

async fn read_field(field: Field<'_>) -> Result<AudioBuffer, ApiError> {
    let content_type = field.content_type().map(str::to_string);
    let file_name = field.file_name().map(str::to_string);
    let data = field.bytes().await.map_err(multipart_error)?;
    Ok(AudioBuffer::from_upload(
        data.to_vec(),
        content_type.as_deref(),
        file_name.as_deref(),
    ))
}

/// Pulls the recording out of the form: the `audio` field, or failing
/// that the first file field.
async fn extract_audio(multipart: &mut Multipart) -> Result<AudioBuffer, ApiError> {
    let mut fallback = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some(AUDIO_FIELD) {
            return read_field(field).await;
        }
        if fallback.is_none() && field.file_name().is_some() {
            fallback = Some(read_field(field).await?);
        }
    }

    fallback.ok_or_else(|| ApiError::Unprocessable(format!("missing '{}' field", AUDIO_FIELD)))
}

/// Handler for `GET /`.
pub async fn root_handler() -> Json<Value> {
    Json(json!({
        "message": "suara is running. POST a recording to /voice-chat as the 'audio' form field."
    }))
}

/// Handler for `GET /health`.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Handler for `POST /voice-chat`.
///
/// Responds with the synthesized reply as `audio/wav`. Validation failures
/// map to 422, every other failure to 500 with an `[ERROR] <stage>: ...`
/// detail. A client disconnect drops the pipeline future, which kills any
/// running engine and removes the request workspace.
pub async fn voice_chat_handler(
    Extension(state): Extension<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let audio = extract_audio(&mut multipart).await?;
    tracing::debug!(
        bytes = audio.len(),
        container = ?audio.container(),
        "voice chat upload received"
    );

    let synthesized = state.pipeline.run(audio).await.into_result()?;

    Ok((
        [(header::CONTENT_TYPE, synthesized.content_type())],
        synthesized.bytes,
    )
        .into_response())
}
