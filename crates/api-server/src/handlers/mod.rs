mod chat_completions;
mod completions;
mod models;

pub use chat_completions::chat_completions_router;
pub use completions::completions_router;
pub use models::models_router;

use axum::Json;
use axum::http::{StatusCode, header};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use common::stream::ChunkStream;
use faststr::FastStr;
use futures_util::StreamExt;
use serde::Serialize;
use std::convert::Infallible;
use tracing::error;

/// OpenAI-shaped error envelope for every 4xx/5xx JSON response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    message: FastStr,
    #[serde(rename = "type")]
    kind:    &'static str,
}

impl ErrorResponse {
    pub fn new(message: impl Into<FastStr>) -> Self {
        Self {
            error: ErrorDetail {
                message: message.into(),
                kind:    "invalid_request_error",
            },
        }
    }
}

/// Callers may address the multiplexer namespace explicitly; the prefix is
/// stripped before resolution.
pub(crate) fn normalize_model(model: &str) -> &str {
    model.strip_prefix("modelplex-").unwrap_or(model)
}

pub(crate) fn bad_request(err: serde_json::Error) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(format!("invalid request body: {err}"))),
    )
        .into_response()
}

/// Maps a provider failure to a 500 envelope. Upstream bodies are logged,
/// never mirrored back to the caller; an unroutable model names itself.
pub(crate) fn internal_error(operation: &str, err: providers::Error) -> Response {
    error!("{operation} failed: {err}");
    let message = match &err {
        providers::Error::NoProviderForModel(_) => err.to_string(),
        _ => "internal server error".to_owned(),
    };
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(message)),
    )
        .into_response()
}

/// Reframes a chunk sequence as caller-facing SSE, appending exactly one
/// `[DONE]` frame however the sequence ends.
pub(crate) fn sse_response(mut chunks: ChunkStream) -> Response {
    let events = async_stream::stream! {
        while let Some(chunk) = chunks.next().await {
            yield Ok::<Event, Infallible>(Event::default().data(chunk.to_string()));
        }
        yield Ok(Event::default().data("[DONE]"));
    };

    (
        [
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        Sse::new(events),
    )
        .into_response()
}
