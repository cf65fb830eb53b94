use super::{bad_request, internal_error, normalize_model, sse_response};
use crate::AppState;
use crate::requests::ChatCompletionRequest;
use axum::body::Bytes;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Extension, Json, Router};
use tracing::debug;

async fn chat_completions_handler(
    Extension(state): Extension<AppState>,
    body: Bytes,
) -> Response {
    let req: ChatCompletionRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(err) => return bad_request(err),
    };

    let model = normalize_model(&req.model);
    let cancel = state.shutdown.child_token();
    debug!(model = %model, stream = req.stream, "chat completion request");

    if req.stream {
        match state.mux.chat_stream(model, &req.messages, cancel).await {
            Ok(chunks) => sse_response(chunks),
            Err(err) => internal_error("chat completion stream", err),
        }
    } else {
        match state.mux.chat(model, &req.messages, cancel).await {
            Ok(response) => Json(response).into_response(),
            Err(err) => internal_error("chat completion", err),
        }
    }
}

pub fn chat_completions_router() -> Router {
    Router::new().route("/chat/completions", post(chat_completions_handler))
}
