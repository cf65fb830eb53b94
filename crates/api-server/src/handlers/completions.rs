use super::{bad_request, internal_error, normalize_model, sse_response};
use crate::AppState;
use crate::requests::CompletionRequest;
use axum::body::Bytes;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Extension, Json, Router};
use tracing::debug;

async fn completions_handler(Extension(state): Extension<AppState>, body: Bytes) -> Response {
    let req: CompletionRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(err) => return bad_request(err),
    };

    let model = normalize_model(&req.model);
    let cancel = state.shutdown.child_token();
    debug!(model = %model, stream = req.stream, "completion request");

    if req.stream {
        match state.mux.completion_stream(model, &req.prompt, cancel).await {
            Ok(chunks) => sse_response(chunks),
            Err(err) => internal_error("completion stream", err),
        }
    } else {
        match state.mux.completion(model, &req.prompt, cancel).await {
            Ok(response) => Json(response).into_response(),
            Err(err) => internal_error("completion", err),
        }
    }
}

pub fn completions_router() -> Router {
    Router::new().route("/completions", post(completions_handler))
}
