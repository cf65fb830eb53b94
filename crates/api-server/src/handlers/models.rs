use crate::AppState;
use axum::routing::get;
use axum::{Extension, Json, Router};
use providers::ModelsResponse;

async fn models_handler(Extension(state): Extension<AppState>) -> Json<ModelsResponse> {
    Json(state.mux.list_models())
}

pub fn models_router() -> Router {
    Router::new().route("/models", get(models_handler))
}
