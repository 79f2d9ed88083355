//! The HTTP API.

use crate::infra::{openapi::ApiDoc, state::AppState};
use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

pub mod health_api;
pub mod info_api;

/// Constructs the REST API.
pub fn api(state: AppState) -> Router {
    Router::new()
        .merge(info_api::routes())
        .merge(health_api::routes())
        .route("/openapi.json", get(openapi))
        .with_state(state)
}

/// Serves the OpenAPI document.
async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
