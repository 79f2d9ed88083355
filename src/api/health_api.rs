//! Health check for the data stores.

use crate::infra::state::AppState;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The health API endpoints.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// Whether a component responds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// The component responded.
    Ok,
    /// The component did not respond.
    Down,
}

impl<E: std::fmt::Display> From<Result<(), E>> for Status {
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Status::Ok,
            Err(e) => {
                tracing::warn!("Health check failed: {}", e);
                Status::Down
            }
        }
    }
}

/// The health of each data store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Health {
    /// The relational database.
    pub database: Status,
    /// The cache.
    pub cache: Status,
}

impl Health {
    /// The status code to report this health with.
    pub fn status_code(&self) -> StatusCode {
        if self.database == Status::Ok && self.cache == Status::Ok {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Pings the database and the cache.
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "All data stores respond", body = Health),
        (status = 503, description = "A data store does not respond", body = Health),
    )
)]
#[tracing::instrument(skip(state))]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Health>) {
    let (database, cache) = tokio::join!(state.db().ping(), state.cache().ping());
    let health = Health {
        database: database.into(),
        cache: cache.into(),
    };
    (health.status_code(), Json(health))
}
