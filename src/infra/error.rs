//! Error types for the service.
//!
//! Startup and shutdown failures are [`StartupError`] and [`SupervisorError`].
//! Failures inside request handling are rendered as an [`ErrorBody`].

use axum::{http::HeaderValue, response::IntoResponse, Json};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use time::OffsetDateTime;
use tower_http::catch_panic::ResponseForPanic;
use utoipa::ToSchema;

/// The service could not be started.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The database connection could not be established.
    #[error("failed to connect to database: {0}")]
    Database(#[from] sqlx::Error),
    /// The cache connection could not be established.
    #[error("failed to connect to cache: {0}")]
    Cache(#[from] redis::RedisError),
    /// The HTTP listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The address that was attempted.
        addr: String,
        /// The underlying error.
        source: std::io::Error,
    },
}

/// The service did not shut down cleanly.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    /// In-flight requests did not finish before the deadline.
    #[error("graceful shutdown did not finish within {0:?}")]
    ShutdownTimeout(Duration),
    /// The server stopped on its own with an error.
    #[error("server failed: {0}")]
    Serve(#[from] std::io::Error),
    /// The server stopped on its own without an error.
    #[error("server stopped before a shutdown signal was received")]
    Stopped,
    /// The server task panicked or was cancelled.
    #[error("server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A standard error response body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// A description of the error.
    message: String,
    /// When the error happened.
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    timestamp: OffsetDateTime,
}

impl ErrorBody {
    pub(crate) fn new(message: String) -> Self {
        Self {
            message,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        self.message.as_ref()
    }
}

/// An internal error.
/// The client cannot do anything about this.
#[derive(Debug, thiserror::Error)]
pub enum InternalError {
    /// Other miscellaneous errors.
    #[error("{0}")]
    Other(String),
}

impl IntoResponse for InternalError {
    fn into_response(self) -> axum::response::Response {
        tracing::error!("internal error: {}", self);
        let mut response = (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody::new("internal error".to_string())),
        )
            .into_response();
        response
            .headers_mut()
            .insert("Retry-After", HeaderValue::from_static("5"));
        response
    }
}

/// A handler for converting panics into proper responses for the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PanicHandler;

impl ResponseForPanic for PanicHandler {
    type ResponseBody = axum::body::Body;

    fn response_for_panic(
        &mut self,
        err: Box<dyn std::any::Any + Send + 'static>,
    ) -> http::Response<Self::ResponseBody> {
        let details = err
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| err.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        tracing::error!(panic = %details, "Recovered from panic");
        InternalError::Other("Panic".to_string()).into_response()
    }
}
