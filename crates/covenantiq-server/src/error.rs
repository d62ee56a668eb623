//! Server and API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use covenantiq_core::CoreError;
use covenantiq_engine::EngineError;
use covenantiq_traits::TraitError;

/// Startup errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Config file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    /// Config values are inconsistent
    #[error("configuration error: {0}")]
    Config(String),

    /// Seed data failed to load
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    error: String,
}

impl ErrorResponse {
    fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// An engine error on its way to an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub EngineError);

impl ApiError {
    /// Status code for the wrapped error.
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::DuplicateMeasurement { .. }
            | EngineError::AlreadyExists(_)
            | EngineError::ConcurrentAlertWriteConflict { .. }
            | EngineError::Storage(TraitError::Conflict(_)) => StatusCode::CONFLICT,
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        ApiError(e)
    }
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        ApiError(EngineError::Core(e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        (status, Json(ErrorResponse::new(self.0.to_string()))).into_response()
    }
}
