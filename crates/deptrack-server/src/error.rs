use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use deptrack_services::ServiceError;
use deptrack_store::{ConnectionError, StatementsError, StoreError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("statements error: {0}")]
    Statements(#[from] StatementsError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

/// Handler-level error translating a service failure into a response.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub ServiceError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ServiceError::ModuleNotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::warn!(error = %self.0, status = %status, "request failed");
        (status, self.0.to_string()).into_response()
    }
}
