use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{error, warn};

use crate::generator::GenerationError;

/// Every way a reading request can fail. Each failure is terminal and reported once.
#[derive(Debug, thiserror::Error)]
pub enum ReadingError {
    #[error("API key not configured on server.")]
    NotConfigured,
    #[error("Method Not Allowed")]
    MethodNotAllowed,
    #[error("Invalid JSON in request body.")]
    InvalidJson,
    #[error("Missing required fields: {0}")]
    MissingFields(&'static str),
    #[error("Text generation API error: {0}")]
    Upstream(String),
    /// The detail is logged, never sent to the caller.
    #[error("An unexpected server error occurred.")]
    Unexpected(String),
}

impl ReadingError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ReadingError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ReadingError::InvalidJson | ReadingError::MissingFields(_) => StatusCode::BAD_REQUEST,
            ReadingError::NotConfigured
            | ReadingError::Upstream(_)
            | ReadingError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<GenerationError> for ReadingError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::Api { .. } | GenerationError::Decode(_) => {
                ReadingError::Upstream(err.to_string())
            }
            GenerationError::Transport(_) | GenerationError::Encode(_) => {
                ReadingError::Unexpected(err.to_string())
            }
        }
    }
}

impl IntoResponse for ReadingError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            ReadingError::NotConfigured => error!("Rejecting request: API key is not configured"),
            ReadingError::Upstream(message) => error!(%message, "Text generation API failed"),
            ReadingError::Unexpected(detail) => error!(%detail, "Unexpected error while generating"),
            _ => warn!(%status, error = %self, "Rejecting invalid request"),
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
