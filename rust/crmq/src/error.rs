use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::error;

pub type Result<T> = std::result::Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("text generation failed: {0}")]
    Collaborator(String),

    #[error("text generation timed out after {}ms", .0.as_millis())]
    CollaboratorTimeout(Duration),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    /// Failures of the external text service, which pipelines absorb into a
    /// user-facing error payload instead of failing the request.
    pub fn is_collaborator(&self) -> bool {
        matches!(
            self,
            ServiceError::Collaborator(_) | ServiceError::CollaboratorTimeout(_)
        )
    }
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match self {
            ServiceError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Collaborator(_) => StatusCode::BAD_GATEWAY,
            ServiceError::CollaboratorTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ServiceError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if !matches!(self, ServiceError::InvalidRequest(_)) {
            error!(error = %self, "request failed");
        }

        let body = ErrorBody {
            detail: format!("Error processing query: {self}"),
        };
        (status, Json(body)).into_response()
    }
}
