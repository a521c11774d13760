//! Error types and handling for web handlers

use axum::{Json, http::StatusCode, response::IntoResponse};
use thiserror::Error;

use crate::core::backend_client::BackendError;
use crate::core::uast_query::QueryError;
use crate::web::types::{ErrorMessage, ErrorResponse};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    Decode(String),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Query(#[from] QueryError),

    /// The parsing service answered, but reported a failure.
    #[error("Parsing service reported an error")]
    Rejected(Vec<String>),

    #[error("Gist not found")]
    GistNotFound,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Decode(_) => StatusCode::BAD_REQUEST,
            ApiError::Query(_) => StatusCode::BAD_REQUEST,
            ApiError::Rejected(_) => StatusCode::BAD_REQUEST,
            ApiError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::GistNotFound => StatusCode::NOT_FOUND,
        }
    }

    fn messages(&self) -> Vec<ErrorMessage> {
        match self {
            ApiError::Rejected(errors) if !errors.is_empty() => {
                errors.iter().cloned().map(ErrorMessage::new).collect()
            }
            other => vec![ErrorMessage::new(other.to_string())],
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, status = status.as_u16(), "request rejected");
        }

        (status, Json(ErrorResponse::new(self.messages()))).into_response()
    }
}
