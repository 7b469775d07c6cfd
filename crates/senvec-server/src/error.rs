//! Mapping from `senvec_core::Error` to HTTP responses.
//!
//! Clients get a fixed message in `{"detail": ...}`; the underlying error is
//! logged, never returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use senvec_core::Error;
use tracing::{error, warn};

#[derive(Debug)]
pub enum ApiError {
    /// Rejected input; nothing was encoded or stored.
    BadRequest(&'static str),
    NotFound(&'static str),
    /// Encoding or comparison failed.
    Encoder { detail: &'static str, source: Error },
    /// The backing store failed, timed out, or lacks the index.
    Store { source: Error },
}

impl ApiError {
    pub fn encoder(detail: &'static str, source: Error) -> Self {
        ApiError::Encoder { detail, source }
    }

    pub fn store(source: Error) -> Self {
        ApiError::Store { source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Encoder { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Store {
                source: Error::Codec(_),
            } => StatusCode::BAD_GATEWAY,
            ApiError::Store { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn detail(&self) -> String {
        match self {
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) => (*msg).to_string(),
            ApiError::Encoder { detail, .. } => (*detail).to_string(),
            ApiError::Store {
                source: e @ Error::IndexNotFound(_),
            } => e.to_string(),
            ApiError::Store {
                source: Error::Codec(_),
            } => "Vector store returned an unreadable reply".to_string(),
            ApiError::Store { .. } => "Vector store unavailable".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Encoder { detail, source } => {
                error!(error = %source, "{}", detail);
            }
            ApiError::Store { source } => {
                error!(error = %source, "vector store request failed");
            }
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) => {
                warn!(status = status.as_u16(), "{}", msg);
            }
        }
        (status, Json(serde_json::json!({ "detail": self.detail() }))).into_response()
    }
}
