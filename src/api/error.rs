use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Error surfaced by single-resource endpoints as `{"error": <message>}`.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl ApiError {
    /// Keep the full context chain; callers see the raw upstream message.
    pub fn not_found(e: &anyhow::Error) -> Self {
        Self::NotFound(format!("{e:#}"))
    }

    pub fn internal(e: &anyhow::Error) -> Self {
        Self::Internal(format!("{e:#}"))
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(msg) | Self::BadRequest(msg) | Self::Internal(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
