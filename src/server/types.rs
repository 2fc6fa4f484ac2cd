//! Shared response types for the HTTP layer.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// JSON error envelope: `{ "error": <message>, "detail": <detail>? }`.
pub struct ApiErrorType {
    status: StatusCode,
    message: String,
    detail: Option<String>,
}

impl From<(StatusCode, &str, Option<String>)> for ApiErrorType {
    fn from((status, message, detail): (StatusCode, &str, Option<String>)) -> Self {
        Self {
            status,
            message: message.to_string(),
            detail,
        }
    }
}

impl IntoResponse for ApiErrorType {
    fn into_response(self) -> Response {
        let body = match self.detail {
            Some(detail) => json!({ "error": self.message, "detail": detail }),
            None => json!({ "error": self.message }),
        };
        (self.status, Json(body)).into_response()
    }
}
