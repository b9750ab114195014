use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use autocat_core::DomainError;
use autocat_infra::jobs::QueueError;

/// Webhook rejections are plain text: the caller only needs the violated rule.
pub fn rejection(err: &DomainError) -> Response {
    (StatusCode::BAD_REQUEST, err.to_string()).into_response()
}

pub fn queue_error_to_response(err: QueueError) -> Response {
    match err {
        QueueError::Closed => json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "queue_closed",
            err.to_string(),
        ),
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
