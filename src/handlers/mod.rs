pub mod check_handler;
pub mod token_handler;
pub mod user_handler;

use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// Liveness probe.
pub async fn ping() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({})))
}

/// Session token id from the `token` request header, if present.
pub(crate) fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get("token")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub(crate) fn unauthorized() -> axum::response::Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({
            "error": "Missing required token in header, or token is invalid"
        })),
    )
        .into_response()
}
