use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Error responses carry an empty `events` list so the feed consumer can
/// fall back without a shape check. Backend failures never surface here;
/// they degrade to empty results inside the stores.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        };

        (
            status,
            Json(json!({
                "error": self.to_string(),
                "events": [],
            })),
        )
            .into_response()
    }
}
