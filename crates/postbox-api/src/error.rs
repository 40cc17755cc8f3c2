use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use postbox_core::Error;

/// Transport-facing error wrapper. The core hands back tagged values; this
/// is the single place they turn into status codes and JSON bodies.
#[derive(Debug)]
pub enum ApiError {
    Core(Error),
    Unauthorized,
    Internal,
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError::Core(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Core(err) => {
                let status = match &err {
                    Error::NotFound | Error::RecordNotFound => StatusCode::NOT_FOUND,
                    Error::NoValidRecipients { .. } | Error::InvalidInput(_) => {
                        StatusCode::BAD_REQUEST
                    }
                    Error::DuplicateEmail | Error::DuplicateUsername => StatusCode::CONFLICT,
                    Error::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                };
                let body = match &err {
                    Error::NoValidRecipients { failed } => json!({
                        "error": err.to_string(),
                        "failed_recipients": failed,
                    }),
                    _ => json!({ "error": err.to_string() }),
                };
                (status, Json(body)).into_response()
            }
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "invalid credentials" })),
            )
                .into_response(),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "internal server error" })),
            )
                .into_response(),
        }
    }
}
