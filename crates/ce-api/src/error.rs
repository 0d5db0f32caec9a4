use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ce_store::{AdminError, BookingError};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("admin only")]
    Forbidden,
    #[error(transparent)]
    Booking(#[from] BookingError),
    #[error(transparent)]
    Admin(#[from] AdminError),
    #[error("event catalog unavailable: {0}")]
    Catalog(anyhow::Error),
}

/// Build error response with JSON payload
pub fn error_response(status: StatusCode, error: &str, detail: &str) -> Response {
    let body = serde_json::json!({
        "error": error,
        "detail": detail,
    });
    (status, Json(body)).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let detail = self.to_string();
        let (status, code) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "InvalidRequest"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden"),
            ApiError::Booking(BookingError::Service(e)) => (
                StatusCode::from_u16(e.code)
                    .ok()
                    .filter(|s| s.is_client_error() || s.is_server_error())
                    .unwrap_or(StatusCode::BAD_GATEWAY),
                "BookingFailed",
            ),
            ApiError::Booking(BookingError::DuplicateId(_)) => (StatusCode::CONFLICT, "BookingConflict"),
            ApiError::Admin(AdminError::MissingFields | AdminError::InvalidDate(_)) => {
                (StatusCode::BAD_REQUEST, "InvalidEvent")
            }
            ApiError::Admin(AdminError::DuplicateEvent(_)) => (StatusCode::CONFLICT, "DuplicateEvent"),
            ApiError::Admin(AdminError::Storage(_)) => {
                error!(error = %detail, "admin storage failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "StorageError")
            }
            ApiError::Catalog(_) => {
                error!(error = %detail, "catalog refresh failed");
                (StatusCode::BAD_GATEWAY, "CatalogUnavailable")
            }
        };
        error_response(status, code, &detail)
    }
}
