use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use ce_core::{sanitize_input, Booking, BookingId, BookingReceipt};
use serde::Deserialize;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookRequest {
    pub event_id: String,
    /// Display name of the person booking.
    pub user: String,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct BookingFilter {
    pub event_id: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/bookings",
    params(BookingFilter),
    responses(
        (status = 200, description = "Bookings in booking order", body = [Booking])
    )
)]
pub async fn list_bookings(
    State(state): State<AppState>,
    Query(filter): Query<BookingFilter>,
) -> Json<Vec<Booking>> {
    let bookings = match filter.event_id {
        Some(event_id) => state.store.bookings_for_event(&event_id),
        None => state.store.bookings(),
    };
    Json(bookings)
}

/// If the client disconnects mid-request, the dropped future rolls the booking back, even
/// when the service has already confirmed it.
#[utoipa::path(
    post,
    path = "/api/v1/bookings",
    request_body = BookRequest,
    responses(
        (status = 201, description = "Booking confirmed", body = BookingReceipt),
        (status = 400, description = "Missing name or event"),
        (status = 404, description = "Unknown event"),
        (status = 409, description = "Confirmed id already taken"),
        (status = 503, description = "Booking service unavailable; nothing was kept")
    )
)]
pub async fn create_booking(
    State(state): State<AppState>,
    Json(req): Json<BookRequest>,
) -> Result<(StatusCode, Json<BookingReceipt>), ApiError> {
    let user = sanitize_input(&req.user).trim().to_owned();
    let event_id = req.event_id.trim().to_owned();
    if user.is_empty() {
        return Err(ApiError::BadRequest("a display name is required".into()));
    }
    if event_id.is_empty() {
        return Err(ApiError::BadRequest("an event id is required".into()));
    }
    if !state.store.events().iter().any(|e| e.id == event_id) {
        return Err(ApiError::NotFound(format!("unknown event {}", event_id)));
    }

    let receipt = state.store.book(event_id, user).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/bookings/{id}",
    params(("id" = String, Path, description = "Booking id")),
    responses(
        (status = 204, description = "Booking cancelled"),
        (status = 404, description = "No such booking")
    )
)]
pub async fn delete_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = BookingId::from(id);
    if state.store.remove_booking(&id) {
        info!(id = %id, "booking cancelled");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("no booking {}", id)))
    }
}
