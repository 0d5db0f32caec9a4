pub mod admin;
pub mod bookings;
pub mod catalog;

use axum::{
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use ce_core::{Booking, BookingReceipt, Event, NextEvent, ServiceError};
use ce_store::EventDraft;
use utoipa::OpenApi;

use crate::state::{AppState, ChangeNotice};

#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = 200, description = "OK")
    )
)]
async fn healthz() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        healthz,
        catalog::list_events,
        catalog::refresh_events,
        catalog::calendar,
        catalog::next_event,
        catalog::change_stream,
        bookings::list_bookings,
        bookings::create_booking,
        bookings::delete_booking,
        admin::add_event,
        admin::delete_event,
        admin::set_next_event,
        admin::clear_next_event,
    ),
    components(schemas(
        Event,
        Booking,
        BookingReceipt,
        ServiceError,
        NextEvent,
        EventDraft,
        ChangeNotice,
        bookings::BookRequest,
        admin::NextEventInput,
    )),
    tags(
        (name = "ce-api", description = "Campus events API")
    )
)]
pub struct ApiDoc;

pub fn router(state: AppState) -> Router {
    let api = ApiDoc::openapi();

    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/v1/events", get(catalog::list_events))
        .route("/api/v1/events/refresh", post(catalog::refresh_events))
        .route("/api/v1/calendar", get(catalog::calendar))
        .route("/api/v1/next-event", get(catalog::next_event))
        .route("/api/v1/stream", get(catalog::change_stream))
        .route(
            "/api/v1/bookings",
            get(bookings::list_bookings).post(bookings::create_booking),
        )
        .route("/api/v1/bookings/{id}", delete(bookings::delete_booking))
        .route("/api/v1/admin/events", post(admin::add_event))
        .route("/api/v1/admin/events/{id}", delete(admin::delete_event))
        .route(
            "/api/v1/admin/next-event",
            put(admin::set_next_event).delete(admin::clear_next_event),
        )
        .route("/openapi.json", get(|| async move { Json(api) }))
        .with_state(state)
}
