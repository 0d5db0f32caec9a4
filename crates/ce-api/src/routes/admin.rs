use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use ce_core::{Event, NextEvent};
use ce_store::EventDraft;
use serde::Deserialize;
use tracing::warn;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct NextEventInput {
    /// RFC 3339 or `YYYY-MM-DDThh:mm`, read as UTC.
    pub when: String,
    #[serde(default)]
    pub title: Option<String>,
}

fn require_admin(state: &AppState) -> Result<(), ApiError> {
    if state.admin_enabled {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

/// Reload the catalog after an admin change. The change itself is already durable, so a
/// failed reload only leaves the cached catalog stale.
async fn refresh_after_change(state: &AppState) {
    if let Err(e) = state.refresh().await {
        warn!(error = %e, "catalog refresh after admin change failed");
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/events",
    request_body = EventDraft,
    responses(
        (status = 201, description = "Event added", body = Event),
        (status = 400, description = "Missing id or title"),
        (status = 403, description = "Admin mode disabled"),
        (status = 409, description = "Event id already used")
    )
)]
pub async fn add_event(
    State(state): State<AppState>,
    Json(draft): Json<EventDraft>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    require_admin(&state)?;
    let event = state.admin.add(draft)?;
    refresh_after_change(&state).await;
    Ok((StatusCode::CREATED, Json(event)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/events/{id}",
    params(("id" = String, Path, description = "Event id")),
    responses(
        (status = 204, description = "Event deleted"),
        (status = 403, description = "Admin mode disabled"),
        (status = 404, description = "No such event")
    )
)]
pub async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_admin(&state)?;
    let persisted = state.admin.remove(&id)?;
    let cached = state.store.remove_event(&id);
    if !persisted && !cached {
        return Err(ApiError::NotFound(format!("no event {}", id)));
    }
    refresh_after_change(&state).await;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/next-event",
    request_body = NextEventInput,
    responses(
        (status = 200, description = "Countdown override saved", body = NextEvent),
        (status = 400, description = "Unparsable date/time"),
        (status = 403, description = "Admin mode disabled")
    )
)]
pub async fn set_next_event(
    State(state): State<AppState>,
    Json(input): Json<NextEventInput>,
) -> Result<Json<NextEvent>, ApiError> {
    require_admin(&state)?;
    if input.when.trim().is_empty() {
        return Err(ApiError::BadRequest("please choose a date and time".into()));
    }
    Ok(Json(state.admin.set_next_event(&input.when, input.title)?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/next-event",
    responses(
        (status = 204, description = "Countdown override cleared"),
        (status = 403, description = "Admin mode disabled")
    )
)]
pub async fn clear_next_event(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    require_admin(&state)?;
    state.admin.clear_next_event()?;
    Ok(StatusCode::NO_CONTENT)
}
