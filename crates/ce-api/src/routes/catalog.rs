use axum::{
    extract::{Query, State},
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    Json,
};
use ce_core::{events_by_day, search_events, Event, NextEvent};
use futures_util::stream;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::{convert::Infallible, time::Duration};
use time::OffsetDateTime;
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;
use utoipa::IntoParams;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EventSearch {
    /// Case-insensitive text matched against title and description.
    pub q: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/events",
    params(EventSearch),
    responses(
        (status = 200, description = "Current event catalog, admin events first", body = [Event])
    )
)]
pub async fn list_events(State(state): State<AppState>, Query(search): Query<EventSearch>) -> Json<Vec<Event>> {
    let events = state.store.events();
    match search.q {
        Some(q) => Json(search_events(&events, &q)),
        None => Json(events),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/events/refresh",
    responses(
        (status = 200, description = "Catalog reloaded"),
        (status = 502, description = "Catalog source unavailable")
    )
)]
pub async fn refresh_events(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let count = state.refresh().await.map_err(ApiError::Catalog)?;
    Ok(Json(json!({ "events": count })))
}

#[utoipa::path(
    get,
    path = "/api/v1/calendar",
    responses(
        (status = 200, description = "Events keyed by YYYY-MM-DD")
    )
)]
pub async fn calendar(State(state): State<AppState>) -> Json<BTreeMap<String, Vec<Event>>> {
    Json(events_by_day(&state.store.events()))
}

#[utoipa::path(
    get,
    path = "/api/v1/next-event",
    responses(
        (status = 200, description = "Countdown target, or null when nothing is upcoming", body = NextEvent)
    )
)]
pub async fn next_event(State(state): State<AppState>) -> Json<Option<NextEvent>> {
    let events = state.store.events();
    Json(state.admin.next_event(&events, OffsetDateTime::now_utc()))
}

#[utoipa::path(
    get,
    path = "/api/v1/stream",
    responses(
        (status = 200, description = "SSE stream of store change notices")
    )
)]
pub async fn change_stream(
    State(state): State<AppState>,
) -> Sse<impl futures_core::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = state.changes.subscribe();
    let notices = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(notice) => {
                    let event = SseEvent::default()
                        .event("change")
                        .json_data(&notice)
                        .unwrap_or_else(|_| SseEvent::default().event("change"));
                    return Some((Ok(event), rx));
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "change stream subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(notices).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
