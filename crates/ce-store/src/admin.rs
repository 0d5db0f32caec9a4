//! Admin-entered events and the countdown override.

use ce_adapters::admin_events;
use ce_core::{parse_event_time, select_next_event, to_iso, Event, NextEvent, TBA};
use ce_storage::{keys, write_json, DurableStorage, StorageError};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};
use utoipa::ToSchema;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("an event needs at least an id and a title")]
    MissingFields,
    #[error("event {0} already exists")]
    DuplicateEvent(String),
    #[error("invalid date/time: {0}")]
    InvalidDate(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Admin form input. Only `id` and `title` are required.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct EventDraft {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl EventDraft {
    fn into_event(self) -> Result<Event, AdminError> {
        let id = self.id.trim().to_owned();
        let title = self.title.trim().to_owned();
        if id.is_empty() || title.is_empty() {
            return Err(AdminError::MissingFields);
        }
        let date = self
            .date
            .as_deref()
            .and_then(parse_event_time)
            .map(to_iso)
            .unwrap_or_else(|| TBA.to_owned());
        let location = filled(self.location).unwrap_or_else(|| TBA.to_owned());
        Ok(Event {
            id,
            title,
            date,
            location,
            description: filled(self.description).unwrap_or_default(),
            image: filled(self.image),
        })
    }
}

fn filled(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
}

/// Owner of the admin events key and the next-event override key.
pub struct AdminEvents {
    storage: Arc<dyn DurableStorage>,
}

impl AdminEvents {
    pub fn new(storage: Arc<dyn DurableStorage>) -> Self {
        Self { storage }
    }

    /// Admin events in entry order. Unreadable content counts as none.
    pub fn list(&self) -> Vec<Event> {
        admin_events(self.storage.as_ref())
    }

    pub fn add(&self, draft: EventDraft) -> Result<Event, AdminError> {
        let event = draft.into_event()?;
        let mut events = self.list();
        if events.iter().any(|e| e.id == event.id) {
            return Err(AdminError::DuplicateEvent(event.id));
        }
        events.push(event.clone());
        write_json(self.storage.as_ref(), keys::ADMIN_EVENTS, &events)?;
        info!(id = %event.id, date = %event.date, "admin event added");
        Ok(event)
    }

    /// Returns whether the event was among the admin events.
    pub fn remove(&self, id: &str) -> Result<bool, AdminError> {
        let mut events = self.list();
        let before = events.len();
        events.retain(|e| e.id != id);
        if events.len() == before {
            return Ok(false);
        }
        write_json(self.storage.as_ref(), keys::ADMIN_EVENTS, &events)?;
        info!(id, "admin event removed");
        Ok(true)
    }

    /// Stored override, if any. Older data may hold a bare ISO string instead of an object.
    pub fn next_event_override(&self) -> Option<NextEvent> {
        let raw = match self.storage.get(keys::NEXT_EVENT) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "next-event override unreadable");
                return None;
            }
        };
        if let Ok(target) = serde_json::from_str::<NextEvent>(&raw) {
            if !target.iso.trim().is_empty() {
                return Some(target);
            }
        }
        let iso = match serde_json::from_str::<Value>(&raw) {
            Ok(Value::String(s)) => s,
            Ok(_) => return None,
            Err(_) => raw,
        };
        let iso = iso.trim();
        (!iso.is_empty()).then(|| NextEvent {
            iso: iso.to_owned(),
            title: None,
            id: None,
        })
    }

    pub fn set_next_event(&self, when: &str, title: Option<String>) -> Result<NextEvent, AdminError> {
        let at = parse_event_time(when).ok_or_else(|| AdminError::InvalidDate(when.to_owned()))?;
        let target = NextEvent {
            iso: to_iso(at),
            title: filled(title),
            id: None,
        };
        write_json(self.storage.as_ref(), keys::NEXT_EVENT, &target)?;
        info!(iso = %target.iso, "next-event override saved");
        Ok(target)
    }

    pub fn clear_next_event(&self) -> Result<(), AdminError> {
        self.storage.remove(keys::NEXT_EVENT)?;
        info!("next-event override cleared");
        Ok(())
    }

    /// Countdown target given the current catalog.
    pub fn next_event(&self, events: &[Event], now: OffsetDateTime) -> Option<NextEvent> {
        select_next_event(self.next_event_override(), &self.list(), events, now)
    }
}
