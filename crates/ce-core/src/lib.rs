pub mod listing;
pub mod schedule;
pub mod text;
pub mod timestamp;

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use thiserror::Error;
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

pub use listing::{normalize_listing, Listing};
pub use schedule::{events_by_day, parse_event_time, select_next_event, to_iso, NextEvent};
pub use text::{sanitize_input, search_events};

/// Date sentinel for events without a scheduled time.
pub const TBA: &str = "TBA";

/// Reserved prefix marking an id as provisional (not yet confirmed by the booking service).
pub const PROVISIONAL_PREFIX: &str = "temp-";

/// Booking identifier.
///
/// Provisional ids are minted locally and carry [`PROVISIONAL_PREFIX`]; confirmed ids
/// are whatever the booking service assigned. Numeric ids on the wire are kept as their
/// decimal text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, ToSchema)]
#[serde(transparent)]
pub struct BookingId(String);

impl BookingId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a fresh provisional id. Uniqueness comes from a random v4 uuid, so two calls
    /// in the same clock tick (or for the same event) never collide.
    pub fn provisional() -> Self {
        Self(format!("{PROVISIONAL_PREFIX}{}", Uuid::new_v4().simple()))
    }

    pub fn is_provisional(&self) -> bool {
        self.0.starts_with(PROVISIONAL_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for BookingId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => Self(s),
            Raw::Number(n) => Self(n.to_string()),
        })
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BookingId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for BookingId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<u64> for BookingId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

/// A campus event as listed in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Event {
    pub id: String,
    pub title: String,
    /// RFC 3339 timestamp, a bare `YYYY-MM-DD` date, or [`TBA`].
    #[serde(default = "tba")]
    pub date: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

fn tba() -> String {
    TBA.to_owned()
}

impl Event {
    pub fn is_tba(&self) -> bool {
        self.date.trim().eq_ignore_ascii_case(TBA)
    }

    /// Parsed start time, if the date field holds one.
    pub fn starts_at(&self) -> Option<OffsetDateTime> {
        parse_event_time(&self.date)
    }
}

/// Club records are opaque to this system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = Object)]
pub struct Club(pub serde_json::Value);

/// Events and clubs as delivered by the event repository.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Catalog {
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub clubs: Vec<Club>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: BookingId,
    pub event_id: String,
    pub user: String,
    #[serde(
        serialize_with = "time::serde::rfc3339::serialize",
        deserialize_with = "timestamp::deserialize"
    )]
    #[schema(value_type = String, format = DateTime)]
    pub created: OffsetDateTime,
}

impl Booking {
    /// New booking with a provisional id, stamped now.
    pub fn provisional(event_id: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            id: BookingId::provisional(),
            event_id: event_id.into(),
            user: user.into(),
            created: OffsetDateTime::now_utc(),
        }
    }
}

/// What the booking service answers on success: a status, the confirmed id, and the
/// echoed request fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingReceipt {
    pub status: String,
    pub id: BookingId,
    pub event_id: String,
    pub user: String,
    #[serde(
        serialize_with = "time::serde::rfc3339::serialize",
        deserialize_with = "timestamp::deserialize"
    )]
    #[schema(value_type = String, format = DateTime)]
    pub created: OffsetDateTime,
}

impl BookingReceipt {
    pub fn confirmed(booking: &Booking, id: BookingId) -> Self {
        Self {
            status: "ok".into(),
            id,
            event_id: booking.event_id.clone(),
            user: booking.user.clone(),
            created: booking.created,
        }
    }
}

/// Failure reported by the booking service. The message is surfaced to callers as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize, ToSchema)]
#[error("{message}")]
pub struct ServiceError {
    pub code: u16,
    pub message: String,
}

impl ServiceError {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(503, message)
    }

    pub fn timed_out() -> Self {
        Self::new(504, "Booking service timed out")
    }
}
