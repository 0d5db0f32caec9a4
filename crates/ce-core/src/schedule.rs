//! Event times: parsing, the "next event" countdown target, and calendar day grouping.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};
use utoipa::ToSchema;

use crate::Event;

/// Target of the home countdown. Also the stored shape of the admin override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NextEvent {
    pub iso: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

/// Parse an event date. Accepts RFC 3339, `YYYY-MM-DDThh:mm[:ss]` (taken as UTC) and bare
/// `YYYY-MM-DD` (midnight UTC). `TBA` and anything else yields `None`.
pub fn parse_event_time(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(dt);
    }
    if let Ok(dt) = PrimitiveDateTime::parse(
        raw,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Some(dt.assume_utc());
    }
    if let Ok(dt) = PrimitiveDateTime::parse(raw, format_description!("[year]-[month]-[day]T[hour]:[minute]")) {
        return Some(dt.assume_utc());
    }
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|d| d.midnight().assume_utc())
}

/// RFC 3339 rendering in UTC.
pub fn to_iso(dt: OffsetDateTime) -> String {
    let utc = dt.to_offset(UtcOffset::UTC);
    utc.format(&Rfc3339).unwrap_or_else(|_| utc.to_string())
}

/// Pick the countdown target: the admin override when set, otherwise the earliest future
/// admin event, otherwise the earliest future event overall.
pub fn select_next_event(
    override_target: Option<NextEvent>,
    admin_events: &[Event],
    events: &[Event],
    now: OffsetDateTime,
) -> Option<NextEvent> {
    if let Some(target) = override_target {
        if !target.iso.trim().is_empty() {
            return Some(target);
        }
    }
    earliest_future(admin_events, now).or_else(|| earliest_future(events, now))
}

fn earliest_future(events: &[Event], now: OffsetDateTime) -> Option<NextEvent> {
    events
        .iter()
        .filter_map(|ev| ev.starts_at().filter(|at| *at > now).map(|at| (at, ev)))
        .min_by_key(|(at, _)| *at)
        .map(|(at, ev)| NextEvent {
            iso: to_iso(at),
            title: non_empty(&ev.title),
            id: non_empty(&ev.id),
        })
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_owned())
}

/// Calendar key (`YYYY-MM-DD`) for an event date.
pub fn day_key(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let b = raw.as_bytes();
    let dated_prefix = b.len() >= 10
        && b[4] == b'-'
        && b[7] == b'-'
        && b[..10]
            .iter()
            .enumerate()
            .all(|(i, c)| i == 4 || i == 7 || c.is_ascii_digit());
    if dated_prefix {
        return Some(raw[..10].to_owned());
    }
    parse_event_time(raw).map(|dt| dt.to_offset(UtcOffset::UTC).date().to_string())
}

/// Group events by calendar day, keeping input order within a day. Undated events are
/// left out.
pub fn events_by_day(events: &[Event]) -> BTreeMap<String, Vec<Event>> {
    let mut days: BTreeMap<String, Vec<Event>> = BTreeMap::new();
    for ev in events {
        if let Some(key) = day_key(&ev.date) {
            days.entry(key).or_default().push(ev.clone());
        }
    }
    days
}
