//! Normalization of loosely shaped listings.
//!
//! Fixtures and callers hand over either a bare JSON array or an object wrapping the
//! array under a conventional field (`{"events": [...]}`). Everything else is treated
//! as an empty listing.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

/// Shape of a listing value before normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Listing<'a> {
    Bare(&'a [Value]),
    Wrapped(&'a [Value]),
    Unrecognized,
}

impl<'a> Listing<'a> {
    pub fn classify(value: &'a Value, field: &str) -> Self {
        match value {
            Value::Array(items) => Listing::Bare(items),
            Value::Object(map) => match map.get(field) {
                Some(Value::Array(items)) => Listing::Wrapped(items),
                _ => Listing::Unrecognized,
            },
            _ => Listing::Unrecognized,
        }
    }

    pub fn items(&self) -> &'a [Value] {
        match self {
            Listing::Bare(items) | Listing::Wrapped(items) => items,
            Listing::Unrecognized => &[],
        }
    }
}

/// Canonical sequence for a listing value. Elements that do not decode as `T` are
/// dropped.
pub fn normalize_listing<T: DeserializeOwned>(value: &Value, field: &str) -> Vec<T> {
    let listing = Listing::classify(value, field);
    if listing == Listing::Unrecognized && !value.is_null() {
        warn!(field, "unrecognized listing shape, using empty sequence");
    }

    listing
        .items()
        .iter()
        .filter_map(|item| match T::deserialize(item) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(field, error = %e, "dropping malformed listing entry");
                None
            }
        })
        .collect()
}
