//! Lenient timestamp decoding for stored records.
//!
//! Timestamps are written as RFC 3339 strings. Older records may hold epoch
//! milliseconds instead.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<OffsetDateTime, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Millis(i64),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Text(s) => OffsetDateTime::parse(&s, &Rfc3339).map_err(D::Error::custom),
        Raw::Millis(ms) => {
            OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000).map_err(D::Error::custom)
        }
    }
}
