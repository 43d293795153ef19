//! Wire-timestamp normalization.
//!
//! The store's timestamp type shows up in several shapes once documents have
//! been written by different producers: a native BSON datetime, an integer
//! (seconds or milliseconds since the epoch), an RFC 3339 string, or nothing
//! at all. All read boundaries normalize through [`normalize_timestamp`]
//! instead of interpreting raw values inline.

use bson::Bson;

/// Integer values at or above this are interpreted as milliseconds since the
/// epoch; smaller values as seconds. (10^12 ms is Sep 2001; 10^12 s is
/// ~33,700 AD, far outside any plausible document.)
const MS_THRESHOLD: i64 = 1_000_000_000_000;

/// Normalize a store timestamp to milliseconds since the Unix epoch.
///
/// Accepts a BSON datetime, an int32/int64 in seconds or milliseconds, a
/// double in the same ranges, or an RFC 3339 string. Returns `None` for
/// missing (`Null`/absent) or unparseable values.
pub fn normalize_timestamp(value: &Bson) -> Option<i64> {
    match value {
        Bson::DateTime(dt) => Some(dt.timestamp_millis()),
        Bson::Int64(n) => Some(int_to_millis(*n)),
        Bson::Int32(n) => Some(int_to_millis(*n as i64)),
        Bson::Double(f) if f.is_finite() => Some(int_to_millis(*f as i64)),
        Bson::String(s) => bson::DateTime::parse_rfc3339_str(s)
            .ok()
            .map(|dt| dt.timestamp_millis()),
        _ => None,
    }
}

fn int_to_millis(n: i64) -> i64 {
    if n.abs() >= MS_THRESHOLD {
        n
    } else {
        n.saturating_mul(1000)
    }
}

/// Serde helper for model timestamp fields: accepts any shape
/// [`normalize_timestamp`] understands and yields a BSON datetime.
pub fn flexible_datetime<'de, D>(deserializer: D) -> Result<bson::DateTime, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;
    let raw = Bson::deserialize(deserializer)?;
    normalize_timestamp(&raw)
        .map(bson::DateTime::from_millis)
        .ok_or_else(|| serde::de::Error::custom("unrecognized timestamp value"))
}
