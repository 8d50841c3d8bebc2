//! Tolerant field lookup over backend JSON payloads.
//!
//! Backends disagree on field names (`createdDate` vs `createdAt`, `title` vs
//! `name`). Each helper takes a list of candidate names and returns the first
//! one present with a usable value.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::domain::MetadataMap;
use crate::error::{GatewayError, Result};

/// First string value among `keys`. Numbers are stringified.
pub fn str_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match value.get(*k) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Like [`str_field`] but missing is a decode error naming `what`.
pub fn required_str(value: &Value, keys: &[&str], what: &str) -> Result<String> {
    str_field(value, keys).ok_or_else(|| {
        GatewayError::Decode(format!(
            "{} is missing field '{}'",
            what,
            keys.first().copied().unwrap_or("?")
        ))
    })
}

pub fn u64_field(value: &Value, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|k| match value.get(*k) {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    })
}

pub fn bool_field(value: &Value, keys: &[&str]) -> Option<bool> {
    keys.iter().find_map(|k| match value.get(*k) {
        Some(Value::Bool(b)) => Some(*b),
        Some(Value::String(s)) => match s.to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

/// First timestamp among `keys`: RFC 3339, `YYYY-MM-DD`, or epoch milliseconds.
pub fn time_field(value: &Value, keys: &[&str]) -> Option<DateTime<Utc>> {
    keys.iter().find_map(|k| value.get(*k).and_then(parse_time))
}

pub fn parse_time(raw: &Value) -> Option<DateTime<Utc>> {
    match raw {
        Value::String(s) => {
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            // Alfresco emits `+0000` offsets without a colon.
            if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z") {
                return Some(dt.with_timezone(&Utc));
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| Utc.from_utc_datetime(&naive))
        }
        Value::Number(n) => n.as_i64().and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

/// A user reference that may be a plain string or an object with `id`/`displayName`.
pub fn user_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match value.get(*k) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(obj @ Value::Object(_)) => str_field(obj, &["displayName", "id", "name", "username"]),
        _ => None,
    })
}

/// First object among `keys`, as a metadata map.
pub fn map_field(value: &Value, keys: &[&str]) -> MetadataMap {
    keys.iter()
        .find_map(|k| value.get(*k).and_then(Value::as_object))
        .map(object_to_map)
        .unwrap_or_default()
}

pub fn object_to_map(obj: &Map<String, Value>) -> MetadataMap {
    obj.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

/// First array among `keys`. A bare top-level array is accepted as well.
pub fn list_field<'a>(value: &'a Value, keys: &[&str]) -> &'a [Value] {
    if let Value::Array(items) = value {
        return items;
    }
    keys.iter()
        .find_map(|k| value.get(*k).and_then(Value::as_array))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// String ids from the first array among `keys`, if any array is present.
///
/// Elements may be plain ids or objects carrying an `id`.
pub fn id_list_field(value: &Value, keys: &[&str]) -> Option<Vec<String>> {
    let items = keys.iter().find_map(|k| value.get(*k).and_then(Value::as_array))?;
    Some(
        items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                other => str_field(other, &["id"]),
            })
            .collect(),
    )
}
