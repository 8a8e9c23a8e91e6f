//! Conversions between wire JSON values and stored BSON values.
//!
//! Datetimes are stored as BSON datetimes and rendered on the wire as RFC 3339
//! strings with second precision and a `Z` suffix.

use bson::{Bson, Document as BsonDocument};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Map, Number, Value};

const NAIVE_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parses an ISO-8601 datetime.
///
/// Accepts RFC 3339 (any offset, normalized to UTC), a naive `YYYY-MM-DDTHH:MM:SS[.f]`
/// taken as UTC, or a bare `YYYY-MM-DD` taken as midnight UTC.
///
/// A space in place of a `+` offset sign is accepted too, since form decoding turns an
/// unencoded `+01:00` into ` 01:00`.
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    if let Some((local, offset)) = raw.rsplit_once(' ') {
        if local.contains('T') {
            if let Ok(parsed) = DateTime::parse_from_rfc3339(&format!("{local}+{offset}")) {
                return Some(parsed.with_timezone(&Utc));
            }
        }
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| datetime.and_utc())
}

/// Formats a datetime the way it appears in responses: `1980-06-30T00:00:00Z`.
pub fn format_datetime(datetime: &DateTime<Utc>) -> String {
    datetime.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn to_bson_datetime(datetime: &DateTime<Utc>) -> Bson {
    Bson::DateTime(bson::DateTime::from_millis(datetime.timestamp_millis()))
}

pub fn from_bson_datetime(datetime: &bson::DateTime) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(datetime.timestamp_millis())
}

/// Converts a stored BSON value to JSON for responses.
///
/// Datetimes render as RFC 3339 strings rather than BSON extended JSON.
pub fn bson_to_json(value: &Bson) -> Value {
    match value {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(b) => Value::Bool(*b),
        Bson::Int32(i) => Value::from(*i),
        Bson::Int64(i) => Value::from(*i),
        Bson::Double(d) => Number::from_f64(*d).map(Value::Number).unwrap_or(Value::Null),
        Bson::String(s) => Value::String(s.clone()),
        Bson::DateTime(d) => match from_bson_datetime(d) {
            Some(datetime) => Value::String(format_datetime(&datetime)),
            None => Value::Null,
        },
        Bson::Array(items) => Value::Array(items.iter().map(bson_to_json).collect()),
        Bson::Document(doc) => Value::Object(document_to_json_object(doc)),
        other => Value::String(other.to_string()),
    }
}

pub fn document_to_json_object(doc: &BsonDocument) -> Map<String, Value> {
    doc.iter()
        .map(|(key, value)| (key.clone(), bson_to_json(value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_every_accepted_datetime_shape() {
        let expected = "1980-03-01T00:00:00Z";

        for raw in [
            "1980-03-01",
            "1980-03-01T00:00:00",
            "1980-03-01T00:00:00.000",
            "1980-03-01 00:00:00",
            "1980-03-01T00:00:00Z",
            "1980-03-01T01:00:00+01:00",
        ] {
            let parsed = parse_datetime(raw).unwrap_or_else(|| panic!("failed to parse {raw}"));
            assert_eq!(format_datetime(&parsed), expected, "input {raw}");
        }
    }

    #[test]
    fn offset_with_decoded_plus_sign() {
        let parsed = parse_datetime("1980-06-30T10:00:00 01:00").unwrap();
        assert_eq!(format_datetime(&parsed), "1980-06-30T09:00:00Z");

        assert!(parse_datetime("1980-06-30T10:00:00 junk").is_none());
    }

    #[test]
    fn rejects_non_dates() {
        assert!(parse_datetime("yesterday").is_none());
        assert!(parse_datetime("1980-13-01").is_none());
        assert!(parse_datetime("").is_none());
    }

    #[test]
    fn datetime_survives_bson_storage_at_second_precision() {
        let original = parse_datetime("1980-06-30T12:34:56.789Z").unwrap();
        let stored = to_bson_datetime(&original);

        assert_eq!(bson_to_json(&stored), json!("1980-06-30T12:34:56Z"));
    }

    #[test]
    fn stored_values_render_as_plain_json() {
        let value = json!({
            "name": "Alice",
            "roles": ["admin", "user"],
            "sequence": 7,
            "ratio": 0.5,
            "locked": false,
            "nested": { "depth": 1 },
            "nothing": null,
        });

        let bson = bson::ser::serialize_to_bson(&value).unwrap();
        assert_eq!(bson_to_json(&bson), value);

        let doc = bson.as_document().unwrap();
        assert_eq!(doc.get("sequence"), Some(&Bson::Int64(7)));
    }
}
