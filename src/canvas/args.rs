//! Argument shaping between the model's tool call and the remote tool.
//!
//! Models send ids as strings, dates in whatever form they like, and use
//! the friendlier parameter names from the catalogue. The remote server
//! wants integers, UTC timestamps and its own field names.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use tracing::debug;

use super::catalog::CanvasTool;

/// Fields that carry timestamps.
pub const DATE_FIELDS: &[&str] = &[
    "due_at",
    "start_at",
    "end_at",
    "delayed_post_at",
    "unlock_at",
    "lock_at",
];

/// Parses raw tool-call arguments into an object. Empty input is `{}`.
///
/// # Errors
///
/// Returns a description of the problem when the text is not a JSON object.
pub fn parse_arguments(raw: &str) -> Result<Map<String, Value>, String> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Map::new()),
        Ok(other) => Err(format!("expected a JSON object, got {other}")),
        Err(e) => Err(format!("malformed JSON: {e}")),
    }
}

/// Builds the remote argument object for a catalogue entry.
///
/// Order: drop nulls, apply renames, fill defaults, coerce ids, normalize dates.
#[must_use]
pub fn prepare(tool: &CanvasTool, args: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();

    for (key, value) in args {
        if value.is_null() {
            continue;
        }
        let target = tool
            .renames
            .iter()
            .find(|(from, _)| from == key)
            .map_or(key.as_str(), |(_, to)| to);
        insert_path(&mut out, target, value.clone());
    }

    for (key, fixed) in tool.defaults {
        out.entry((*key).to_string())
            .or_insert_with(|| fixed.to_value());
    }

    for (key, value) in &mut out {
        if key.ends_with("_id") {
            coerce_id(value);
        } else if DATE_FIELDS.contains(&key.as_str())
            && let Value::String(text) = value
        {
            *text = normalize_date(text);
        }
    }

    out
}

/// Inserts `value` at a dotted path. A trailing `[]` wraps it in an array.
fn insert_path(target: &mut Map<String, Value>, path: &str, value: Value) {
    let (path, value) = match path.strip_suffix("[]") {
        Some(stripped) => (stripped, Value::Array(vec![value])),
        None => (path, value),
    };

    let mut segments = path.split('.').peekable();
    let mut current = target;
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            current.insert(segment.to_string(), value);
            return;
        }
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Value::Object(next) = entry else {
            return;
        };
        current = next;
    }
}

/// Turns a numeric string into an integer in place.
fn coerce_id(value: &mut Value) {
    if let Value::String(text) = value
        && let Ok(n) = text.trim().parse::<i64>()
    {
        *value = Value::from(n);
    }
}

/// Normalizes a timestamp to UTC RFC 3339 (`2025-10-27T17:00:00Z`).
///
/// Accepts RFC 3339 with any offset, a naive `YYYY-MM-DDTHH:MM[:SS]`
/// (taken as UTC) or a bare `YYYY-MM-DD` (midnight UTC). Anything else is
/// returned unchanged for the server to validate.
#[must_use]
pub fn normalize_date(text: &str) -> String {
    let trimmed = text.trim();

    let parsed = DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
                .map(|naive| naive.and_utc())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        });

    if let Some(dt) = parsed {
        dt.to_rfc3339_opts(SecondsFormat::Secs, true)
    } else {
        debug!(value = trimmed, "date not recognized, passing through");
        text.to_string()
    }
}

/// Prefixes a success message and link when the response carries `html_url`.
///
/// Array responses are checked on their first element. Non-JSON responses
/// are returned unchanged.
#[must_use]
pub fn format_with_link(response: &str, message: &str) -> String {
    let Ok(data) = serde_json::from_str::<Value>(response) else {
        return response.to_string();
    };
    let target = match &data {
        Value::Array(items) => items.first(),
        other => Some(other),
    };
    match target.and_then(|t| t.get("html_url")).and_then(Value::as_str) {
        Some(url) => format!("{message}. Link: {url}\n\nDetails: {response}"),
        None => response.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::catalog::find;
    use serde_json::json;
    use test_case::test_case;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test_case("", true ; "empty is object")]
    #[test_case("  ", true ; "blank is object")]
    #[test_case("null", true ; "null is object")]
    #[test_case(r#"{"course_id": 1}"#, true ; "object")]
    #[test_case("[1, 2]", false ; "array rejected")]
    #[test_case("{not json", false ; "malformed rejected")]
    fn test_parse_arguments(raw: &str, ok: bool) {
        assert_eq!(parse_arguments(raw).is_ok(), ok);
    }

    #[test]
    fn test_prepare_assignment_renames_defaults_and_coerces() {
        let Some(tool) = find("create_canvas_assignment") else {
            unreachable!()
        };
        let args = object(json!({
            "course_id": "42",
            "assignment_name": "Essay 1",
            "due_date": "2025-10-27T12:00:00-05:00",
            "description": null,
        }));

        let prepared = prepare(tool, &args);
        assert_eq!(
            Value::Object(prepared),
            json!({
                "course_id": 42,
                "name": "Essay 1",
                "due_at": "2025-10-27T17:00:00Z",
                "points_possible": 0,
                "description": "",
            })
        );
    }

    #[test]
    fn test_prepare_nested_user_fields() {
        let Some(tool) = find("create_user") else {
            unreachable!()
        };
        let args = object(json!({
            "account_id": 1,
            "name": "Ada",
            "unique_id": "ada@example.edu",
            "password": "pw",
        }));
        let prepared = prepare(tool, &args);
        assert_eq!(
            Value::Object(prepared),
            json!({
                "account_id": 1,
                "user": { "name": "Ada" },
                "pseudonym": { "unique_id": "ada@example.edu", "password": "pw" },
            })
        );
    }

    #[test]
    fn test_prepare_wraps_message_recipient() {
        let Some(tool) = find("send_canvas_message") else {
            unreachable!()
        };
        let args = object(json!({ "user_id": "77", "subject": "Hi", "body": "Hello" }));
        let prepared = prepare(tool, &args);
        assert_eq!(prepared["recipients"], json!(["77"]));
        assert!(!prepared.contains_key("user_id"));
    }

    #[test]
    fn test_prepare_keeps_explicit_value_over_default() {
        let Some(tool) = find("create_quiz") else {
            unreachable!()
        };
        let args = object(json!({ "course_id": 3, "title": "Q1", "published": true }));
        let prepared = prepare(tool, &args);
        assert_eq!(prepared["published"], json!(true));
        assert_eq!(prepared["quiz_type"], json!("assignment"));
    }

    #[test]
    fn test_non_numeric_id_is_left_alone() {
        let Some(tool) = find("get_submissions") else {
            unreachable!()
        };
        let args = object(json!({ "course_id": "7", "assignment_id": "9" }));
        let prepared = prepare(tool, &args);
        assert_eq!(prepared["user_id"], json!("self"));
        assert_eq!(prepared["course_id"], json!(7));
        assert_eq!(prepared["assignment_id"], json!(9));
    }

    #[test_case("2025-10-27T17:00:00Z", "2025-10-27T17:00:00Z" ; "utc passthrough")]
    #[test_case("2025-10-27T19:00:00+02:00", "2025-10-27T17:00:00Z" ; "offset converted")]
    #[test_case("2025-10-27T17:00:00", "2025-10-27T17:00:00Z" ; "naive as utc")]
    #[test_case("2025-10-27T17:00", "2025-10-27T17:00:00Z" ; "naive minutes")]
    #[test_case("2025-10-27", "2025-10-27T00:00:00Z" ; "bare date")]
    #[test_case("next Friday", "next Friday" ; "unparseable passthrough")]
    fn test_normalize_date(input: &str, expected: &str) {
        assert_eq!(normalize_date(input), expected);
    }

    #[test]
    fn test_format_with_link_object() {
        let response = r#"{"id": 5, "html_url": "https://canvas.example/courses/1/assignments/5"}"#;
        let out = format_with_link(response, "Assignment 'Essay' created");
        assert!(out.starts_with(
            "Assignment 'Essay' created. Link: https://canvas.example/courses/1/assignments/5\n\nDetails: "
        ));
        assert!(out.ends_with(response));
    }

    #[test]
    fn test_format_with_link_array_uses_first_item() {
        let response = r#"[{"html_url": "https://canvas.example/x"}, {"html_url": "https://canvas.example/y"}]"#;
        let out = format_with_link(response, "Done");
        assert!(out.starts_with("Done. Link: https://canvas.example/x"));
    }

    #[test_case("plain text" ; "not json")]
    #[test_case(r#"{"id": 1}"# ; "no link")]
    #[test_case("[]" ; "empty array")]
    fn test_format_with_link_passthrough(response: &str) {
        assert_eq!(format_with_link(response, "Done"), response);
    }
}
