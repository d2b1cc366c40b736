//! Thrown value → [`CanonicalError`].

use crate::error::CanonicalError;
use crate::error_code::ErrorKind;
use serde_json::{Map, Value};

/// Converts any value thrown by the backend into a [`CanonicalError`].
///
/// - strings are parsed as JSON; a parsed object is normalized as below, anything
///   else becomes `Unknown` carrying the original string as its message
/// - objects yield `code` (default `Unknown`), `message` (default: the object's JSON
///   text) and `details` (copied through when present)
/// - any other value becomes `Unknown` with its JSON text as the message
pub fn normalize_error(raw: Value) -> CanonicalError {
    match raw {
        Value::String(s) => match serde_json::from_str::<Value>(&s) {
            Ok(Value::Object(map)) => from_object(map),
            _ => CanonicalError::unknown(s),
        },
        Value::Object(map) => from_object(map),
        other => CanonicalError::unknown(other.to_string()),
    }
}

fn from_object(map: Map<String, Value>) -> CanonicalError {
    let code = match map.get("code") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => ErrorKind::Unknown.code().to_string(),
    };
    let message = match map.get("message") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => Value::Object(map.clone()).to_string(),
        Some(other) => other.to_string(),
    };
    let details = map.get("details").filter(|d| !d.is_null()).cloned();

    CanonicalError {
        code,
        message,
        details,
    }
}
