//! Raw wire response → plain value.

use crate::error::CanonicalError;
use serde_json::Value;

const RAW_PREVIEW_LIMIT: usize = 200;

/// Accepts both wire encodings: JSON text is parsed, structured values pass through.
///
/// A string that is not valid JSON fails with an `Unknown` error, the same
/// classification any other thrown value would receive.
pub fn normalize_response(raw: Value) -> Result<Value, CanonicalError> {
    match raw {
        Value::String(text) => serde_json::from_str(&text).map_err(|e| {
            CanonicalError::unknown(format!("Malformed response payload: {}", e)).with_details(
                serde_json::json!({ "raw": preview(&text) }),
            )
        }),
        structured => Ok(structured),
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() <= RAW_PREVIEW_LIMIT {
        text.to_string()
    } else {
        let head: String = text.chars().take(RAW_PREVIEW_LIMIT).collect();
        format!("{}…", head)
    }
}
