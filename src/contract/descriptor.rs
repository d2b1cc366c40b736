//! Contract descriptor and its response checker.
//!
//! The schema language is a JSON-schema subset:
//! - `type` (a name or a list of names): string, integer, number, boolean, array, object, null
//! - `nullable`
//! - string constraints: `minLength`, `maxLength`, `pattern`
//! - number constraints: `minimum`, `maximum`
//! - array constraints: `minItems`, `maxItems`, `items`
//! - object constraints: `required`, `properties` (recursive)
//! - `enum`
//!
//! Undeclared object fields are never reported. `additionalProperties` is ignored.

use super::error::{ContractViolation, Issue};
use crate::error::CanonicalError;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

type Patterns = HashMap<String, Regex>;

/// Compiled `pattern` keywords of a schema, built on first check.
#[derive(Debug, Clone, Default)]
struct PatternCache(OnceCell<Patterns>);

// Derived from `schema`, so it never decides equality.
impl PartialEq for PatternCache {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

fn default_version() -> u32 {
    1
}

fn default_idempotent() -> bool {
    true
}

/// Versioned response contract for one backend command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractDescriptor {
    /// Backend command this contract applies to
    pub command: String,
    #[serde(default = "default_version")]
    pub version: u32,
    /// Response schema
    pub schema: Value,
    /// Whether repeating the command is harmless. Non-idempotent commands are
    /// cancelled rather than detached when an attempt times out.
    #[serde(default = "default_idempotent")]
    pub idempotent: bool,
    #[serde(skip)]
    patterns: PatternCache,
}

impl ContractDescriptor {
    pub fn new(command: impl Into<String>, schema: Value) -> Self {
        Self {
            command: command.into(),
            version: default_version(),
            schema,
            idempotent: true,
            patterns: PatternCache::default(),
        }
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn non_idempotent(mut self) -> Self {
        self.idempotent = false;
        self
    }

    /// Checks `value` and returns every violated field.
    pub fn check(&self, value: &Value) -> Result<(), ContractViolation> {
        let patterns = self.patterns.0.get_or_init(|| {
            let mut compiled = Patterns::new();
            collect_patterns(&self.schema, &mut compiled);
            compiled
        });
        let mut issues = Vec::new();
        check_against(value, &self.schema, "", patterns, &mut issues);
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ContractViolation::new(issues))
        }
    }

    /// Checks `value` and hands it back unchanged, undeclared fields included.
    pub fn validate(&self, value: Value) -> Result<Value, CanonicalError> {
        match self.check(&value) {
            Ok(()) => Ok(value),
            Err(violation) => Err(violation.into_canonical(&self.command)),
        }
    }
}

// Patterns that do not compile are left out; the loader rejects those up front.
fn collect_patterns(schema: &Value, out: &mut Patterns) {
    match schema {
        Value::Object(map) => {
            if let Some(Value::String(pattern)) = map.get("pattern") {
                if !out.contains_key(pattern) {
                    if let Ok(re) = Regex::new(pattern) {
                        out.insert(pattern.clone(), re);
                    }
                }
            }
            map.values().for_each(|child| collect_patterns(child, out));
        }
        Value::Array(items) => items.iter().for_each(|child| collect_patterns(child, out)),
        _ => {}
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

fn type_name(data: &Value) -> &'static str {
    match data {
        Value::String(_) => "string",
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                "integer"
            } else {
                "number"
            }
        }
        Value::Bool(_) => "boolean",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
        Value::Null => "null",
    }
}

fn matches_type(data: &Value, expected: &str) -> bool {
    match expected {
        "string" => data.is_string(),
        "integer" => data.is_i64() || data.is_u64(),
        "number" => data.is_number(),
        "boolean" => data.is_boolean(),
        "array" => data.is_array(),
        "object" => data.is_object(),
        "null" => data.is_null(),
        _ => true, // Unknown type, accept anything
    }
}

fn declared_types(schema: &Value) -> Vec<&str> {
    match schema.get("type") {
        Some(Value::String(t)) => vec![t.as_str()],
        Some(Value::Array(ts)) => ts.iter().filter_map(|t| t.as_str()).collect(),
        _ => Vec::new(),
    }
}

fn check_against(
    data: &Value,
    schema: &Value,
    path: &str,
    patterns: &Patterns,
    issues: &mut Vec<Issue>,
) {
    let nullable = schema
        .get("nullable")
        .and_then(|n| n.as_bool())
        .unwrap_or(false);
    if nullable && data.is_null() {
        return;
    }

    let types = declared_types(schema);
    if !types.is_empty() && !types.iter().any(|t| matches_type(data, t)) {
        issues.push(Issue::new(
            path,
            format!(
                "Expected type '{}', got '{}'",
                types.join("' or '"),
                type_name(data)
            ),
        ));
        return;
    }

    match data {
        Value::String(s) => check_string(s, schema, path, patterns, issues),
        Value::Number(_) => {
            if let Some(num) = data.as_f64() {
                check_number(num, schema, path, issues);
            }
        }
        Value::Array(items) => check_array(items, schema, path, patterns, issues),
        Value::Object(_) => check_object(data, schema, path, patterns, issues),
        _ => {}
    }

    if let Some(allowed) = schema.get("enum").and_then(|e| e.as_array()) {
        if !allowed.contains(data) {
            let listed: Vec<String> = allowed.iter().map(|v| v.to_string()).collect();
            issues.push(Issue::new(
                path,
                format!("Value not in allowed enum values: {}", listed.join(", ")),
            ));
        }
    }
}

fn check_string(
    s: &str,
    schema: &Value,
    path: &str,
    patterns: &Patterns,
    issues: &mut Vec<Issue>,
) {
    let len = s.chars().count();

    if let Some(min_length) = schema.get("minLength").and_then(|m| m.as_u64()) {
        if (len as u64) < min_length {
            issues.push(Issue::new(
                path,
                format!("String too short (minimum {} characters)", min_length),
            ));
        }
    }

    if let Some(max_length) = schema.get("maxLength").and_then(|m| m.as_u64()) {
        if (len as u64) > max_length {
            issues.push(Issue::new(
                path,
                format!("String too long (maximum {} characters)", max_length),
            ));
        }
    }

    if let Some(pattern) = schema.get("pattern").and_then(|p| p.as_str()) {
        if let Some(re) = patterns.get(pattern) {
            if !re.is_match(s) {
                issues.push(Issue::new(
                    path,
                    format!("String does not match pattern '{}'", pattern),
                ));
            }
        }
    }
}

fn check_number(value: f64, schema: &Value, path: &str, issues: &mut Vec<Issue>) {
    if let Some(minimum) = schema.get("minimum").and_then(|m| m.as_f64()) {
        if value < minimum {
            issues.push(Issue::new(path, format!("Value below minimum ({})", minimum)));
        }
    }

    if let Some(maximum) = schema.get("maximum").and_then(|m| m.as_f64()) {
        if value > maximum {
            issues.push(Issue::new(path, format!("Value above maximum ({})", maximum)));
        }
    }
}

fn check_array(
    items: &[Value],
    schema: &Value,
    path: &str,
    patterns: &Patterns,
    issues: &mut Vec<Issue>,
) {
    if let Some(min_items) = schema.get("minItems").and_then(|m| m.as_u64()) {
        if (items.len() as u64) < min_items {
            issues.push(Issue::new(
                path,
                format!("Array too short (minimum {} items)", min_items),
            ));
        }
    }

    if let Some(max_items) = schema.get("maxItems").and_then(|m| m.as_u64()) {
        if (items.len() as u64) > max_items {
            issues.push(Issue::new(
                path,
                format!("Array too long (maximum {} items)", max_items),
            ));
        }
    }

    if let Some(items_schema) = schema.get("items") {
        for (i, item) in items.iter().enumerate() {
            check_against(item, items_schema, &format!("{}[{}]", path, i), patterns, issues);
        }
    }
}

fn check_object(
    data: &Value,
    schema: &Value,
    path: &str,
    patterns: &Patterns,
    issues: &mut Vec<Issue>,
) {
    let obj = match data.as_object() {
        Some(o) => o,
        None => return,
    };

    if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
        for name in required.iter().filter_map(|v| v.as_str()) {
            if !obj.contains_key(name) {
                issues.push(Issue::new(
                    join(path, name),
                    format!("Missing required property: {}", name),
                ));
            }
        }
    }

    if let Some(properties) = schema.get("properties").and_then(|p| p.as_object()) {
        for (name, prop_schema) in properties {
            if let Some(prop_value) = obj.get(name) {
                check_against(prop_value, prop_schema, &join(path, name), patterns, issues);
            }
        }
    }
}
