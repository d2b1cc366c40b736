//! Typed response validators.
//!
//! A [`Validator<T>`] turns an untyped, normalized response into the caller's type or
//! rejects it with a [`ContractViolation`]. The gateway maps any rejection to
//! `IPC_SCHEMA_MISMATCH`.

use super::descriptor::ContractDescriptor;
use super::error::{ContractViolation, Issue};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

/// Maps an untyped response to `T`, or rejects it.
pub trait Validator<T>: Send + Sync {
    fn validate(&self, value: Value) -> Result<T, ContractViolation>;
}

impl<T, F> Validator<T> for F
where
    F: Fn(Value) -> Result<T, ContractViolation> + Send + Sync,
{
    fn validate(&self, value: Value) -> Result<T, ContractViolation> {
        self(value)
    }
}

/// Deserializes `value` into `T`, reporting serde's complaint as a root issue.
pub fn deserialize_as<T: DeserializeOwned>(value: Value) -> Result<T, ContractViolation> {
    serde_json::from_value(value).map_err(|e| ContractViolation::single(Issue::root(e.to_string())))
}

/// Checks a [`ContractDescriptor`] first, then deserializes into `T`.
///
/// With `T = serde_json::Value` the response comes back exactly as received,
/// undeclared fields included.
pub struct ContractValidator<T> {
    descriptor: Arc<ContractDescriptor>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ContractValidator<T> {
    pub fn new(descriptor: Arc<ContractDescriptor>) -> Self {
        Self {
            descriptor,
            _marker: PhantomData,
        }
    }

    pub fn descriptor(&self) -> &ContractDescriptor {
        &self.descriptor
    }
}

impl<T> Clone for ContractValidator<T> {
    fn clone(&self) -> Self {
        Self::new(self.descriptor.clone())
    }
}

impl<T: DeserializeOwned> Validator<T> for ContractValidator<T> {
    fn validate(&self, value: Value) -> Result<T, ContractViolation> {
        self.descriptor.check(&value)?;
        deserialize_as(value)
    }
}

/// Accepts anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl Validator<Value> for Passthrough {
    fn validate(&self, value: Value) -> Result<Value, ContractViolation> {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct ConfigEntry {
        key: String,
        value: i64,
    }

    fn entry_contract() -> Arc<ContractDescriptor> {
        Arc::new(ContractDescriptor::new(
            "get_config",
            json!({
                "type": "object",
                "properties": {"key": {"type": "string"}, "value": {"type": "integer"}},
                "required": ["key", "value"]
            }),
        ))
    }

    #[test]
    fn test_contract_validator_typed() {
        let validator: ContractValidator<ConfigEntry> = ContractValidator::new(entry_contract());
        let entry = validator
            .validate(json!({"key": "x", "value": 4, "extra": "ignored"}))
            .unwrap();
        assert_eq!(
            entry,
            ConfigEntry {
                key: "x".into(),
                value: 4
            }
        );
    }

    #[test]
    fn test_contract_validator_reports_descriptor_issues_first() {
        let validator: ContractValidator<ConfigEntry> = ContractValidator::new(entry_contract());
        let violation = validator.validate(json!({"key": "x"})).unwrap_err();
        assert_eq!(violation.issues[0].path, "value");
    }

    #[test]
    fn test_contract_validator_value_keeps_extras() {
        let validator: ContractValidator<Value> = ContractValidator::new(entry_contract());
        let raw = json!({"key": "x", "value": 4, "extra": [true]});
        assert_eq!(validator.validate(raw.clone()).unwrap(), raw);
    }

    #[test]
    fn test_closure_validator() {
        let positive = |v: Value| -> Result<u64, ContractViolation> {
            v.as_u64()
                .filter(|n| *n > 0)
                .ok_or_else(|| ContractViolation::single(Issue::root("expected a positive count")))
        };
        assert_eq!(positive.validate(json!(3)).unwrap(), 3);
        assert!(positive.validate(json!(0)).is_err());
    }

    #[test]
    fn test_deserialize_as_failure_is_root_issue() {
        let violation = deserialize_as::<ConfigEntry>(json!("nope")).unwrap_err();
        assert_eq!(violation.issues.len(), 1);
        assert!(violation.issues[0].path.is_empty());
    }
}
