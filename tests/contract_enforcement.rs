//! Response normalization and contract checking through the full gateway.

mod common;

use callgate::contract::{ContractViolation, Issue};
use callgate::{CallOptions, ContractDescriptor, ContractRegistry, ErrorKind, GatewayConfig};
use common::{harness, harness_with, ScriptedBackend, Step};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;

#[derive(Debug, Deserialize, PartialEq)]
struct ConfigEntry {
    key: String,
    value: i64,
}

fn contracts() -> ContractRegistry {
    ContractRegistry::builder()
        .register(ContractDescriptor::new(
            "get_config",
            json!({
                "type": "object",
                "required": ["key", "value"],
                "properties": {
                    "key": {"type": "string", "minLength": 1},
                    "value": {"type": "integer"}
                }
            }),
        ))
        .unwrap()
        .build()
}

#[tokio::test]
async fn test_missing_field_reports_issue_path() {
    let backend = ScriptedBackend::new([Step::ok(json!({"key": "x"}))]);
    let h = harness(backend, contracts());

    let err = h
        .gateway
        .call::<ConfigEntry>("get_config", json!({}), CallOptions::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SchemaMismatch);
    let details = err.details.unwrap();
    assert_eq!(details["command"], "get_config");
    assert_eq!(details["issues"][0]["path"], "value");
    assert_eq!(
        details["issues"][0]["message"],
        "Missing required property: value"
    );
}

#[tokio::test]
async fn test_wrong_type_reports_nested_issue() {
    let backend = ScriptedBackend::new([Step::ok(json!({"key": "", "value": "3"}))]);
    let h = harness(backend, contracts());

    let err = h
        .gateway
        .call::<Value>("get_config", json!({}), CallOptions::new())
        .await
        .unwrap_err();

    let issues = err.details.unwrap()["issues"].clone();
    let paths: Vec<&str> = issues
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["path"].as_str().unwrap())
        .collect();
    assert!(paths.contains(&"key"));
    assert!(paths.contains(&"value"));
}

#[tokio::test]
async fn test_undeclared_fields_are_kept() {
    let response = json!({"key": "x", "value": 3, "updated_by": "admin"});
    let backend = ScriptedBackend::new([Step::ok(response.clone())]);
    let h = harness(backend, contracts());

    let value: Value = h
        .gateway
        .call("get_config", json!({}), CallOptions::new())
        .await
        .unwrap();
    assert_eq!(value, response);
}

#[tokio::test]
async fn test_string_and_structured_responses_agree() {
    let structured = json!({"key": "x", "value": 3});
    let text = Value::String(structured.to_string());

    let from_value = harness(ScriptedBackend::new([Step::ok(structured)]), contracts())
        .gateway
        .call::<ConfigEntry>("get_config", json!({}), CallOptions::new())
        .await
        .unwrap();
    let from_text = harness(ScriptedBackend::new([Step::ok(text)]), contracts())
        .gateway
        .call::<ConfigEntry>("get_config", json!({}), CallOptions::new())
        .await
        .unwrap();

    assert_eq!(from_value, from_text);
    assert_eq!(
        from_value,
        ConfigEntry {
            key: "x".into(),
            value: 3
        }
    );
}

#[tokio::test]
async fn test_malformed_text_response_is_unknown() {
    let backend = ScriptedBackend::new([Step::ok(Value::String("{not json".into()))]);
    let h = harness(backend, contracts());

    let err = h
        .gateway
        .call::<Value>("get_config", json!({}), CallOptions::new().retry(2))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Unknown);
    assert_eq!(err.details.unwrap()["raw"], "{not json");
    assert_eq!(h.backend.invocations(), 1);
}

#[tokio::test]
async fn test_thrown_string_is_normalized() {
    let backend = ScriptedBackend::new([Step::err(Value::String("bridge exploded".into()))]);
    let h = harness(backend, ContractRegistry::default());

    let err = h
        .gateway
        .call::<Value>("anything", json!({}), CallOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.code, "Unknown");
    assert_eq!(err.message, "bridge exploded");
}

#[tokio::test]
async fn test_explicit_validator_takes_precedence() {
    let backend = ScriptedBackend::new([Step::ok(json!({"key": "x", "value": 3}))]);
    let h = harness(backend, contracts());

    let options = CallOptions::new().validate(|value: Value| {
        if value["value"].as_i64() == Some(3) {
            Err(ContractViolation::single(Issue::new("value", "3 is reserved")))
        } else {
            Ok(value)
        }
    });
    let err = h
        .gateway
        .call::<Value>("get_config", json!({}), options)
        .await
        .unwrap_err();

    assert_eq!(err.code, "IPC_SCHEMA_MISMATCH");
    assert_eq!(err.details.unwrap()["issues"][0]["message"], "3 is reserved");
}

#[tokio::test]
async fn test_uncontracted_command_deserializes_into_target() {
    let backend = ScriptedBackend::new([Step::ok(json!({"key": "x"}))]);
    let h = harness(backend, ContractRegistry::default());

    let err = h
        .gateway
        .call::<ConfigEntry>("get_config", json!({}), CallOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SchemaMismatch);
    assert_eq!(err.details.unwrap()["issues"][0]["path"], "");
}

#[tokio::test]
async fn test_contracts_loaded_from_directory() {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("contracts");
    let config = GatewayConfig {
        contract_dir: Some(dir),
        ..common::config()
    };
    let backend = ScriptedBackend::new([Step::ok(json!({"value": 1}))]);
    let h = harness_with(backend, ContractRegistry::default(), config);

    assert!(h.gateway.contracts().contains("get_config"));
    assert!(h.gateway.contracts().contains("get_session"));
    assert!(!h.gateway.contracts().get("set_config").unwrap().idempotent);

    let err = h
        .gateway
        .call::<Value>("get_config", json!({}), CallOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.details.unwrap()["issues"][0]["path"], "key");
}

#[tokio::test]
async fn test_code_contract_clashing_with_file_fails_build() {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("contracts");
    let config = GatewayConfig {
        contract_dir: Some(dir),
        ..common::config()
    };
    let result = callgate::CallGateway::builder(ScriptedBackend::new([Step::ok(json!(null))]))
        .with_config(config)
        .with_contracts(contracts())
        .build();
    assert!(matches!(result, Err(callgate::Error::Contract(_))));
}
