//! Retry and deadline behavior of the call gateway against a scripted backend.

mod common;

use callgate::{CallOptions, ContractDescriptor, ContractRegistry, ErrorKind};
use common::{harness, network_error, ScriptedBackend, Step};
use serde_json::{json, Value};
use std::time::Duration;

fn get_config_contract() -> ContractRegistry {
    ContractRegistry::builder()
        .register(ContractDescriptor::new(
            "get_config",
            json!({"type": "object", "required": ["key", "value"]}),
        ))
        .unwrap()
        .register(
            ContractDescriptor::new("set_config", json!({"type": "object"})).non_idempotent(),
        )
        .unwrap()
        .build()
}

#[tokio::test(start_paused = true)]
async fn test_timeout_uses_every_attempt() {
    let backend = ScriptedBackend::new([Step::ok(json!({})).after(Duration::from_millis(200))]);
    let h = harness(backend, ContractRegistry::default());

    let (result, stats) = h
        .gateway
        .call_with_stats::<Value>("slow", json!({}), CallOptions::new().retry(2))
        .await;

    let err = result.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert_eq!(err.message, "Command 'slow' timed out after 50ms");
    assert_eq!(stats.attempts, 3);
    assert_eq!(stats.retry_count(), 2);
    assert_eq!(h.backend.invocations(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_network_error_then_success() {
    let backend = ScriptedBackend::new([
        Step::err(network_error()),
        Step::ok(json!({"key": "x", "value": 3})),
    ]);
    let h = harness(backend, get_config_contract());

    let (result, stats) = h
        .gateway
        .call_with_stats::<Value>(
            "get_config",
            json!({"scope_id": "global", "key": "x"}),
            CallOptions::new().retry(1),
        )
        .await;

    assert_eq!(result.unwrap(), json!({"key": "x", "value": 3}));
    assert_eq!(stats.attempts, 2);
    assert!(stats.succeeded());
    assert!(h.sink.is_empty());
    assert!(h.presenter.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_default_is_a_single_attempt() {
    let backend = ScriptedBackend::new([Step::err(network_error()), Step::ok(json!(1))]);
    let h = harness(backend, ContractRegistry::default());

    let err = h
        .gateway
        .call::<Value>("ping", json!({}), CallOptions::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NetworkError);
    assert_eq!(h.backend.invocations(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_schema_mismatch_is_not_retried() {
    let backend = ScriptedBackend::new([Step::ok(json!({"value": 3}))]);
    let h = harness(backend, get_config_contract());

    let (result, stats) = h
        .gateway
        .call_with_stats::<Value>("get_config", json!({}), CallOptions::new().retry(3))
        .await;

    assert_eq!(result.unwrap_err().code, "IPC_SCHEMA_MISMATCH");
    assert_eq!(stats.attempts, 1);
    assert_eq!(h.backend.invocations(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_backend_declared_error_is_not_retried() {
    let backend = ScriptedBackend::new([Step::err(json!({
        "code": "SCOPE_NOT_FOUND",
        "message": "no such scope",
        "details": {"scope_id": "nope"}
    }))]);
    let h = harness(backend, ContractRegistry::default());

    let err = h
        .gateway
        .call::<Value>("get_config", json!({"scope_id": "nope"}), CallOptions::new().retry(3))
        .await
        .unwrap_err();

    assert_eq!(err.code, "SCOPE_NOT_FOUND");
    assert_eq!(err.kind(), ErrorKind::BackendDeclared);
    assert_eq!(err.details, Some(json!({"scope_id": "nope"})));
    assert_eq!(h.backend.invocations(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_linear_backoff_between_attempts() {
    let backend = ScriptedBackend::new([
        Step::err(network_error()),
        Step::err(network_error()),
        Step::ok(json!({"status": "done"})),
    ]);
    let h = harness(backend, ContractRegistry::default());

    let start = tokio::time::Instant::now();
    let value: Value = h
        .gateway
        .call("flaky", json!({}), CallOptions::new().retry(2))
        .await
        .unwrap();

    assert_eq!(value["status"], "done");
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(750), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(800), "elapsed {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn test_slow_get_config_detaches_abandoned_attempts() {
    let backend = ScriptedBackend::new([
        Step::ok(json!({"key": "x", "value": 3})).after(Duration::from_millis(200))
    ]);
    let h = harness(backend, get_config_contract());

    let start = tokio::time::Instant::now();
    let err = h
        .gateway
        .call::<Value>(
            "get_config",
            json!({"scope_id": "global", "key": "x"}),
            CallOptions::new().timeout_ms(50).retry(1),
        )
        .await
        .unwrap_err();

    // 50 ms deadline, 250 ms backoff, 50 ms deadline
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(350), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(400), "elapsed {:?}", elapsed);
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert_eq!(h.backend.invocations(), 2);
    assert_eq!(h.backend.completions(), 1);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(h.backend.completions(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_non_idempotent_command_is_cancelled() {
    let backend =
        ScriptedBackend::new([Step::ok(json!({"ok": true})).after(Duration::from_millis(200))]);
    let h = harness(backend, get_config_contract());

    let err = h
        .gateway
        .call::<Value>("set_config", json!({"key": "x", "value": 4}), CallOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(h.backend.invocations(), 1);
    assert_eq!(h.backend.completions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_per_call_timeout_overrides_default() {
    let backend = ScriptedBackend::new([Step::ok(json!(7)).after(Duration::from_millis(200))]);
    let h = harness(backend, ContractRegistry::default());

    let value: i64 = h
        .gateway
        .call(
            "slow_but_allowed",
            json!({}),
            CallOptions::new().timeout(Duration::from_millis(500)),
        )
        .await
        .unwrap();
    assert_eq!(value, 7);
}

#[tokio::test(start_paused = true)]
async fn test_execute_prebuilt_request() {
    let backend = ScriptedBackend::new([Step::err(network_error()), Step::ok(json!([1, 2]))]);
    let h = harness(backend, ContractRegistry::default());

    let request = callgate::CallRequest::<Vec<u8>>::new("list", json!({}))
        .with_options(CallOptions::new().retry(1));
    assert_eq!(h.gateway.execute(request).await.unwrap(), vec![1, 2]);
}
