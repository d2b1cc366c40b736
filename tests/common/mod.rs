//! Shared fixtures: a scripted in-process backend and a gateway wired to in-memory
//! collaborators.

#![allow(dead_code)]

use async_trait::async_trait;
use callgate::present::InMemoryPresenter;
use callgate::telemetry::{InMemoryAuditSink, ManualClock};
use callgate::{Backend, CallGateway, ContractRegistry, GatewayConfig};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted backend reply.
#[derive(Debug, Clone)]
pub struct Step {
    pub delay: Duration,
    pub result: Result<Value, Value>,
}

impl Step {
    pub fn ok(value: Value) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(value),
        }
    }

    pub fn err(thrown: Value) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Err(thrown),
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Replies with scripted steps in order; the last step repeats once the script runs out.
#[derive(Default)]
pub struct ScriptedBackend {
    steps: Mutex<VecDeque<Step>>,
    last: Mutex<Option<Step>>,
    invocations: AtomicUsize,
    completions: AtomicUsize,
    side_calls: Mutex<Vec<(String, Value)>>,
}

pub const AUDIT_COMMAND: &str = "log_frontend_event";

impl ScriptedBackend {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into_iter().collect()),
            ..Self::default()
        })
    }

    /// Backend calls made for real commands, audit traffic excluded.
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    /// Backend calls that ran to the end of their delay.
    pub fn completions(&self) -> usize {
        self.completions.load(Ordering::SeqCst)
    }

    /// Calls to the audit command, in order.
    pub fn audit_calls(&self) -> Vec<(String, Value)> {
        self.side_calls.lock().unwrap().clone()
    }

    fn next_step(&self) -> Step {
        let mut steps = self.steps.lock().unwrap();
        let mut last = self.last.lock().unwrap();
        if let Some(step) = steps.pop_front() {
            *last = Some(step.clone());
            step
        } else {
            last.clone().expect("backend script is empty")
        }
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn invoke(&self, command: &str, args: Value) -> Result<Value, Value> {
        if command == AUDIT_COMMAND {
            self.side_calls
                .lock()
                .unwrap()
                .push((command.to_string(), args));
            return Ok(Value::Null);
        }
        self.invocations.fetch_add(1, Ordering::SeqCst);
        let step = self.next_step();
        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }
        self.completions.fetch_add(1, Ordering::SeqCst);
        step.result
    }
}

pub struct Harness {
    pub gateway: CallGateway,
    pub backend: Arc<ScriptedBackend>,
    pub sink: Arc<InMemoryAuditSink>,
    pub presenter: Arc<InMemoryPresenter>,
    pub clock: Arc<ManualClock>,
}

pub fn config() -> GatewayConfig {
    GatewayConfig {
        default_timeout_ms: 50,
        ..GatewayConfig::default()
    }
}

pub fn harness(backend: Arc<ScriptedBackend>, contracts: ContractRegistry) -> Harness {
    harness_with(backend, contracts, config())
}

pub fn harness_with(
    backend: Arc<ScriptedBackend>,
    contracts: ContractRegistry,
    config: GatewayConfig,
) -> Harness {
    let sink = Arc::new(InMemoryAuditSink::default());
    let presenter = Arc::new(InMemoryPresenter::new());
    let clock = Arc::new(ManualClock::new());
    let gateway = CallGateway::builder(backend.clone())
        .with_config(config)
        .with_contracts(contracts)
        .with_audit_sink(sink.clone())
        .with_presenter(presenter.clone())
        .with_clock(clock.clone())
        .build()
        .expect("gateway builds");
    Harness {
        gateway,
        backend,
        sink,
        presenter,
        clock,
    }
}

pub fn network_error() -> Value {
    serde_json::json!({"code": "NetworkError", "message": "connection reset by peer"})
}
