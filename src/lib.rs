//! # callgate
//!
//! A resilient call gateway between a UI process and a native backend process.
//!
//! A single cross-process call is unreliable and loosely typed: it may hang, the
//! response may be JSON text or a structured value, and failures may be thrown as
//! strings or objects of any shape. `callgate` turns it into an operation that is
//! deadline-bounded, retried when the failure is transient, checked against a
//! per-command contract, classified into one canonical error shape, and surfaced on
//! up to three channels: the caller, an audit sink, and the operator.
//!
//! ## Request lifecycle
//!
//! ```text
//! call ─▶ TimeoutGuard(backend) ─▶ normalize_response ─▶ validator ─▶ Ok(T)
//!               │                        │                  │
//!               └──────────── normalize_error ◀─────────────┘
//!                                  │
//!                            RetryPolicy ── retry ─▶ (next attempt)
//!                                  │ fail
//!                  TelemetryReporter + Presenter ─▶ Err(CanonicalError)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use callgate::{Backend, CallGateway, CallOptions, ContractDescriptor, ContractRegistry};
//! use serde::Deserialize;
//! use serde_json::{json, Value};
//! use std::sync::Arc;
//!
//! struct Bridge;
//!
//! #[async_trait]
//! impl Backend for Bridge {
//!     async fn invoke(&self, _command: &str, _args: Value) -> Result<Value, Value> {
//!         Ok(json!({"key": "x", "value": 3}))
//!     }
//! }
//!
//! #[derive(Deserialize)]
//! struct ConfigEntry {
//!     key: String,
//!     value: i64,
//! }
//!
//! #[tokio::main]
//! async fn main() -> callgate::Result<()> {
//!     let contracts = ContractRegistry::builder()
//!         .register(ContractDescriptor::new(
//!             "get_config",
//!             json!({"type": "object", "required": ["key", "value"]}),
//!         ))?
//!         .build();
//!
//!     let gateway = CallGateway::builder(Arc::new(Bridge))
//!         .with_contracts(contracts)
//!         .build()?;
//!
//!     let entry: ConfigEntry = gateway
//!         .call(
//!             "get_config",
//!             json!({"scope_id": "global", "key": "x"}),
//!             CallOptions::new().retry(1),
//!         )
//!         .await?;
//!     println!("{} = {}", entry.key, entry.value);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`gateway`] | Call orchestration, options, backend trait |
//! | [`normalize`] | Response and thrown-value normalization |
//! | [`contract`] | Contract descriptors, validators and registry |
//! | [`resilience`] | Timeout guard and retry policy |
//! | [`telemetry`] | Deduplicated failure reporting |
//! | [`present`] | Operator-facing error presentation |
//! | [`error_code`] | Error taxonomy |
//! | [`config`] | Gateway configuration |

pub mod config;
pub mod contract;
pub mod error_code;
pub mod gateway;
pub mod normalize;
pub mod present;
pub mod resilience;
pub mod telemetry;

pub mod error;

pub use config::GatewayConfig;
pub use contract::{ContractDescriptor, ContractRegistry, ContractViolation, Validator};
pub use error::{CanonicalError, Error, ErrorContext};
pub use error_code::ErrorKind;
pub use gateway::{Backend, CallGateway, CallOptions, CallRequest, CallStats, GatewayBuilder};

/// Result type alias for setup and configuration APIs
pub type Result<T> = std::result::Result<T, Error>;
