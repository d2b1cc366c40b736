//! The call gateway: contract-checked, retried, classified backend calls.
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use callgate::gateway::{Backend, CallGateway, CallOptions};
//! use serde_json::{json, Value};
//! use std::sync::Arc;
//!
//! struct Bridge;
//!
//! #[async_trait]
//! impl Backend for Bridge {
//!     async fn invoke(&self, _command: &str, _args: Value) -> Result<Value, Value> {
//!         Ok(json!(r#"{"key": "x", "value": 1}"#))
//!     }
//! }
//!
//! # async fn run() -> callgate::Result<()> {
//! let gateway = CallGateway::builder(Arc::new(Bridge)).build()?;
//! let entry: Value = gateway
//!     .call(
//!         "get_config",
//!         json!({"scope_id": "global", "key": "x"}),
//!         CallOptions::new().retry(1).timeout_ms(5_000),
//!     )
//!     .await?;
//! # let _ = entry;
//! # Ok(())
//! # }
//! ```

mod backend;
mod builder;
mod core;
mod options;
mod stats;

pub use backend::Backend;
pub use builder::GatewayBuilder;
pub use self::core::CallGateway;
pub use options::{CallOptions, CallRequest};
pub use stats::CallStats;
