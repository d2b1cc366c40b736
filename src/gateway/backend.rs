use async_trait::async_trait;
use serde_json::Value;

/// The native side of the bridge: an opaque asynchronous command executor.
///
/// `Ok` carries the raw wire response, either JSON text or an already structured
/// value. `Err` carries whatever the backend threw, a string or an object.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn invoke(&self, command: &str, args: Value) -> Result<Value, Value>;
}
