//! Per-attempt resilience primitives used by the gateway.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`timeout`] | Deadline race around one backend attempt |
//! | [`retry`] | Retryable-kind classification and backoff |
//!
//! ```rust
//! use callgate::resilience::retry::{Decision, RetryPolicy};
//! use callgate::CanonicalError;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::new(1, Duration::from_millis(100));
//! let err = CanonicalError::new("NetworkError", "connection reset");
//! assert_eq!(
//!     policy.decide(&err, 0),
//!     Decision::Retry { delay: Duration::from_millis(100) }
//! );
//! assert_eq!(policy.decide(&err, 1), Decision::Fail);
//! ```

pub mod retry;
pub mod timeout;

pub use retry::{Backoff, Decision, RetryPolicy};
pub use timeout::{AbandonPolicy, TimeoutGuard};
