//! Deadline race for a single backend attempt.

use crate::error::CanonicalError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// What happens to the backend call once its deadline has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbandonPolicy {
    /// Leave the call running in the background and discard its result.
    #[default]
    Detach,
    /// Abort the call at its next suspension point.
    Cancel,
}

/// Races an attempt against a deadline; whichever settles first decides the outcome.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutGuard {
    timeout: Duration,
    policy: AbandonPolicy,
}

impl TimeoutGuard {
    pub fn new(timeout: Duration, policy: AbandonPolicy) -> Self {
        Self { timeout, policy }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn policy(&self) -> AbandonPolicy {
        self.policy
    }

    /// Runs `attempt` on its own task and waits at most `timeout` for it.
    ///
    /// A zero timeout expires immediately. When the deadline wins, the task is
    /// detached or aborted according to the policy and `Timeout` is returned.
    pub async fn run<T, F>(&self, command: &str, attempt: F) -> Result<T, CanonicalError>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, CanonicalError>> + Send + 'static,
    {
        let mut handle = tokio::spawn(attempt);

        tokio::select! {
            biased;
            joined = &mut handle => match joined {
                Ok(outcome) => outcome,
                Err(e) => Err(CanonicalError::unknown(format!(
                    "Backend task for '{}' failed: {}",
                    command, e
                ))),
            },
            _ = tokio::time::sleep(self.timeout) => {
                match self.policy {
                    AbandonPolicy::Detach => {
                        debug!(command, timeout_ms = self.timeout.as_millis() as u64, "deadline passed, backend call detached");
                    }
                    AbandonPolicy::Cancel => {
                        handle.abort();
                        debug!(command, timeout_ms = self.timeout.as_millis() as u64, "deadline passed, backend call aborted");
                    }
                }
                Err(CanonicalError::timeout(command, self.timeout))
            }
        }
    }
}
