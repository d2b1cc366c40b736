use crate::telemetry::Admission;

/// Per-call facts, returned by [`CallGateway::call_with_stats`](super::CallGateway::call_with_stats).
#[derive(Debug, Clone)]
pub struct CallStats {
    /// Client-generated id used in every log line of this call
    pub call_id: String,
    pub command: String,
    /// Attempts started, including the first
    pub attempts: u32,
    pub duration_ms: u128,
    /// Code of the terminal error, if the call failed
    pub error_code: Option<String>,
    /// Telemetry decision for a failed call with `show_error` set
    pub reported: Option<Admission>,
}

impl CallStats {
    pub fn succeeded(&self) -> bool {
        self.error_code.is_none()
    }

    pub fn retry_count(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}
