//! Failure telemetry.
//!
//! Terminal call failures are fingerprinted, deduplicated inside a time window, capped
//! per session, and forwarded best-effort to an [`AuditSink`]. Nothing here can fail a
//! call: the sink runs on its own task, bounded by `sink_timeout_ms`, and its errors,
//! panics and overruns are logged at debug level and dropped.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`TelemetryReporter`] | Fingerprints failures and forwards admitted reports |
//! | [`TelemetryState`] | Fingerprint map and session counter, with an injectable [`Clock`] |
//! | [`AuditSink`] | Trait for report destinations |
//! | [`CommandAuditSink`] | Fire-and-forget backend command sink |
//! | [`InMemoryAuditSink`] | In-memory sink for testing |
//! | [`TracingAuditSink`] | Sink that logs through `tracing` |

pub mod sink;
pub mod state;

pub use sink::{
    AuditReport, AuditSink, CommandAuditSink, CompositeAuditSink, InMemoryAuditSink,
    NoopAuditSink, TracingAuditSink,
};
pub use state::{
    Admission, Clock, Fingerprint, ManualClock, SystemClock, TelemetryConfig, TelemetryState,
};

use crate::error::CanonicalError;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

/// Deduplicating front of an [`AuditSink`].
#[derive(Clone)]
pub struct TelemetryReporter {
    state: Arc<TelemetryState>,
    sink: Arc<dyn AuditSink>,
}

impl TelemetryReporter {
    pub fn new(sink: Arc<dyn AuditSink>, state: Arc<TelemetryState>) -> Self {
        Self { state, sink }
    }

    pub fn state(&self) -> &Arc<TelemetryState> {
        &self.state
    }

    /// Reports the terminal failure of `command`, unless deduplicated or capped.
    pub async fn report_failure(
        &self,
        command: &str,
        err: &CanonicalError,
        attempts: u32,
    ) -> Admission {
        let level = err.kind().severity();
        let aux = err
            .details
            .as_ref()
            .map(|d| d.to_string())
            .unwrap_or_default();
        let fingerprint = self.state.fingerprint(level, &err.message, &aux);

        let admission = self.state.admit(fingerprint);
        if admission != Admission::Send {
            debug!(
                command,
                code = err.code.as_str(),
                fingerprint = %fingerprint,
                admission = ?admission,
                "failure report suppressed"
            );
            return admission;
        }

        let report = AuditReport {
            level: level.to_string(),
            message: err.message.clone(),
            payload: json!({
                "command": command,
                "code": err.code,
                "details": err.details,
                "attempts": attempts,
                "fingerprint": fingerprint.short(),
            }),
        };
        let sink = self.sink.clone();
        let limit = self.state.config().sink_timeout();
        let delivery = tokio::spawn(async move { sink.report(report).await });
        match tokio::time::timeout(limit, delivery).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(sink_err))) => {
                debug!(command, sink_error = %sink_err, "audit sink rejected failure report");
            }
            Ok(Err(join_err)) => {
                debug!(command, error = %join_err, "audit sink panicked");
            }
            Err(_) => {
                debug!(
                    command,
                    timeout_ms = limit.as_millis() as u64,
                    "audit sink still busy, report detached"
                );
            }
        }
        admission
    }
}
