//! Audit sinks: where admitted failure reports go.

use crate::error::CanonicalError;
use crate::gateway::Backend;
use crate::normalize::normalize_error;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, RwLock};
use tracing::{debug, error, warn};

/// One report as sent to the audit channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub level: String,
    pub message: String,
    pub payload: Value,
}

/// Destination for failure reports. Failures are swallowed by the caller.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn report(&self, report: AuditReport) -> Result<(), CanonicalError>;
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditSink;

#[async_trait]
impl AuditSink for NoopAuditSink {
    async fn report(&self, _report: AuditReport) -> Result<(), CanonicalError> {
        Ok(())
    }
}

/// In-memory sink for testing.
pub struct InMemoryAuditSink {
    reports: Arc<RwLock<Vec<AuditReport>>>,
    max_reports: usize,
}

impl InMemoryAuditSink {
    pub fn new(max: usize) -> Self {
        Self {
            reports: Arc::new(RwLock::new(Vec::new())),
            max_reports: max,
        }
    }
    pub fn reports(&self) -> Vec<AuditReport> {
        self.reports.read().map(|r| r.clone()).unwrap_or_default()
    }
    pub fn clear(&self) {
        if let Ok(mut r) = self.reports.write() {
            r.clear();
        }
    }
    pub fn len(&self) -> usize {
        self.reports.read().map(|r| r.len()).unwrap_or(0)
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryAuditSink {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn report(&self, report: AuditReport) -> Result<(), CanonicalError> {
        let mut reports = self
            .reports
            .write()
            .map_err(|_| CanonicalError::unknown("audit buffer poisoned"))?;
        reports.push(report);
        if reports.len() > self.max_reports {
            reports.remove(0);
        }
        Ok(())
    }
}

/// Writes reports to the `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn report(&self, report: AuditReport) -> Result<(), CanonicalError> {
        let payload = report.payload.to_string();
        if report.level == "warn" {
            warn!(target: "callgate::audit", payload = payload.as_str(), "{}", report.message);
        } else {
            error!(target: "callgate::audit", payload = payload.as_str(), "{}", report.message);
        }
        Ok(())
    }
}

/// Forwards reports to a dedicated backend command taking `{level, message, payload}`.
///
/// The backend call is spawned and never awaited, so `report` returns immediately.
pub struct CommandAuditSink {
    backend: Arc<dyn Backend>,
    command: String,
}

impl CommandAuditSink {
    pub fn new(backend: Arc<dyn Backend>, command: impl Into<String>) -> Self {
        Self {
            backend,
            command: command.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

#[async_trait]
impl AuditSink for CommandAuditSink {
    async fn report(&self, report: AuditReport) -> Result<(), CanonicalError> {
        let args = serde_json::to_value(&report)
            .map_err(|e| CanonicalError::unknown(format!("unserializable audit report: {}", e)))?;
        let backend = self.backend.clone();
        let command = self.command.clone();
        tokio::spawn(async move {
            if let Err(thrown) = backend.invoke(&command, args).await {
                let err = normalize_error(thrown);
                debug!(command = command.as_str(), code = err.code.as_str(), "audit command failed");
            }
        });
        Ok(())
    }
}

/// Fans a report out to several sinks; individual failures are ignored.
#[derive(Default)]
pub struct CompositeAuditSink {
    sinks: Vec<Arc<dyn AuditSink>>,
}

impl CompositeAuditSink {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn add_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

#[async_trait]
impl AuditSink for CompositeAuditSink {
    async fn report(&self, report: AuditReport) -> Result<(), CanonicalError> {
        for s in &self.sinks {
            let _ = s.report(report.clone()).await;
        }
        Ok(())
    }
}
