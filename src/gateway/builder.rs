use crate::config::GatewayConfig;
use crate::contract::ContractRegistry;
use crate::present::{Clipboard, Presenter, TracingPresenter};
use crate::telemetry::{
    AuditSink, Clock, CommandAuditSink, SystemClock, TelemetryReporter, TelemetryState,
};
use crate::Result;
use std::sync::Arc;
use tracing::info;

use super::backend::Backend;
use super::core::CallGateway;

/// Builder for [`CallGateway`].
///
/// Unset collaborators default to: audit reports sent to the backend's audit command,
/// presentation through `tracing`, no clipboard, a fresh telemetry state on the system
/// clock, and no contracts beyond those found in `contract_dir`.
pub struct GatewayBuilder {
    backend: Arc<dyn Backend>,
    config: GatewayConfig,
    contracts: Option<ContractRegistry>,
    audit_sink: Option<Arc<dyn AuditSink>>,
    presenter: Option<Arc<dyn Presenter>>,
    clipboard: Option<Arc<dyn Clipboard>>,
    telemetry_state: Option<Arc<TelemetryState>>,
    clock: Option<Arc<dyn Clock>>,
}

impl GatewayBuilder {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            config: GatewayConfig::default(),
            contracts: None,
            audit_sink: None,
            presenter: None,
            clipboard: None,
            telemetry_state: None,
            clock: None,
        }
    }

    pub fn with_config(mut self, config: GatewayConfig) -> Self {
        self.config = config;
        self
    }

    /// Applies `CALLGATE_*` environment overrides to the current config.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        self.config = self.config.apply_env()?;
        Ok(self)
    }

    /// Contracts registered in code. Files from `contract_dir` are added on build.
    pub fn with_contracts(mut self, contracts: ContractRegistry) -> Self {
        self.contracts = Some(contracts);
        self
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit_sink = Some(sink);
        self
    }

    pub fn with_presenter(mut self, presenter: Arc<dyn Presenter>) -> Self {
        self.presenter = Some(presenter);
        self
    }

    pub fn with_clipboard(mut self, clipboard: Arc<dyn Clipboard>) -> Self {
        self.clipboard = Some(clipboard);
        self
    }

    /// Shares an existing telemetry state, e.g. across gateways of one session.
    pub fn with_telemetry_state(mut self, state: Arc<TelemetryState>) -> Self {
        self.telemetry_state = Some(state);
        self
    }

    /// Clock for a telemetry state created by the builder.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<CallGateway> {
        self.config.validate()?;

        let mut registry = self.contracts.unwrap_or_default();
        if let Some(dir) = &self.config.contract_dir {
            let mut builder = ContractRegistry::builder().load_dir(dir)?;
            for command in registry.commands() {
                if let Some(descriptor) = registry.get(command) {
                    builder = builder.register((*descriptor).clone())?;
                }
            }
            registry = builder.build();
        }

        let state = self.telemetry_state.unwrap_or_else(|| {
            let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
            Arc::new(TelemetryState::with_clock(
                self.config.telemetry.clone(),
                clock,
            ))
        });
        let sink = self.audit_sink.unwrap_or_else(|| {
            Arc::new(CommandAuditSink::new(
                self.backend.clone(),
                self.config.audit_command.clone(),
            ))
        });
        let presenter = self
            .presenter
            .unwrap_or_else(|| Arc::new(TracingPresenter));

        info!(
            contracts = registry.len(),
            default_timeout_ms = self.config.default_timeout_ms,
            abandon_policy = ?self.config.abandon_policy,
            "call gateway ready"
        );

        Ok(CallGateway {
            backend: self.backend,
            contracts: Arc::new(registry),
            reporter: TelemetryReporter::new(sink, state),
            presenter,
            clipboard: self.clipboard,
            config: self.config,
        })
    }
}
