//! Gateway configuration.
//!
//! Loaded from YAML (or built in code), then adjusted by `CALLGATE_*` environment
//! variables:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `CALLGATE_TIMEOUT_MS` | `default_timeout_ms` |
//! | `CALLGATE_RETRY_BASE_DELAY_MS` | `retry_base_delay_ms` |
//! | `CALLGATE_TELEMETRY_CAP` | `telemetry.session_cap` |
//! | `CALLGATE_DEDUP_WINDOW_MS` | `telemetry.dedup_window_ms` |
//! | `CALLGATE_CONTRACT_DIR` | `contract_dir` |

use crate::resilience::{AbandonPolicy, Backoff};
use crate::telemetry::TelemetryConfig;
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_retry_base_delay_ms() -> u64 {
    250
}

fn default_audit_command() -> String {
    "log_frontend_event".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Per-attempt deadline when a call does not set its own
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default)]
    pub backoff: Backoff,
    #[serde(default)]
    pub abandon_policy: AbandonPolicy,
    /// Backend command that receives audit reports
    #[serde(default = "default_audit_command")]
    pub audit_command: String,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Directory of contract descriptor files loaded at build time
    #[serde(default)]
    pub contract_dir: Option<PathBuf>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: default_timeout_ms(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            backoff: Backoff::default(),
            abandon_policy: AbandonPolicy::default(),
            audit_command: default_audit_command(),
            telemetry: TelemetryConfig::default(),
            contract_dir: None,
        }
    }
}

impl GatewayConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    /// Applies `CALLGATE_*` overrides from the process environment.
    pub fn apply_env(self) -> Result<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary lookup.
    pub fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(ms) = parse_var(&lookup, "CALLGATE_TIMEOUT_MS")? {
            self.default_timeout_ms = ms;
        }
        if let Some(ms) = parse_var(&lookup, "CALLGATE_RETRY_BASE_DELAY_MS")? {
            self.retry_base_delay_ms = ms;
        }
        if let Some(cap) = parse_var(&lookup, "CALLGATE_TELEMETRY_CAP")? {
            self.telemetry.session_cap = cap;
        }
        if let Some(ms) = parse_var(&lookup, "CALLGATE_DEDUP_WINDOW_MS")? {
            self.telemetry.dedup_window_ms = ms;
        }
        if let Some(dir) = lookup("CALLGATE_CONTRACT_DIR").filter(|d| !d.trim().is_empty()) {
            self.contract_dir = Some(PathBuf::from(dir));
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.telemetry.max_fingerprints == 0 {
            return Err(Error::configuration_with_context(
                "fingerprint map needs room for at least one entry",
                ErrorContext::new()
                    .with_field_path("telemetry.max_fingerprints")
                    .with_source("gateway_config"),
            ));
        }
        if (self.telemetry.max_fingerprints as u64) < u64::from(self.telemetry.session_cap) {
            return Err(Error::configuration_with_context(
                "fingerprint map must hold at least session_cap entries",
                ErrorContext::new()
                    .with_field_path("telemetry.max_fingerprints")
                    .with_details(format!(
                        "max_fingerprints {} < session_cap {}",
                        self.telemetry.max_fingerprints, self.telemetry.session_cap
                    ))
                    .with_source("gateway_config"),
            ));
        }
        if self.audit_command.trim().is_empty() {
            return Err(Error::configuration_with_context(
                "audit command name is empty",
                ErrorContext::new()
                    .with_field_path("audit_command")
                    .with_source("gateway_config"),
            ));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            Error::configuration_with_context(
                format!("cannot parse '{}'", raw),
                ErrorContext::new()
                    .with_field_path(key)
                    .with_source("environment"),
            )
        }),
    }
}
