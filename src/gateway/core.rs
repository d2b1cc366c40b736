use crate::config::GatewayConfig;
use crate::contract::{deserialize_as, ContractRegistry, ContractValidator, Validator};
use crate::error::CanonicalError;
use crate::normalize::{normalize_error, normalize_response};
use crate::present::{Clipboard, CopyAction, ErrorView, Presentation, Presenter};
use crate::resilience::{AbandonPolicy, Decision, RetryPolicy, TimeoutGuard};
use crate::telemetry::{Admission, TelemetryReporter, TelemetryState};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::backend::Backend;
use super::builder::GatewayBuilder;
use super::options::{CallOptions, CallRequest};
use super::stats::CallStats;

/// The single entry point for backend calls.
///
/// Each call runs `timeout → normalize → validate` per attempt, retries transient
/// failures with backoff, and on terminal failure reports to telemetry and the
/// presenter (when `show_error` is set) before returning the error.
pub struct CallGateway {
    pub(crate) backend: Arc<dyn Backend>,
    pub(crate) contracts: Arc<ContractRegistry>,
    pub(crate) reporter: TelemetryReporter,
    pub(crate) presenter: Arc<dyn Presenter>,
    pub(crate) clipboard: Option<Arc<dyn Clipboard>>,
    pub(crate) config: GatewayConfig,
}

impl CallGateway {
    pub fn builder(backend: Arc<dyn Backend>) -> GatewayBuilder {
        GatewayBuilder::new(backend)
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn contracts(&self) -> &ContractRegistry {
        &self.contracts
    }

    pub fn telemetry_state(&self) -> &Arc<TelemetryState> {
        self.reporter.state()
    }

    /// Invokes `command` with `params`.
    pub async fn call<T>(
        &self,
        command: &str,
        params: Value,
        options: CallOptions<T>,
    ) -> Result<T, CanonicalError>
    where
        T: DeserializeOwned,
    {
        self.call_with_stats(command, params, options).await.0
    }

    /// Same as [`call`](Self::call), for a prebuilt request.
    pub async fn execute<T>(&self, request: CallRequest<T>) -> Result<T, CanonicalError>
    where
        T: DeserializeOwned,
    {
        self.call(&request.command, request.params, request.options)
            .await
    }

    /// Invokes `command` and also returns what happened along the way.
    pub async fn call_with_stats<T>(
        &self,
        command: &str,
        params: Value,
        options: CallOptions<T>,
    ) -> (Result<T, CanonicalError>, CallStats)
    where
        T: DeserializeOwned,
    {
        let call_id = Uuid::new_v4().to_string();
        let start = Instant::now();
        let timeout = options
            .timeout
            .unwrap_or_else(|| self.config.default_timeout());
        let guard = TimeoutGuard::new(timeout, self.abandon_policy_for(command));
        let policy = RetryPolicy::new(options.retry, self.config.retry_base_delay())
            .with_backoff(self.config.backoff);

        let mut attempt: u32 = 0;
        let outcome = loop {
            debug!(
                call_id = call_id.as_str(),
                command,
                attempt,
                max_attempts = policy.max_attempts(),
                "attempt started"
            );
            match self
                .attempt(command, &params, &guard, options.validate.as_ref())
                .await
            {
                Ok(value) => break Ok(value),
                Err(err) => match policy.decide(&err, attempt) {
                    Decision::Retry { delay } => {
                        debug!(
                            call_id = call_id.as_str(),
                            command,
                            attempt,
                            code = err.code.as_str(),
                            delay_ms = delay.as_millis() as u64,
                            "transient failure, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    Decision::Fail => break Err(err),
                },
            }
        };

        let attempts = attempt + 1;
        let mut stats = CallStats {
            call_id,
            command: command.to_string(),
            attempts,
            duration_ms: start.elapsed().as_millis(),
            error_code: None,
            reported: None,
        };

        match outcome {
            Ok(value) => {
                info!(
                    call_id = stats.call_id.as_str(),
                    command,
                    attempts,
                    duration_ms = stats.duration_ms as u64,
                    "call succeeded"
                );
                (Ok(value), stats)
            }
            Err(err) => {
                warn!(
                    call_id = stats.call_id.as_str(),
                    command,
                    attempts,
                    code = err.code.as_str(),
                    duration_ms = stats.duration_ms as u64,
                    "call failed: {}",
                    err.message
                );
                stats.error_code = Some(err.code.clone());
                if options.show_error {
                    stats.reported = Some(self.surface(command, &err, attempts).await);
                }
                (Err(err), stats)
            }
        }
    }

    // One pass of timeout guard, response normalizer and validator.
    async fn attempt<T>(
        &self,
        command: &str,
        params: &Value,
        guard: &TimeoutGuard,
        validator: Option<&Arc<dyn Validator<T>>>,
    ) -> Result<T, CanonicalError>
    where
        T: DeserializeOwned,
    {
        let backend = self.backend.clone();
        let owned_command = command.to_string();
        let args = params.clone();
        let raw = guard
            .run(command, async move {
                backend
                    .invoke(&owned_command, args)
                    .await
                    .map_err(normalize_error)
            })
            .await?;

        let value = normalize_response(raw)?;

        let checked = match validator {
            Some(v) => v.validate(value),
            None => match self.contracts.get(command) {
                Some(descriptor) => ContractValidator::<T>::new(descriptor).validate(value),
                None => deserialize_as(value),
            },
        };
        checked.map_err(|violation| violation.into_canonical(command))
    }

    fn abandon_policy_for(&self, command: &str) -> AbandonPolicy {
        match self.contracts.get(command) {
            Some(descriptor) if !descriptor.idempotent => AbandonPolicy::Cancel,
            _ => self.config.abandon_policy,
        }
    }

    // Audit and presenter are independent; neither can replace the caller's error.
    async fn surface(&self, command: &str, err: &CanonicalError, attempts: u32) -> Admission {
        let admission = self.reporter.report_failure(command, err, attempts).await;
        let presentation = Presentation {
            view: ErrorView::from_error(command, err),
            copy: CopyAction::new(err, self.clipboard.clone()),
        };
        let shown = panic::catch_unwind(AssertUnwindSafe(|| self.presenter.present(presentation)));
        if let Err(payload) = shown {
            debug!(command, panic = panic_message(payload.as_ref()), "presenter panicked");
        }
        admission
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(|s| s.as_str()))
        .unwrap_or("non-string panic payload")
}
