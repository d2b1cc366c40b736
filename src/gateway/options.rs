use crate::contract::Validator;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Per-call knobs.
pub struct CallOptions<T = Value> {
    /// Additional attempts after the first; only transient failures use them
    pub retry: u32,
    /// Per-attempt deadline; `None` uses the gateway default
    pub timeout: Option<Duration>,
    /// Whether a terminal failure reaches the audit sink and the presenter
    pub show_error: bool,
    /// Response validator; `None` falls back to the registered contract, if any
    pub validate: Option<Arc<dyn Validator<T>>>,
}

impl<T> CallOptions<T> {
    pub fn new() -> Self {
        Self {
            retry: 0,
            timeout: None,
            show_error: true,
            validate: None,
        }
    }

    pub fn retry(mut self, retry: u32) -> Self {
        self.retry = retry;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout_ms(self, ms: u64) -> Self {
        self.timeout(Duration::from_millis(ms))
    }

    pub fn show_error(mut self, show: bool) -> Self {
        self.show_error = show;
        self
    }

    pub fn validate(mut self, validator: impl Validator<T> + 'static) -> Self {
        self.validate = Some(Arc::new(validator));
        self
    }

    pub fn validate_with(mut self, validator: Arc<dyn Validator<T>>) -> Self {
        self.validate = Some(validator);
        self
    }
}

impl<T> Default for CallOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for CallOptions<T> {
    fn clone(&self) -> Self {
        Self {
            retry: self.retry,
            timeout: self.timeout,
            show_error: self.show_error,
            validate: self.validate.clone(),
        }
    }
}

impl<T> fmt::Debug for CallOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallOptions")
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .field("show_error", &self.show_error)
            .field("validate", &self.validate.is_some())
            .finish()
    }
}

/// One invocation: command name, named arguments and options.
#[derive(Debug, Clone)]
pub struct CallRequest<T = Value> {
    pub command: String,
    pub params: Value,
    pub options: CallOptions<T>,
}

impl<T> CallRequest<T> {
    pub fn new(command: impl Into<String>, params: Value) -> Self {
        Self {
            command: command.into(),
            params,
            options: CallOptions::new(),
        }
    }

    pub fn with_options(mut self, options: CallOptions<T>) -> Self {
        self.options = options;
        self
    }
}
