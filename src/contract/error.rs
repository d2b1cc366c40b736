//! Error types for contract checking and contract loading.

use crate::error::CanonicalError;
use crate::error_code::ErrorKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One violated field, with its location in the response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Path to the offending field (e.g., "entries[2].key"); empty for the root value
    pub path: String,
    pub message: String,
}

impl Issue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }

    /// An issue about the value as a whole.
    pub fn root(message: impl Into<String>) -> Self {
        Self::new("", message)
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// A response that does not satisfy its contract.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("contract violated: {}", .issues.iter().map(|i| i.to_string()).collect::<Vec<_>>().join("; "))]
pub struct ContractViolation {
    pub issues: Vec<Issue>,
}

impl ContractViolation {
    pub fn new(issues: Vec<Issue>) -> Self {
        Self { issues }
    }

    pub fn single(issue: Issue) -> Self {
        Self {
            issues: vec![issue],
        }
    }

    /// Converts into the canonical `IPC_SCHEMA_MISMATCH` error for `command`.
    pub fn into_canonical(self, command: &str) -> CanonicalError {
        CanonicalError::new(
            ErrorKind::SchemaMismatch.code(),
            format!("Response for command '{}' violates its contract", command),
        )
        .with_details(serde_json::json!({
            "command": command,
            "issues": self.issues,
        }))
    }
}

impl From<Vec<Issue>> for ContractViolation {
    fn from(issues: Vec<Issue>) -> Self {
        Self::new(issues)
    }
}

/// Failures while loading or registering contract descriptors.
#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    #[error("Failed to load contracts from {path}: {reason}{}", .hint.as_ref().map(|h| format!("\n Hint: {}", h)).unwrap_or_default())]
    LoadError {
        path: String,
        reason: String,
        hint: Option<String>,
    },

    #[error("Invalid contract descriptor{}: {reason}", .command.as_ref().map(|c| format!(" for '{}'", c)).unwrap_or_default())]
    InvalidDescriptor {
        command: Option<String>,
        reason: String,
    },

    #[error("Contract for '{command}' is registered twice")]
    Duplicate { command: String },

    #[error("Internal contract error: {0}")]
    Internal(String),
}

impl ContractError {
    /// Attach an actionable hint to the error
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        if let ContractError::LoadError {
            hint: ref mut slot, ..
        } = self
        {
            *slot = Some(hint.into());
        }
        self
    }
}
