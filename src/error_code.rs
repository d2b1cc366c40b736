//! Error taxonomy for gateway calls.
//!
//! Every failed call carries a string `code`. This module maps those codes onto
//! a closed set of kinds and attaches retry semantics to each.
//!
//! | Code                  | Kind            | Retryable | Meaning                                   |
//! |-----------------------|-----------------|-----------|-------------------------------------------|
//! | `Timeout`             | Timeout         | yes       | client-side deadline exceeded             |
//! | `NetworkError`        | NetworkError    | yes       | transport failure reported by the bridge  |
//! | `IPC_SCHEMA_MISMATCH` | SchemaMismatch  | no        | response violates the declared contract   |
//! | `Unknown`             | Unknown         | no        | unrecognized thrown shape                 |
//! | anything else         | BackendDeclared | no        | business error surfaced from the backend  |
//!
//! ## Example
//!
//! ```rust
//! use callgate::error_code::ErrorKind;
//!
//! let kind = ErrorKind::from_code("NetworkError");
//! assert!(kind.retryable());
//! assert!(!ErrorKind::from_code("SCOPE_NOT_FOUND").retryable());
//! ```

use std::fmt;

/// Classified error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Deadline exceeded before the backend settled
    Timeout,
    /// Transport-level failure reported by the bridge
    NetworkError,
    /// Response violates the command's contract (client/backend drift)
    SchemaMismatch,
    /// Business error declared by the backend, surfaced verbatim
    BackendDeclared,
    /// Unrecognized thrown shape, normalized best-effort
    Unknown,
}

impl ErrorKind {
    /// Canonical code string for kinds with a fixed code.
    ///
    /// `BackendDeclared` has no fixed code; its code is whatever the backend sent.
    #[inline]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Timeout => "Timeout",
            Self::NetworkError => "NetworkError",
            Self::SchemaMismatch => "IPC_SCHEMA_MISMATCH",
            Self::BackendDeclared => "BackendDeclared",
            Self::Unknown => "Unknown",
        }
    }

    /// Only transient kinds are retried.
    #[inline]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::NetworkError)
    }

    /// Severity used for telemetry: transient faults are warnings, the rest errors.
    #[inline]
    pub fn severity(&self) -> &'static str {
        match self {
            Self::Timeout | Self::NetworkError => "warn",
            _ => "error",
        }
    }

    /// Classifies a raw code string. Matching is exact.
    pub fn from_code(code: &str) -> Self {
        match code {
            "Timeout" => Self::Timeout,
            "NetworkError" => Self::NetworkError,
            "IPC_SCHEMA_MISMATCH" => Self::SchemaMismatch,
            "Unknown" => Self::Unknown,
            _ => Self::BackendDeclared,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_set_is_closed() {
        assert!(ErrorKind::Timeout.retryable());
        assert!(ErrorKind::NetworkError.retryable());
        assert!(!ErrorKind::SchemaMismatch.retryable());
        assert!(!ErrorKind::BackendDeclared.retryable());
        assert!(!ErrorKind::Unknown.retryable());
    }

    #[test]
    fn test_from_code_is_case_sensitive() {
        assert_eq!(ErrorKind::from_code("Timeout"), ErrorKind::Timeout);
        assert_eq!(ErrorKind::from_code("timeout"), ErrorKind::BackendDeclared);
        assert_eq!(
            ErrorKind::from_code("IPC_SCHEMA_MISMATCH"),
            ErrorKind::SchemaMismatch
        );
    }

    #[test]
    fn test_severity() {
        assert_eq!(ErrorKind::Timeout.severity(), "warn");
        assert_eq!(ErrorKind::BackendDeclared.severity(), "error");
    }
}
