//! Error types for batch-export
//!
//! This module provides the error taxonomy for the library:
//! - [`FetchError`] — a single item's remote fetch failed (classified
//!   retryable/permanent for the request gateway)
//! - [`ExportError`] — artifact packaging failed (spreadsheet or archive)
//! - [`Error`] — the crate-level error type tying everything together
//!
//! Cancellation is deliberately *not* represented here. A cancelled task is a
//! normal terminal outcome, surfaced as
//! [`TaskStatus::Cancelled`](crate::types::TaskStatus) and
//! [`GatewayError::Cancelled`](crate::retry::GatewayError).

use thiserror::Error;

/// Result type alias for batch-export operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for batch-export
///
/// This is the primary error type used throughout the library. Each variant
/// includes contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// A remote fetch failed permanently (after gateway retries exhausted)
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Caller misuse of the task state machine
    ///
    /// Raised when an operation is attempted in a state that forbids it, e.g.
    /// changing `total` after data collection began, or requesting file infos
    /// from a task that has not finished. Always fatal to the call.
    #[error("invalid state for {operation}: {reason}")]
    InvalidState {
        /// The operation that was attempted (e.g. "set_total", "file_infos")
        operation: &'static str,
        /// Why the current state forbids it
        reason: String,
    },

    /// A zip-typed file descriptor was nested inside another zip descriptor
    #[error("nested archive not allowed: {filename}")]
    NestedArchive {
        /// The filename of the offending inner descriptor
        filename: String,
    },

    /// Artifact packaging failed
    #[error("export error: {0}")]
    Export(#[from] ExportError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure of a single item's remote fetch
///
/// The remote API client itself is opaque to this crate; adapters translate
/// whatever their client returns into one of these classes so the request
/// gateway can decide whether to retry.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request timed out
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The remote service signalled rate limiting
    #[error("rate limited by remote service")]
    RateLimited,

    /// The remote service returned a non-success status code
    #[error("remote returned status {code}")]
    Status {
        /// The HTTP status code
        code: u16,
    },

    /// The requested item does not exist on the platform
    #[error("item {id} not found")]
    NotFound {
        /// The item identifier that was not found
        id: String,
    },

    /// Transport-level error from the HTTP client
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The response arrived but could not be interpreted
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Artifact packaging errors (spreadsheet encoding, archive assembly)
#[derive(Debug, Error)]
pub enum ExportError {
    /// Spreadsheet encoding failed
    #[error("spreadsheet encoding failed: {reason}")]
    Sheet {
        /// The reason encoding failed
        reason: String,
    },

    /// Archive assembly failed
    #[error("archive assembly failed for {filename}: {reason}")]
    Archive {
        /// The archive being assembled
        filename: String,
        /// The reason assembly failed
        reason: String,
    },

    /// Two entries in one archive or export share a filename
    #[error("duplicate entry name: {filename}")]
    DuplicateEntry {
        /// The duplicated filename
        filename: String,
    },
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_include_context() {
        let err = Error::InvalidState {
            operation: "set_total",
            reason: "total already set to 3".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid state for set_total: total already set to 3"
        );

        let err = Error::NestedArchive {
            filename: "inner.zip".to_string(),
        };
        assert_eq!(err.to_string(), "nested archive not allowed: inner.zip");
    }

    #[test]
    fn fetch_error_converts_into_crate_error() {
        let err: Error = FetchError::NotFound {
            id: "abc".to_string(),
        }
        .into();
        assert!(matches!(err, Error::Fetch(FetchError::NotFound { .. })));
        assert_eq!(err.to_string(), "fetch error: item abc not found");
    }

    #[test]
    fn export_error_converts_into_crate_error() {
        let err: Error = ExportError::DuplicateEntry {
            filename: "1.png".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "export error: duplicate entry name: 1.png");
    }
}
