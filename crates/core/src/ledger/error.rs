//! Ledger error types.
//!
//! Covers run configuration problems detected while building a
//! [`ReportContext`](super::ReportContext) and failures reported by the
//! ledger, snapshot and account collaborators.

use finstat_shared::AppError;
use thiserror::Error;

/// Errors that can occur while reading ledger data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    // ========== Configuration Errors ==========
    /// A non-default finance book was combined with the default book.
    #[error(
        "To use a different finance book, uncheck 'Include Default Book Entries' \
         (requested {requested}, default {default})"
    )]
    FinanceBookConflict {
        /// Requested finance book.
        requested: String,
        /// Company default finance book.
        default: String,
    },

    // ========== Collaborator Errors ==========
    /// A referenced snapshot does not exist.
    #[error("Closing snapshot not found: {0}")]
    SnapshotNotFound(String),

    /// A ledger query failed.
    #[error("Ledger query failed: {0}")]
    Query(String),

    /// The backing store is unavailable.
    #[error("Ledger source unavailable: {0}")]
    Unavailable(String),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::FinanceBookConflict { .. } => "FINANCE_BOOK_CONFLICT",
            Self::SnapshotNotFound(_) => "SNAPSHOT_NOT_FOUND",
            Self::Query(_) => "LEDGER_QUERY_FAILED",
            Self::Unavailable(_) => "LEDGER_UNAVAILABLE",
        }
    }

    /// Returns true if the error stems from the run configuration.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::FinanceBookConflict { .. })
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::FinanceBookConflict { .. } => Self::Configuration(err.to_string()),
            LedgerError::SnapshotNotFound(_) => Self::NotFound(err.to_string()),
            LedgerError::Query(_) => Self::Internal(err.to_string()),
            LedgerError::Unavailable(_) => Self::ExternalService(err.to_string()),
        }
    }
}
