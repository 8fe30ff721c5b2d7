use thiserror::Error;

use crate::domain::{AccountError, PageError, TransactionError};

/// Error surface of the ledger use case.
///
/// Validation and business-rule rejections are typed variants; collaborator
/// failures pass through as [`LedgerError::Storage`] so callers can tell
/// "your request was rejected" apart from "the system could not answer".
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Account(#[from] AccountError),

    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error(transparent)]
    Page(#[from] PageError),

    #[error("account not found: {0}")]
    AccountNotFound(String),

    #[error("expected an analytic account, got {0}")]
    NotAnalytic(String),

    #[error("expected a synthetic account, got {0}")]
    NotSynthetic(String),

    #[error("group depth must be at least 1")]
    InvalidGroupDepth,

    /// Optimistic concurrency rejection. The caller is expected to re-read
    /// the account and retry with a fresh version.
    #[error("version conflict on account {account}: expected {expected}, current {current}")]
    VersionConflict {
        account: String,
        expected: u64,
        current: u64,
    },

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}
