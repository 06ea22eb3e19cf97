//! Error types for transaction log operations

use tandem_common::TransactionId;
use thiserror::Error;

/// Errors surfaced by a transaction log backend
#[derive(Debug, Error)]
pub enum LogError {
    /// Store round trip failed; the write may or may not have landed
    #[error("transaction store unavailable: {0}")]
    Unavailable(String),

    /// No record exists under the given id
    #[error("transaction not found: {0}")]
    RecordNotFound(TransactionId),

    /// Caller's context was cancelled before the operation ran
    #[error("log operation cancelled by caller")]
    Cancelled,
}

/// Result type alias for log operations
pub type Result<T> = std::result::Result<T, LogError>;
