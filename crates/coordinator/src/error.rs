//! Error types for the transfer coordinator

use tandem_account::AccountError;
use tandem_log::LogError;
use thiserror::Error;

/// Errors surfaced by coordinator operations
///
/// The coordinator reports the first error of a failing phase. When the
/// failure triggers recovery and recovery itself fails, the recovery
/// error takes precedence so the caller knows consistency is not yet
/// restored; a successful recovery never masks the phase error.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// Transaction log round trip failed
    #[error("transaction log error: {0}")]
    Log(#[from] LogError),

    /// Account collaborator call failed
    #[error("account store error: {0}")]
    Account(#[from] AccountError),

    /// A caller-supplied callback rejected the transfer
    #[error("transfer callback failed: {0}")]
    Callback(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Caller's context was cancelled. No cleanup has run; the outcome
    /// is indeterminate until the next recovery sweep.
    #[error("transfer cancelled by caller")]
    Cancelled,
}

/// Result type alias for coordinator operations
pub type Result<T> = std::result::Result<T, CoordinatorError>;
