//! Error types for account collaborator operations

use tandem_common::TransactionId;
use thiserror::Error;

/// Errors surfaced by an account collaborator
#[derive(Debug, Error)]
pub enum AccountError {
    /// No account document under the given id
    #[error("account not found: {0}")]
    AccountNotFound(String),

    /// The version observed by the snapshot read moved before the
    /// conditional write landed. Never escapes the collaborator's retry
    /// envelope; exhaustion surfaces as [`AccountError::RetryExhausted`].
    #[error("conditional check failed")]
    ConditionalCheckFailed,

    /// The conditional-write cycle gave up after its retry budget
    #[error(
        "{operation} failed after {attempts} attempts on account {account_id} (transaction {transaction_id})"
    )]
    RetryExhausted {
        operation: &'static str,
        attempts: u32,
        account_id: String,
        transaction_id: TransactionId,
    },

    /// Sentinel: the transaction id is absent from the account's pending
    /// list. Rollback callers treat this as success (idempotent rollback).
    #[error("pending transaction id not found")]
    PendingTransactionNotFound,

    /// Source-side balance precondition failed
    #[error("insufficient balance in account {account_id} for item {item_id}")]
    InsufficientBalance { account_id: String, item_id: String },

    /// The account holds no resource of the requested item kind
    #[error("account {account_id} holds no resource {item_id}")]
    UnknownResource { account_id: String, item_id: String },

    /// The transfer payload does not down-cast to the expected item type
    #[error("transfer payload is not an item: {0}")]
    PayloadType(#[from] serde_json::Error),

    /// Store round trip failed
    #[error("account store unavailable: {0}")]
    Unavailable(String),

    /// Caller's context was cancelled before the operation ran
    #[error("account operation cancelled by caller")]
    Cancelled,
}

impl AccountError {
    /// Discriminator for the idempotent-rollback sentinel
    pub fn is_pending_transaction_not_found(&self) -> bool {
        matches!(self, Self::PendingTransactionNotFound)
    }
}

/// Result type alias for account operations
pub type Result<T> = std::result::Result<T, AccountError>;
