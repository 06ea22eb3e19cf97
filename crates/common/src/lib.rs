//! Common types for the tandem transfer coordinator
//!
//! This crate defines:
//! - Transaction identifiers (UUID v4 based)
//! - The transaction lifecycle states
//! - The persisted transaction record and its scan projection
//! - Transfer request/response types

mod record;
mod request;
mod state;
mod transaction_id;

pub use record::TransactionRecord;
pub use record::TransactionSummary;
pub use request::TransferRequest;
pub use request::TransferResponse;
pub use state::TransactionState;
pub use transaction_id::TransactionId;

// Re-export the cancellation token threaded through every store operation
pub use tokio_util::sync::CancellationToken;
