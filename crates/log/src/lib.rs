//! Transaction log contract for the tandem coordinator
//!
//! The log persists one record per transfer, keyed by id and indexed by
//! `(state, reference)` so the recovery sweeper can enumerate every
//! record in a given lifecycle state. Implementations talk to their
//! store on every call; nothing is cached locally.

mod error;
mod memory;

pub use error::{LogError, Result};
pub use memory::MemoryTransactionLog;

use async_trait::async_trait;
use tandem_common::{
    CancellationToken, TransactionId, TransactionRecord, TransactionState, TransactionSummary,
};

/// Storage contract consumed by the coordinator
///
/// The coordinator is the sole writer of any record, so `update_state`
/// is an unconditional overwrite; transition legality is enforced one
/// level up.
#[async_trait]
pub trait TransactionLog: Send + Sync {
    /// Write a fresh record in `Pending` state and return its generated id
    ///
    /// On error the caller must assume the write may still have landed.
    /// A stranded `Pending` record is picked up and cancelled by a later
    /// recovery sweep, so the caller must not retry blindly.
    async fn insert(
        &self,
        token: &CancellationToken,
        source: &str,
        destination: &str,
        reference: &str,
        value: serde_json::Value,
    ) -> Result<TransactionId>;

    /// Overwrite `state` and `last_modified` on the record with primary
    /// key `id`, returning the new image
    async fn update_state(
        &self,
        token: &CancellationToken,
        id: TransactionId,
        new_state: TransactionState,
    ) -> Result<TransactionRecord>;

    /// Point lookup by id
    async fn get(&self, token: &CancellationToken, id: TransactionId) -> Result<TransactionRecord>;

    /// All records in `state` whose reference begins with
    /// `reference_prefix`, in reference order
    async fn scan_by_state_and_prefix(
        &self,
        token: &CancellationToken,
        state: TransactionState,
        reference_prefix: &str,
    ) -> Result<Vec<TransactionRecord>>;

    /// All records in `state`, narrowed to the recovery projection
    async fn scan_by_state(
        &self,
        token: &CancellationToken,
        state: TransactionState,
    ) -> Result<Vec<TransactionSummary>>;
}
