//! Account collaborator contract for the tandem coordinator
//!
//! The coordinator never touches account documents itself; it drives
//! this interface. Implementations own optimistic locking: every write
//! is a version-conditional round trip, retried on conflict inside the
//! collaborator, invisible to the coordinator unless the retry budget
//! runs out.

mod error;
mod memory;
mod types;

pub use error::{AccountError, Result};
pub use memory::{MemoryAccountStore, RetryPolicy};
pub use types::{AccountRecord, Item};

use async_trait::async_trait;
use tandem_common::{CancellationToken, TransactionId, TransferRequest};

/// Capability for mutating account documents, one account per call
///
/// `update` and `rollback` interpret `request.value` and must not read
/// `request.reference`: requests rebuilt by the recovery sweeper carry
/// an empty reference.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Fetch the current account document
    async fn get(&self, token: &CancellationToken, account_id: &str) -> Result<AccountRecord>;

    /// Create an account document. Bootstrap only; never called while a
    /// transaction is in flight.
    async fn put(&self, token: &CancellationToken, record: AccountRecord) -> Result<()>;

    /// Apply the transfer's effect to one account in a single
    /// conditional write: verify the version observed by the preceding
    /// read, check the balance precondition on the source side, append
    /// `transaction_id` to the pending list, adjust the balance, bump
    /// the version
    async fn update(
        &self,
        token: &CancellationToken,
        account_id: &str,
        transaction_id: TransactionId,
        request: &TransferRequest,
    ) -> Result<()>;

    /// Invert the transfer's effect and remove `transaction_id` from the
    /// pending list. An id already absent from the list signals
    /// [`AccountError::PendingTransactionNotFound`], which callers treat
    /// as success.
    async fn rollback(
        &self,
        token: &CancellationToken,
        account_id: &str,
        transaction_id: TransactionId,
        request: &TransferRequest,
    ) -> Result<()>;

    /// Remove `transaction_id` from the pending list and bump the
    /// version. An id already absent is success; recovery may commit the
    /// same account twice.
    async fn commit(
        &self,
        token: &CancellationToken,
        account_id: &str,
        transaction_id: TransactionId,
    ) -> Result<()>;
}
