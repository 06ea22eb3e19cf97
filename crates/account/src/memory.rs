//! In-memory reference account collaborator
//!
//! Models the remote document store's contract: every write is a
//! snapshot read followed by a version-conditional apply, the two halves
//! taken under separate lock acquisitions so concurrent writers really
//! do collide and exercise the retry envelope.

use crate::types::{AccountRecord, Item};
use crate::{AccountError, AccountStore, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tandem_common::{CancellationToken, TransactionId, TransferRequest};

const MAX_UPDATE_ATTEMPTS: u32 = 10;
const UPDATE_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Retry envelope of the conditional-write cycle
///
/// Fixed spacing, no jitter, no backoff: the contract of the reference
/// collaborator. A production deployment would want jittered exponential
/// backoff instead.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retry_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_UPDATE_ATTEMPTS,
            retry_interval: UPDATE_RETRY_INTERVAL,
        }
    }
}

/// Which way a conditional write moves an account's balance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Adjustment {
    Credit,
    Debit,
}

impl Adjustment {
    fn inverse(self) -> Self {
        match self {
            Self::Credit => Self::Debit,
            Self::Debit => Self::Credit,
        }
    }

    /// Apply direction for one side of a transfer: the destination is
    /// credited, everything else is debited
    fn for_update(account_id: &str, request: &TransferRequest) -> Self {
        if account_id == request.destination {
            Self::Credit
        } else {
            Self::Debit
        }
    }
}

/// In-memory account store implementing the reference collaborator
/// semantics: optimistic locking on `version`, pending-list bookkeeping,
/// bounded retry on conflict
pub struct MemoryAccountStore {
    accounts: Arc<Mutex<HashMap<String, AccountRecord>>>,
    retry: RetryPolicy,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self {
            accounts: Arc::new(Mutex::new(HashMap::new())),
            retry: RetryPolicy::default(),
        }
    }

    /// Override the retry envelope (builder pattern)
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The read half of the cycle: observe the current document image
    fn snapshot(&self, account_id: &str) -> Result<AccountRecord> {
        self.accounts
            .lock()
            .get(account_id)
            .cloned()
            .ok_or_else(|| AccountError::AccountNotFound(account_id.to_string()))
    }

    /// The write half: re-acquire the document and apply `mutate` only
    /// if the version still matches the one the snapshot observed
    fn apply_if_version(
        &self,
        account_id: &str,
        expected_version: u64,
        mutate: impl FnOnce(&mut AccountRecord) -> Result<()>,
    ) -> Result<()> {
        let mut accounts = self.accounts.lock();
        let record = accounts
            .get_mut(account_id)
            .ok_or_else(|| AccountError::AccountNotFound(account_id.to_string()))?;
        if record.version != expected_version {
            return Err(AccountError::ConditionalCheckFailed);
        }
        mutate(record)?;
        record.version += 1;
        Ok(())
    }

    /// Drive one conditional-write cycle to completion under the retry
    /// envelope. Only version conflicts are retried; every other error
    /// surfaces immediately.
    async fn run_conditional(
        &self,
        token: &CancellationToken,
        operation: &'static str,
        account_id: &str,
        transaction_id: TransactionId,
        attempt: impl Fn() -> Result<()>,
    ) -> Result<()> {
        let mut attempts = 0;
        loop {
            if token.is_cancelled() {
                return Err(AccountError::Cancelled);
            }
            match attempt() {
                Ok(()) => return Ok(()),
                Err(AccountError::ConditionalCheckFailed) => {
                    attempts += 1;
                    if attempts >= self.retry.max_attempts {
                        tracing::warn!(
                            "{} exhausted {} attempts on account {} (transaction {})",
                            operation,
                            attempts,
                            account_id,
                            transaction_id
                        );
                        return Err(AccountError::RetryExhausted {
                            operation,
                            attempts,
                            account_id: account_id.to_string(),
                            transaction_id,
                        });
                    }
                    tokio::time::sleep(self.retry.retry_interval).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for MemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MemoryAccountStore {
    fn clone(&self) -> Self {
        Self {
            accounts: Arc::clone(&self.accounts),
            retry: self.retry,
        }
    }
}

/// Down-cast the opaque transfer payload to the item type this
/// collaborator understands
fn transfer_item(request: &TransferRequest) -> Result<Item> {
    Ok(serde_json::from_value(request.value.clone())?)
}

/// Validate then apply a balance change. Validation happens before any
/// mutation so a failed adjustment leaves the document untouched.
fn adjust(record: &mut AccountRecord, item: &Item, adjustment: Adjustment) -> Result<()> {
    let account_id = record.id.clone();
    let resource =
        record
            .resources
            .get_mut(&item.id)
            .ok_or_else(|| AccountError::UnknownResource {
                account_id: account_id.clone(),
                item_id: item.id.clone(),
            })?;
    match adjustment {
        Adjustment::Credit => resource.amount += item.amount,
        Adjustment::Debit => {
            if resource.amount < item.amount {
                return Err(AccountError::InsufficientBalance {
                    account_id,
                    item_id: item.id.clone(),
                });
            }
            resource.amount -= item.amount;
        }
    }
    Ok(())
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn get(&self, token: &CancellationToken, account_id: &str) -> Result<AccountRecord> {
        if token.is_cancelled() {
            return Err(AccountError::Cancelled);
        }
        self.snapshot(account_id)
    }

    async fn put(&self, token: &CancellationToken, record: AccountRecord) -> Result<()> {
        if token.is_cancelled() {
            return Err(AccountError::Cancelled);
        }
        self.accounts.lock().insert(record.id.clone(), record);
        Ok(())
    }

    async fn update(
        &self,
        token: &CancellationToken,
        account_id: &str,
        transaction_id: TransactionId,
        request: &TransferRequest,
    ) -> Result<()> {
        let item = transfer_item(request)?;
        let adjustment = Adjustment::for_update(account_id, request);

        self.run_conditional(token, "update", account_id, transaction_id, || {
            let snapshot = self.snapshot(account_id)?;
            self.apply_if_version(account_id, snapshot.version, |record| {
                adjust(record, &item, adjustment)?;
                record.pending_transactions.push(transaction_id);
                Ok(())
            })
        })
        .await
    }

    async fn rollback(
        &self,
        token: &CancellationToken,
        account_id: &str,
        transaction_id: TransactionId,
        request: &TransferRequest,
    ) -> Result<()> {
        let item = transfer_item(request)?;
        let adjustment = Adjustment::for_update(account_id, request).inverse();

        self.run_conditional(token, "rollback", account_id, transaction_id, || {
            let snapshot = self.snapshot(account_id)?;
            // Position found on the snapshot; the version condition keeps
            // it valid at write time
            let index = snapshot
                .pending_transactions
                .iter()
                .position(|id| *id == transaction_id)
                .ok_or(AccountError::PendingTransactionNotFound)?;
            self.apply_if_version(account_id, snapshot.version, |record| {
                adjust(record, &item, adjustment)?;
                record.pending_transactions.remove(index);
                Ok(())
            })
        })
        .await
    }

    async fn commit(
        &self,
        token: &CancellationToken,
        account_id: &str,
        transaction_id: TransactionId,
    ) -> Result<()> {
        self.run_conditional(token, "commit", account_id, transaction_id, || {
            let snapshot = self.snapshot(account_id)?;
            // Already committed by an earlier attempt or a prior
            // recovery pass; nothing to do
            let Some(index) = snapshot
                .pending_transactions
                .iter()
                .position(|id| *id == transaction_id)
            else {
                return Ok(());
            };
            self.apply_if_version(account_id, snapshot.version, |record| {
                record.pending_transactions.remove(index);
                Ok(())
            })
        })
        .await
    }
}
