//! Core coordinator implementation
//!
//! Orchestrates the transfer lifecycle against two collaborators: the
//! transaction log and the account store. The coordinator holds no
//! state of its own and takes no locks; per-account serialization is
//! the collaborator's job (optimistic locking) and per-record
//! serialization follows from each record having a single writer.

use crate::error::{CoordinatorError, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tandem_account::AccountStore;
use tandem_common::{
    CancellationToken, TransactionId, TransactionRecord, TransactionState, TransactionSummary,
    TransferRequest, TransferResponse,
};
use tandem_log::TransactionLog;

/// Caller-supplied action run after both account updates succeed and
/// before the log advances to `Applied`. A failure cancels the
/// transfer. Callbacks must be idempotent; the apply path may be
/// re-executed at most once.
pub type Callback =
    Box<dyn FnMut() -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> + Send>;

/// Two-phase-commit transfer coordinator
///
/// A value over two collaborator handles; cheap to clone and safe to
/// construct many of.
pub struct Coordinator<L, A> {
    log: Arc<L>,
    accounts: Arc<A>,
}

impl<L, A> Clone for Coordinator<L, A> {
    fn clone(&self) -> Self {
        Self {
            log: Arc::clone(&self.log),
            accounts: Arc::clone(&self.accounts),
        }
    }
}

impl<L, A> Coordinator<L, A>
where
    L: TransactionLog,
    A: AccountStore,
{
    /// Create a new coordinator over a transaction log and an account
    /// store
    pub fn new(log: Arc<L>, accounts: Arc<A>) -> Self {
        Self { log, accounts }
    }

    /// Perform a single atomic transfer
    ///
    /// Inserts a `Pending` log record, applies the transfer to both
    /// accounts, promotes the record to `Applied`, commits both
    /// accounts, and promotes the record to `Done`. On any failure the
    /// recovery path runs immediately; the phase error is returned to
    /// the caller unless recovery itself fails, in which case the
    /// recovery error takes precedence.
    ///
    /// A successful recovery still returns the phase error: the
    /// transfer did not complete even though the books are consistent
    /// again.
    pub async fn start_transaction(
        &self,
        token: &CancellationToken,
        request: TransferRequest,
        callbacks: Vec<Callback>,
    ) -> Result<TransferResponse> {
        self.ensure_live(token)?;

        // If the insert fails no account has been touched and there is
        // nothing to roll back. Should the write have landed anyway,
        // the sweeper cancels the stranded record later.
        let transaction_id = self
            .log
            .insert(
                token,
                &request.source,
                &request.destination,
                &request.reference,
                request.value.clone(),
            )
            .await?;

        if let Err(err) = self
            .apply_phase(token, transaction_id, &request, callbacks)
            .await
        {
            tracing::warn!(
                "apply phase failed for transaction {}: {}",
                transaction_id,
                err
            );
            self.recover_from_error(token, transaction_id, &request, TransactionState::Pending)
                .await?;
            return Err(err);
        }

        match self.commit_phase(token, transaction_id, &request).await {
            Ok(record) => Ok(TransferResponse {
                transaction_id,
                last_modified: record.last_modified.timestamp(),
            }),
            Err(err) => {
                tracing::warn!(
                    "commit phase failed for transaction {}: {}",
                    transaction_id,
                    err
                );
                self.recover_from_error(token, transaction_id, &request, TransactionState::Applied)
                    .await?;
                Err(err)
            }
        }
    }

    /// All transactions in `state` whose reference begins with
    /// `reference_prefix`
    pub async fn get_transactions(
        &self,
        token: &CancellationToken,
        state: TransactionState,
        reference_prefix: &str,
    ) -> Result<Vec<TransactionRecord>> {
        Ok(self
            .log
            .scan_by_state_and_prefix(token, state, reference_prefix)
            .await?)
    }

    /// Re-drive every incomplete transaction older than `recover_time`
    /// to a terminal state
    ///
    /// States are swept in a fixed order: `Canceling` first (finish
    /// tearing down what is already rolling back), then `Applied` (push
    /// forward past the point of no return), then `Pending` (tear down
    /// what never got applied). Records inside a state are processed
    /// sequentially so the sweeper never re-drives one account
    /// concurrently with itself.
    ///
    /// The cutoff is strict: a record whose `last_modified` equals
    /// `recover_time` is considered in flight and skipped.
    pub async fn recover_transactions(
        &self,
        token: &CancellationToken,
        recover_time: DateTime<Utc>,
    ) -> Result<()> {
        for state in [
            TransactionState::Canceling,
            TransactionState::Applied,
            TransactionState::Pending,
        ] {
            let summaries = self.log.scan_by_state(token, state).await?;
            self.recover_batch(token, summaries, recover_time, state)
                .await?;
        }
        Ok(())
    }

    async fn recover_batch(
        &self,
        token: &CancellationToken,
        summaries: Vec<TransactionSummary>,
        recover_time: DateTime<Utc>,
        state: TransactionState,
    ) -> Result<()> {
        for summary in summaries {
            if recover_time > summary.last_modified {
                tracing::warn!("re-driving transaction {} from state {}", summary.id, state);
                let request = summary.recovery_request();
                self.recover_from_error(token, summary.id, &request, state)
                    .await?;
            }
        }
        Ok(())
    }

    /// Dispatch on the state that was in force when a failure was
    /// observed
    async fn recover_from_error(
        &self,
        token: &CancellationToken,
        transaction_id: TransactionId,
        request: &TransferRequest,
        observed_state: TransactionState,
    ) -> Result<()> {
        match observed_state {
            TransactionState::Pending => {
                self.log
                    .update_state(token, transaction_id, TransactionState::Canceling)
                    .await?;
                self.cancel_phase(token, transaction_id, request).await
            }
            TransactionState::Applied => self
                .commit_phase(token, transaction_id, request)
                .await
                .map(|_| ()),
            TransactionState::Canceling => self.cancel_phase(token, transaction_id, request).await,
            _ => Ok(()),
        }
    }

    /// Apply the transfer to both accounts, run the caller's callbacks,
    /// and promote the record to `Applied`
    async fn apply_phase(
        &self,
        token: &CancellationToken,
        transaction_id: TransactionId,
        request: &TransferRequest,
        mut callbacks: Vec<Callback>,
    ) -> Result<()> {
        self.ensure_live(token)?;

        self.accounts
            .update(token, &request.source, transaction_id, request)
            .await?;
        self.accounts
            .update(token, &request.destination, transaction_id, request)
            .await?;

        for callback in callbacks.iter_mut() {
            callback().map_err(CoordinatorError::Callback)?;
        }

        self.log
            .update_state(token, transaction_id, TransactionState::Applied)
            .await?;
        Ok(())
    }

    /// Clear the pending entries on both accounts and promote the
    /// record to `Done`, returning its final image
    async fn commit_phase(
        &self,
        token: &CancellationToken,
        transaction_id: TransactionId,
        request: &TransferRequest,
    ) -> Result<TransactionRecord> {
        self.ensure_live(token)?;

        self.accounts
            .commit(token, &request.source, transaction_id)
            .await?;
        self.accounts
            .commit(token, &request.destination, transaction_id)
            .await?;

        Ok(self
            .log
            .update_state(token, transaction_id, TransactionState::Done)
            .await?)
    }

    /// Roll both accounts back, destination first (the inverse of the
    /// apply order), and promote the record to `Cancelled`
    async fn cancel_phase(
        &self,
        token: &CancellationToken,
        transaction_id: TransactionId,
        request: &TransferRequest,
    ) -> Result<()> {
        self.ensure_live(token)?;

        self.rollback_account(token, &request.destination, transaction_id, request)
            .await?;
        self.rollback_account(token, &request.source, transaction_id, request)
            .await?;

        self.log
            .update_state(token, transaction_id, TransactionState::Cancelled)
            .await?;
        Ok(())
    }

    /// Roll one account back, treating the absent-pending-id sentinel as
    /// success so rollback stays idempotent
    async fn rollback_account(
        &self,
        token: &CancellationToken,
        account_id: &str,
        transaction_id: TransactionId,
        request: &TransferRequest,
    ) -> Result<()> {
        match self
            .accounts
            .rollback(token, account_id, transaction_id, request)
            .await
        {
            Ok(()) => Ok(()),
            Err(err) if err.is_pending_transaction_not_found() => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn ensure_live(&self, token: &CancellationToken) -> Result<()> {
        if token.is_cancelled() {
            return Err(CoordinatorError::Cancelled);
        }
        Ok(())
    }
}
