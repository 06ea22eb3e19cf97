//! In-memory transaction log backend

use crate::{LogError, Result, TransactionLog};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tandem_common::{
    CancellationToken, TransactionId, TransactionRecord, TransactionState, TransactionSummary,
};
use uuid::Uuid;

/// In-memory transaction log for tests and examples
///
/// Models the store's layout: a primary map keyed by id plus an ordered
/// `(state, reference, id)` set standing in for the secondary index, so
/// state scans are genuine equality-plus-prefix range scans returning
/// records in reference order.
pub struct MemoryTransactionLog {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    records: HashMap<TransactionId, TransactionRecord>,
    index: BTreeSet<(TransactionState, String, TransactionId)>,
}

impl MemoryTransactionLog {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }
}

impl Default for MemoryTransactionLog {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MemoryTransactionLog {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

fn ensure_live(token: &CancellationToken) -> Result<()> {
    if token.is_cancelled() {
        return Err(LogError::Cancelled);
    }
    Ok(())
}

/// Lowest possible index entry for a given state and reference prefix
fn index_floor(state: TransactionState, prefix: &str) -> (TransactionState, String, TransactionId) {
    (state, prefix.to_string(), TransactionId::from_uuid(Uuid::nil()))
}

#[async_trait]
impl TransactionLog for MemoryTransactionLog {
    async fn insert(
        &self,
        token: &CancellationToken,
        source: &str,
        destination: &str,
        reference: &str,
        value: serde_json::Value,
    ) -> Result<TransactionId> {
        ensure_live(token)?;

        let id = TransactionId::new();
        let record = TransactionRecord {
            id,
            reference: reference.to_string(),
            state: TransactionState::Pending,
            source: source.to_string(),
            destination: destination.to_string(),
            value,
            last_modified: Utc::now(),
        };

        let mut inner = self.inner.lock();
        inner
            .index
            .insert((record.state, record.reference.clone(), id));
        inner.records.insert(id, record);
        Ok(id)
    }

    async fn update_state(
        &self,
        token: &CancellationToken,
        id: TransactionId,
        new_state: TransactionState,
    ) -> Result<TransactionRecord> {
        ensure_live(token)?;

        let mut inner = self.inner.lock();
        let Inner { records, index } = &mut *inner;
        let record = records.get_mut(&id).ok_or(LogError::RecordNotFound(id))?;

        index.remove(&(record.state, record.reference.clone(), id));
        record.state = new_state;
        record.last_modified = Utc::now();
        index.insert((record.state, record.reference.clone(), id));

        Ok(record.clone())
    }

    async fn get(&self, token: &CancellationToken, id: TransactionId) -> Result<TransactionRecord> {
        ensure_live(token)?;

        self.inner
            .lock()
            .records
            .get(&id)
            .cloned()
            .ok_or(LogError::RecordNotFound(id))
    }

    async fn scan_by_state_and_prefix(
        &self,
        token: &CancellationToken,
        state: TransactionState,
        reference_prefix: &str,
    ) -> Result<Vec<TransactionRecord>> {
        ensure_live(token)?;

        let inner = self.inner.lock();
        let records = inner
            .index
            .range(index_floor(state, reference_prefix)..)
            .take_while(|(s, reference, _)| *s == state && reference.starts_with(reference_prefix))
            .filter_map(|(_, _, id)| inner.records.get(id).cloned())
            .collect();
        Ok(records)
    }

    async fn scan_by_state(
        &self,
        token: &CancellationToken,
        state: TransactionState,
    ) -> Result<Vec<TransactionSummary>> {
        ensure_live(token)?;

        let inner = self.inner.lock();
        let summaries = inner
            .index
            .range(index_floor(state, "")..)
            .take_while(|(s, _, _)| *s == state)
            .filter_map(|(_, _, id)| inner.records.get(id).map(TransactionRecord::summary))
            .collect();
        Ok(summaries)
    }
}
