//! Persisted transaction record and its scan projection

use crate::{TransactionId, TransactionState, TransferRequest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One document of the transaction log, keyed by `id`
///
/// `reference` doubles as the sort key of the `(state, reference)`
/// secondary index; by convention it encodes `"<source>:<destination>"`
/// so prefix scans can enumerate an account pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: TransactionId,
    pub reference: String,
    pub state: TransactionState,
    pub source: String,
    pub destination: String,
    /// Opaque payload; the coordinator never inspects it
    pub value: serde_json::Value,
    /// Bumped on every state write
    pub last_modified: DateTime<Utc>,
}

impl TransactionRecord {
    /// Narrow to the projection returned by the full-state scan
    pub fn summary(&self) -> TransactionSummary {
        TransactionSummary {
            id: self.id,
            source: self.source.clone(),
            destination: self.destination.clone(),
            value: self.value.clone(),
            last_modified: self.last_modified,
        }
    }
}

/// Projection of a transaction record without `reference`
///
/// The full-state scan feeds recovery, which never consumes the
/// reference, so the index projection leaves it out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub id: TransactionId,
    pub source: String,
    pub destination: String,
    pub value: serde_json::Value,
    pub last_modified: DateTime<Utc>,
}

impl TransactionSummary {
    /// Rebuild the transfer request handed back to the recovery path
    ///
    /// The reference is left empty; rollback and commit do not read it.
    pub fn recovery_request(&self) -> TransferRequest {
        TransferRequest {
            source: self.source.clone(),
            destination: self.destination.clone(),
            reference: String::new(),
            value: self.value.clone(),
        }
    }
}
