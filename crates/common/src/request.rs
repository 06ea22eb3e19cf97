//! Transfer request and response types

use crate::TransactionId;
use serde::{Deserialize, Serialize};

/// A two-party transfer submitted to the coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Account debited by the transfer
    pub source: String,
    /// Account credited by the transfer
    pub destination: String,
    /// Sort key for querying transactions through the secondary index
    pub reference: String,
    /// Opaque payload interpreted only by the account collaborator
    pub value: serde_json::Value,
}

impl TransferRequest {
    /// Build a request with the conventional `"<source>:<destination>"`
    /// reference
    pub fn new(
        source: impl Into<String>,
        destination: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        let source = source.into();
        let destination = destination.into();
        let reference = format!("{}:{}", source, destination);
        Self {
            source,
            destination,
            reference,
            value,
        }
    }

    /// Override the generated reference
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = reference.into();
        self
    }
}

/// Outcome of a successfully completed transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResponse {
    /// Id of the log record the transfer was tracked under
    pub transaction_id: TransactionId,
    /// Seconds since the Unix epoch of the final log write
    pub last_modified: i64,
}
