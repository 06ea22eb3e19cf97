//! Reference account document schema

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tandem_common::TransactionId;

/// Account document as stored by the reference collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Primary key, unique per account
    pub id: String,
    /// Item id to held amount
    pub resources: HashMap<String, Item>,
    /// Ordered ids of transactions applied but not yet committed
    pub pending_transactions: Vec<TransactionId>,
    /// Optimistic-locking counter, bumped by every conditional write
    pub version: u64,
}

impl AccountRecord {
    /// Empty account with no resources and version 0
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            resources: HashMap::new(),
            pending_transactions: Vec::new(),
            version: 0,
        }
    }

    /// Seed a resource (builder style, for bootstrap and tests)
    pub fn with_resource(mut self, item: Item) -> Self {
        self.resources.insert(item.id.clone(), item);
        self
    }
}

/// A quantity of one item kind
///
/// This is the concrete type the opaque transfer payload down-casts to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub amount: i64,
}

impl Item {
    pub fn new(id: impl Into<String>, amount: i64) -> Self {
        Self {
            id: id.into(),
            amount,
        }
    }
}
