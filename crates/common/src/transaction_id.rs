//! Transaction identifier using UUIDv4
//!
//! Ids only need collision-resistant uniqueness. Nothing orders by id;
//! the log's secondary index sorts by reference instead.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier of a transaction record
///
/// Generated once at log insert and immutable afterwards. Serializes as
/// the canonical hyphenated string so it can serve as a document key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(Uuid);

impl TransactionId {
    /// Generate a new random transaction ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID (for testing/deserialization)
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Parse from the canonical string representation
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let id = TransactionId::new();
        let s = id.to_string();
        let parsed = TransactionId::parse(&s).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_uniqueness() {
        let ids: Vec<_> = (0..100).map(|_| TransactionId::new()).collect();
        for (i, a) in ids.iter().enumerate() {
            for b in ids.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_hash_eq_consistency() {
        use std::collections::HashMap;

        let id1 = TransactionId::new();
        let id2 = id1; // Copy

        let mut map = HashMap::new();
        map.insert(id1, "value");

        assert_eq!(map.get(&id2), Some(&"value"));
    }

    #[test]
    fn test_serde_as_string() {
        let id = TransactionId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
        let back: TransactionId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
