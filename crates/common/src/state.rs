//! Transaction lifecycle states

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of a transaction record in the log
///
/// Legal transitions: `Pending -> Applied -> Done`,
/// `Pending -> Canceling -> Cancelled`. The coordinator is the sole
/// writer and the only place transitions happen. Scans query states by
/// equality only; the variant order carries no meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TransactionState {
    /// Log record written, account effects not yet fully applied
    Pending,
    /// Both account updates applied, commits outstanding
    Applied,
    /// Both accounts committed
    Done,
    /// Rollback underway after a failure observed while `Pending`
    Canceling,
    /// Rolled back on both accounts
    Cancelled,
}

impl TransactionState {
    /// A record never moves out of `Done` or `Cancelled`
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Cancelled)
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Applied => "applied",
            Self::Done => "done",
            Self::Canceling => "canceling",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(TransactionState::Done.is_terminal());
        assert!(TransactionState::Cancelled.is_terminal());
        assert!(!TransactionState::Pending.is_terminal());
        assert!(!TransactionState::Applied.is_terminal());
        assert!(!TransactionState::Canceling.is_terminal());
    }

    #[test]
    fn test_serde_roundtrip() {
        let json = serde_json::to_string(&TransactionState::Canceling).unwrap();
        assert_eq!(json, "\"Canceling\"");
        let back: TransactionState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TransactionState::Canceling);
    }
}
