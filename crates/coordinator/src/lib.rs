//! Client-side two-phase-commit coordinator for atomic two-party
//! transfers
//!
//! The coordinator moves value between two account documents held in a
//! store that only offers single-record conditional writes. Every
//! transfer is tracked in a transaction log so that after a crash,
//! outage, or failed write the recovery sweeper can always drive it to
//! a terminal state: fully applied or fully rolled back.
//!
//! ## Lifecycle
//!
//! ```text
//!           insert
//!   ∅ ──────────────▶ Pending
//!                       │ update(src), update(dst), callbacks
//!                       ▼
//!                    Applied ──── commit(src), commit(dst) ──▶ Done
//!                       │
//!   Pending ── failure while applying ──▶ Canceling
//!                    Canceling ── rollback(dst), rollback(src) ──▶ Cancelled
//! ```
//!
//! `Done` and `Cancelled` are terminal. Recovery re-drives `Applied`
//! forward to `Done` and tears `Pending`/`Canceling` down to
//! `Cancelled`.

mod coordinator;
mod error;

pub use coordinator::{Callback, Coordinator};
pub use error::{CoordinatorError, Result};
