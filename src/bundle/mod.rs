//! Atomic bundle submission through the block engine
//!
//! Callers hand over pending transactions with their signers; the
//! coordinator stamps one shared blockhash, signs, appends the tip
//! transaction and waits for a landing verdict.

pub mod confirmation;
pub mod coordinator;
pub mod types;

pub use confirmation::{classify_result, ConfirmationOutcome, PushVerdict};
pub use coordinator::BundleCoordinator;
pub use types::{Bundle, PendingBundleEntry};
