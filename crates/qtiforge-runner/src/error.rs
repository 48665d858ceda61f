//! Sequencing error types.
//!
//! A sequencing error aborts only the in-flight navigation operation; the
//! session stays exactly at its prior position.

use thiserror::Error;

use qtiforge_core::error::BranchRuleError;

/// Errors raised by navigation operations.
#[derive(Debug, Error)]
pub enum SequencerError {
    /// The session requires a non-empty response before this move.
    #[error("a valid response to this item is required")]
    EmptyResponseRejected,

    /// A second navigation operation was issued while one is outstanding.
    #[error("another navigation operation is already in flight")]
    MoveInFlight,

    /// Backward navigation was attempted inside a linear test part.
    #[error("backward navigation is not allowed in a linear test part")]
    BackwardNotAllowed,

    /// A branch rule failed to evaluate and the session policy aborts
    /// navigation on malformed rules.
    #[error("branch rule evaluation aborted the move")]
    BranchRule(#[from] BranchRuleError),

    /// The item store collaborator failed.
    #[error("item store failure")]
    ItemStore(#[source] anyhow::Error),
}
