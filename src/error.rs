//! Error types for the reconciliation engine.
//!
//! All errors are strongly typed using thiserror. Store-level failures are
//! wrapped, never retried; invariant violations are surfaced, never
//! skipped. Partial batch failure is deliberately *not* an error type: it
//! is a per-record result list so callers can decide remediation per
//! record.

use thiserror::Error;

pub use crate::store::StoreError;

/// Top-level error type for reconciliation operations.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The store adapter failed (connectivity, validation, permission).
    /// Aborts the current reconciliation step; no partial parent/child
    /// state is assumed consistent afterwards.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A child could not be bound to any parent identifier after the
    /// create-missing-parents step. This is a logic fault in the engine or
    /// the store, not a recoverable condition.
    #[error("No parent resolved for key {key:?} on field '{field}' after creating missing parents")]
    UnresolvedParent {
        /// The relation field the child was matched on.
        field: String,
        /// The key value that resolved to nothing.
        key: String,
    },

    /// A child carries no usable relation key, so it can never be bound.
    #[error("Child at index {index} has no string value for relation field '{field}'")]
    MissingRelationKey {
        /// Position of the offending child in the input sequence.
        index: usize,
        /// The relation field that was missing or not string-valued.
        field: String,
    },

    /// Creating missing parents failed for one or more keys. Carries every
    /// failed key with the store's reason; nothing is silently dropped.
    #[error("Failed to create {} missing parent(s)", failures.len())]
    ParentCreation {
        /// Key value and store error for each parent that failed to insert.
        failures: Vec<(String, StoreError)>,
    },
}

impl ReconcileError {
    /// Returns true if this error originated in the store adapter.
    #[must_use]
    pub const fn is_store(&self) -> bool {
        matches!(self, Self::Store(_) | Self::ParentCreation { .. })
    }

    /// Returns true if this error is an engine invariant violation.
    #[must_use]
    pub const fn is_invariant(&self) -> bool {
        matches!(
            self,
            Self::UnresolvedParent { .. } | Self::MissingRelationKey { .. }
        )
    }
}

/// Result type alias for reconciliation operations.
pub type ReconcileResult<T> = Result<T, ReconcileError>;
