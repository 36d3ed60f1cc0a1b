//! Abstract store traits.
//!
//! These traits define the contract that record store adapters must
//! implement. By using traits, we enable:
//! - In-memory backends for testing and embedded use
//! - Remote backends wrapping an actual persistent store
//!
//! The engine never talks to a concrete store; everything flows through
//! [`RecordStore`].

use thiserror::Error;

use crate::record::{Record, RecordId, RecordKind};
use crate::value::FieldValue;

/// Errors that can occur during store operations.
///
/// Adapters map connectivity, validation, and permission failures into
/// these variants. Timeouts are the adapter's responsibility and surface
/// here as [`StoreError::Timeout`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Record not found.
    #[error("Record not found: {0}")]
    NotFound(RecordId),

    /// A record submitted for update carries no identifier.
    #[error("Record has no identifier; updates require one")]
    MissingId,

    /// Identifier already exists.
    #[error("Duplicate record identifier: {0}")]
    DuplicateId(RecordId),

    /// The store rejected an individual record (validation, permissions).
    #[error("Record rejected: {reason}")]
    Rejected {
        /// Adapter-supplied reason for the rejection.
        reason: String,
    },

    /// Backend error.
    #[error("Store backend error: {0}")]
    Backend(String),

    /// Connection failed.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The adapter gave up waiting on the store.
    #[error("Store operation timed out after {duration_ms}ms")]
    Timeout {
        /// How long the adapter waited before giving up.
        duration_ms: u64,
    },
}

/// Per-record outcome of a batch call: the assigned (or confirmed)
/// identifier on success, the store's reason on failure.
///
/// Batch calls return one of these per input record, in input order, so a
/// partial failure never masks the records that succeeded.
pub type BatchResult = Result<RecordId, StoreError>;

/// An exact-match filter on a single field.
///
/// A filter matches a record when the record's value for `field` equals any
/// of the filter's `values`. Multi-value filters are how the reconciler
/// fetches all candidate parents in one query.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    /// The field the filter applies to.
    pub field: String,
    /// Accepted values; a record matches on equality with any one of them.
    pub values: Vec<FieldValue>,
}

impl FieldFilter {
    /// Filter on a single accepted value.
    #[must_use]
    pub fn equals(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            field: field.into(),
            values: vec![value.into()],
        }
    }

    /// Filter accepting any of the given values (an IN-set filter).
    #[must_use]
    pub fn any_of(field: impl Into<String>, values: Vec<FieldValue>) -> Self {
        Self {
            field: field.into(),
            values,
        }
    }

    /// Returns true if the record satisfies this filter.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        record
            .get(&self.field)
            .map_or(false, |value| self.values.contains(value))
    }
}

/// The external record store the engine reconciles against.
///
/// All operations are synchronous and blocking; each call suspends the
/// caller until the store responds. Batch calls follow a two-level failure
/// model: the outer `Result` is an adapter-level failure (the whole call
/// failed), the inner list carries one result per input record, in input
/// order.
pub trait RecordStore: Send + Sync {
    /// Find all records of `kind` matching every filter (exact match,
    /// unordered result, all matches returned).
    fn query(&self, kind: &RecordKind, filters: &[FieldFilter]) -> Result<Vec<Record>, StoreError>;

    /// Insert a batch of records. Each inserted record is assigned a fresh
    /// identifier; one result per input, same order.
    fn insert_batch(&self, records: Vec<Record>) -> Result<Vec<BatchResult>, StoreError>;

    /// Update a batch of records. Records must carry identifiers; one
    /// result per input, same order.
    fn update_batch(&self, records: Vec<Record>) -> Result<Vec<BatchResult>, StoreError>;

    /// Delete a batch of records by identifier; one result per input, same
    /// order.
    fn delete_batch(&self, ids: &[RecordId]) -> Result<Vec<Result<(), StoreError>>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordKind;

    // Compile-time test: ensure the trait is object-safe
    fn _assert_record_store_object_safe(_: &dyn RecordStore) {}

    #[test]
    fn test_store_error_display() {
        let err = StoreError::NotFound(RecordId::new());
        assert!(err.to_string().contains("Record not found"));

        let err = StoreError::Connection("connection refused".to_string());
        assert!(err.to_string().contains("connection refused"));

        let err = StoreError::Timeout { duration_ms: 5000 };
        assert!(err.to_string().contains("5000ms"));
    }

    #[test]
    fn test_field_filter_equals() {
        let record = Record::new(RecordKind::Account).field("name", "Acme");
        assert!(FieldFilter::equals("name", "Acme").matches(&record));
        assert!(!FieldFilter::equals("name", "Globex").matches(&record));
        assert!(!FieldFilter::equals("missing", "Acme").matches(&record));
    }

    #[test]
    fn test_field_filter_any_of() {
        let record = Record::new(RecordKind::Account).field("name", "Jane");
        let filter = FieldFilter::any_of("name", vec!["Doe".into(), "Jane".into()]);
        assert!(filter.matches(&record));

        let miss = FieldFilter::any_of("name", vec!["Smith".into()]);
        assert!(!miss.matches(&record));
    }

    #[test]
    fn test_field_filter_is_case_sensitive() {
        let record = Record::new(RecordKind::Account).field("name", "Acme");
        assert!(!FieldFilter::equals("name", "acme").matches(&record));
    }
}
