//! # Reconciler - batch reconciliation for remote record stores
//!
//! Reconciler binds incoming "child" records to their "parent" records by a
//! natural key, creating the parents that do not exist yet and persisting
//! everything with a minimal number of store round trips: one query and at
//! most one insert per reconciliation, regardless of child count.
//!
//! ## Core Concepts
//!
//! - **Record**: a field-value mapping with an optional store-assigned identifier
//! - **RecordStore**: the external store adapter (query, batch insert/update/delete)
//! - **ParentLink**: which child field matches which parent field, and where the parent id lands
//! - **Reconciler**: resolve-or-create parents, bind children, stage for upsert
//! - **BatchUpserter**: order-preserving insert/update split with per-record results
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use reconciler::{
//!     InMemoryRecordStore, ParentLink, Record, RecordKind, Reconciler,
//! };
//!
//! let store = Arc::new(InMemoryRecordStore::new());
//! let reconciler = Reconciler::new(store);
//!
//! let children = vec![
//!     Record::new(RecordKind::Contact).field("last_name", "Doe"),
//!     Record::new(RecordKind::Contact).field("last_name", "Jane"),
//! ];
//! let link = ParentLink::new(RecordKind::Account, "last_name", "name", "account_id");
//!
//! let (outcome, results) = reconciler.reconcile_and_upsert(children, &link).unwrap();
//! assert_eq!(outcome.created_parents.len(), 2);
//! assert!(results.iter().all(Result::is_ok));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod error;
pub mod record;
pub mod value;

// Store adapter and engine
pub mod batch;
pub mod index;
pub mod reconcile;
pub mod store;

// Re-export primary types at crate root for convenience
pub use batch::BatchUpserter;
pub use error::{ReconcileError, ReconcileResult};
pub use index::{KeyIndex, ParentIndex};
pub use reconcile::{
    KeyedUpsert, MarkerPolicy, ParentLink, Reconciler, Reconciliation, UpsertOutcome,
};
pub use record::{Record, RecordId, RecordKind};
pub use store::{BatchResult, FieldFilter, InMemoryRecordStore, RecordStore, StoreError};
pub use value::FieldValue;
