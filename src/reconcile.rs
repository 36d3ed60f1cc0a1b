//! The batch reconciliation engine.
//!
//! Given incoming child records and a [`ParentLink`], the [`Reconciler`]
//! finds the parents that already exist, creates the ones that do not, and
//! binds every child to the right parent identifier — with one store query
//! and at most one parent insert per call, regardless of how many children
//! are involved.
//!
//! Parent creation and child persistence are deliberately separate steps:
//! [`Reconciler::reconcile`] stages children, and callers compose the
//! persistence (and any transactional scope) themselves, or reach for the
//! non-transactional [`Reconciler::reconcile_and_upsert`] convenience.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::batch::BatchUpserter;
use crate::error::{ReconcileError, ReconcileResult};
use crate::index::KeyIndex;
use crate::record::{Record, RecordId, RecordKind};
use crate::store::{BatchResult, FieldFilter, RecordStore, StoreError};
use crate::value::FieldValue;

/// Names the fields a reconciliation runs over.
///
/// The child's `child_key_field` value is matched against the parent's
/// `parent_key_field` value (exact, case-sensitive equality, no
/// normalization), and the resolved parent identifier lands in the child's
/// `reference_field`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentLink {
    /// Kind of the parent records.
    pub parent_kind: RecordKind,
    /// Field on the child holding the relation-key value.
    pub child_key_field: String,
    /// Field on the parent the key is matched against.
    pub parent_key_field: String,
    /// Field on the child that receives the parent identifier.
    pub reference_field: String,
}

impl ParentLink {
    /// Creates a link description.
    #[must_use]
    pub fn new(
        parent_kind: RecordKind,
        child_key_field: impl Into<String>,
        parent_key_field: impl Into<String>,
        reference_field: impl Into<String>,
    ) -> Self {
        Self {
            parent_kind,
            child_key_field: child_key_field.into(),
            parent_key_field: parent_key_field.into(),
            reference_field: reference_field.into(),
        }
    }
}

/// Outcome of a reconciliation: the staged children and the parents that
/// had to be created.
///
/// Every child's reference field is bound to a parent identifier that
/// exists in the store. The children have *not* been persisted; pass them
/// to [`BatchUpserter`] (or use [`Reconciler::reconcile_and_upsert`]).
#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// The input children, in input order, each bound to a parent.
    pub children: Vec<Record>,
    /// Identifiers of parents created during this call, in first-seen key
    /// order. Empty when every key already existed.
    pub created_parents: Vec<RecordId>,
}

/// How the single-record natural-key upsert marks the branch it took.
///
/// Found and not-found records get distinguishable marker values so the
/// caller (or a human looking at the store) can tell which path ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerPolicy {
    /// Field that receives the marker value.
    pub field: String,
    /// Marker written when no record matched the key.
    pub on_create: String,
    /// Marker written when an existing record matched the key.
    pub on_update: String,
}

impl MarkerPolicy {
    /// Creates a marker policy.
    #[must_use]
    pub fn new(
        field: impl Into<String>,
        on_create: impl Into<String>,
        on_update: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            on_create: on_create.into(),
            on_update: on_update.into(),
        }
    }
}

impl Default for MarkerPolicy {
    fn default() -> Self {
        Self::new("status", "New", "Updated")
    }
}

/// Which branch a natural-key upsert took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No record matched the key; a new one was inserted.
    Created,
    /// An existing record matched the key and was updated.
    Updated,
}

/// Result of a natural-key upsert: the persisted identifier and the branch
/// taken. Terminal; there are no further transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyedUpsert {
    /// Identifier of the persisted record (preserved on update, assigned
    /// on create).
    pub id: RecordId,
    /// Which branch ran.
    pub outcome: UpsertOutcome,
}

/// The reconciliation engine.
///
/// Holds only a store handle and a [`BatchUpserter`]; all working state
/// (key sets, parent index, staged children) is allocated per call, so a
/// single `Reconciler` is safe to share across independent callers.
///
/// Two concurrent reconciliations contending on the same missing key may
/// both create a parent for it — callers that can contend on a key space
/// must serialize those calls or rely on the store's own uniqueness
/// enforcement.
pub struct Reconciler {
    store: Arc<dyn RecordStore>,
    upserter: BatchUpserter,
}

impl Reconciler {
    /// Creates a reconciler over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        let upserter = BatchUpserter::new(store.clone());
        Self { store, upserter }
    }

    /// Resolves or creates a parent for every child and binds each child's
    /// reference field to its parent's identifier.
    ///
    /// Runs exactly one store query and, when parents are missing, exactly
    /// one insert — never one round trip per child. An empty input returns
    /// an empty outcome without touching the store.
    ///
    /// Parents created here are persisted immediately (an irreversible,
    /// visible effect); the children are only staged.
    ///
    /// # Errors
    /// - [`ReconcileError::MissingRelationKey`]: a child has no string
    ///   value for the relation field, before any store call is made.
    /// - [`ReconcileError::Store`]: the store adapter failed.
    /// - [`ReconcileError::ParentCreation`]: one or more missing parents
    ///   could not be inserted; carries every failed key.
    /// - [`ReconcileError::UnresolvedParent`]: a key still has no
    ///   identifier after the insert step (engine invariant violation).
    pub fn reconcile(
        &self,
        mut children: Vec<Record>,
        link: &ParentLink,
    ) -> ReconcileResult<Reconciliation> {
        if children.is_empty() {
            return Ok(Reconciliation {
                children,
                created_parents: Vec::new(),
            });
        }

        // Distinct relation keys, first-seen order for determinism.
        let mut child_keys: Vec<String> = Vec::with_capacity(children.len());
        let mut keys: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for (index, child) in children.iter().enumerate() {
            let Some(key) = child.key_string(&link.child_key_field) else {
                return Err(ReconcileError::MissingRelationKey {
                    index,
                    field: link.child_key_field.clone(),
                });
            };
            if seen.insert(key.to_string()) {
                keys.push(key.to_string());
            }
            child_keys.push(key.to_string());
        }

        // One batched query covers every requested key.
        let filter = FieldFilter::any_of(
            &link.parent_key_field,
            keys.iter().map(|k| FieldValue::from(k.as_str())).collect(),
        );
        let existing = self.store.query(&link.parent_kind, &[filter])?;
        let mut index = KeyIndex::build(&existing, &link.parent_key_field);

        let missing: Vec<String> = keys.iter().filter(|k| !index.contains(k)).cloned().collect();
        debug!(
            children = children.len(),
            distinct_keys = keys.len(),
            existing = index.len(),
            missing = missing.len(),
            parent_kind = %link.parent_kind,
            "reconciling children against parents"
        );

        let created_parents = if missing.is_empty() {
            Vec::new()
        } else {
            let new_parents: Vec<Record> = missing
                .iter()
                .map(|key| {
                    Record::new(link.parent_kind.clone())
                        .field(&link.parent_key_field, key.as_str())
                })
                .collect();

            // All-new records: the upserter submits them as one insert.
            let results = self.upserter.upsert(new_parents)?;

            let mut created = Vec::with_capacity(missing.len());
            let mut failures = Vec::new();
            for (key, result) in missing.iter().zip(results) {
                match result {
                    Ok(id) => {
                        index.insert_first_wins(key.clone(), id);
                        created.push(id);
                    }
                    Err(err) => failures.push((key.clone(), err)),
                }
            }

            if !failures.is_empty() {
                return Err(ReconcileError::ParentCreation { failures });
            }
            created
        };

        for (child, key) in children.iter_mut().zip(child_keys) {
            let Some(parent_id) = index.get(&key) else {
                return Err(ReconcileError::UnresolvedParent {
                    field: link.child_key_field.clone(),
                    key,
                });
            };

            trace!(key = %key, parent = %parent_id, "binding child to parent");
            child.set(&link.reference_field, parent_id);
        }

        Ok(Reconciliation {
            children,
            created_parents,
        })
    }

    /// Reconciles and then persists the staged children in one go.
    ///
    /// Equivalent to [`reconcile`](Self::reconcile) followed by
    /// [`BatchUpserter::upsert`]. The two steps are not atomic: parents may
    /// exist even when the child upsert reports failures.
    ///
    /// # Errors
    /// See [`reconcile`](Self::reconcile); additionally surfaces the
    /// store's error when the child upsert call fails as a whole.
    pub fn reconcile_and_upsert(
        &self,
        children: Vec<Record>,
        link: &ParentLink,
    ) -> ReconcileResult<(Reconciliation, Vec<BatchResult>)> {
        let reconciliation = self.reconcile(children, link)?;
        let results = self.upserter.upsert(reconciliation.children.clone())?;
        Ok((reconciliation, results))
    }

    /// Single-record, natural-key upsert.
    ///
    /// One query decides the branch: a record of `kind` whose `key_field`
    /// equals `key_value` exists (first match wins on duplicates) or it
    /// does not. The found branch updates the record with the policy's
    /// `on_update` marker, preserving its identifier; the not-found branch
    /// inserts a new record carrying the key and the `on_create` marker.
    ///
    /// # Errors
    /// Store failures on either the query or the upsert; the per-record
    /// result of the single-row batch is unwrapped into the error.
    pub fn upsert_by_key(
        &self,
        kind: &RecordKind,
        key_field: &str,
        key_value: &str,
        marker: &MarkerPolicy,
    ) -> ReconcileResult<KeyedUpsert> {
        let found = self
            .store
            .query(kind, &[FieldFilter::equals(key_field, key_value)])?;

        let (record, outcome) = match found.into_iter().next() {
            Some(mut existing) => {
                existing.set(&marker.field, marker.on_update.as_str());
                (existing, UpsertOutcome::Updated)
            }
            None => {
                let fresh = Record::new(kind.clone())
                    .field(key_field, key_value)
                    .field(&marker.field, marker.on_create.as_str());
                (fresh, UpsertOutcome::Created)
            }
        };

        debug!(kind = %kind, key = key_value, ?outcome, "natural-key upsert");

        let results = self.upserter.upsert(vec![record])?;
        let id = match results.into_iter().next() {
            Some(Ok(id)) => id,
            Some(Err(err)) => return Err(err.into()),
            None => {
                return Err(StoreError::Backend(
                    "store returned no result for a single-record batch".to_string(),
                )
                .into())
            }
        };

        Ok(KeyedUpsert { id, outcome })
    }
}
