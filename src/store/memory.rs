//! In-memory store backend.
//!
//! This module provides a thread-safe in-memory implementation of
//! [`RecordStore`]. It is intended for embedded usage, tests, and as a
//! reference implementation of the adapter contract. It additionally counts
//! calls per operation so tests can assert round-trip budgets (one query
//! per reconcile, no inserts on an idempotent re-run).

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use chrono::Utc;

use crate::record::{Record, RecordId, RecordKind};
use crate::store::traits::{BatchResult, FieldFilter, RecordStore, StoreError};

fn lock_err(context: &'static str) -> StoreError {
    StoreError::Backend(format!("poisoned lock: {context}"))
}

#[derive(Debug, Default)]
struct StoreState {
    by_id: HashMap<RecordId, Record>,
    // Insertion-ordered ids per kind; keeps query results deterministic
    // for a given call sequence even though the contract is "unordered".
    by_kind: HashMap<RecordKind, Vec<RecordId>>,
}

/// Thread-safe in-memory record store.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    state: RwLock<StoreState>,
    query_calls: AtomicUsize,
    insert_batch_calls: AtomicUsize,
    update_batch_calls: AtomicUsize,
    delete_batch_calls: AtomicUsize,
}

impl InMemoryRecordStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `query` calls served so far.
    #[must_use]
    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::Relaxed)
    }

    /// Number of `insert_batch` calls served so far.
    #[must_use]
    pub fn insert_batch_calls(&self) -> usize {
        self.insert_batch_calls.load(Ordering::Relaxed)
    }

    /// Number of `update_batch` calls served so far.
    #[must_use]
    pub fn update_batch_calls(&self) -> usize {
        self.update_batch_calls.load(Ordering::Relaxed)
    }

    /// Number of `delete_batch` calls served so far.
    #[must_use]
    pub fn delete_batch_calls(&self) -> usize {
        self.delete_batch_calls.load(Ordering::Relaxed)
    }

    /// Total number of persisted records across all kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().map_or(0, |state| state.by_id.len())
    }

    /// Returns true if the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetch a single record by identifier (test/debug convenience).
    #[must_use]
    pub fn get(&self, id: RecordId) -> Option<Record> {
        self.state
            .read()
            .ok()
            .and_then(|state| state.by_id.get(&id).cloned())
    }
}

impl RecordStore for InMemoryRecordStore {
    fn query(&self, kind: &RecordKind, filters: &[FieldFilter]) -> Result<Vec<Record>, StoreError> {
        self.query_calls.fetch_add(1, Ordering::Relaxed);
        let state = self.state.read().map_err(|_| lock_err("store.query"))?;

        let Some(ids) = state.by_kind.get(kind) else {
            return Ok(Vec::new());
        };

        Ok(ids
            .iter()
            .filter_map(|id| state.by_id.get(id))
            .filter(|record| filters.iter().all(|f| f.matches(record)))
            .cloned()
            .collect())
    }

    fn insert_batch(&self, records: Vec<Record>) -> Result<Vec<BatchResult>, StoreError> {
        self.insert_batch_calls.fetch_add(1, Ordering::Relaxed);
        let mut state = self
            .state
            .write()
            .map_err(|_| lock_err("store.insert_batch"))?;

        let mut results = Vec::with_capacity(records.len());
        for mut record in records {
            // Callers may pre-assign identifiers (migrations, fixtures);
            // the normal path is store-assigned.
            let id = match record.id {
                Some(id) if state.by_id.contains_key(&id) => {
                    results.push(Err(StoreError::DuplicateId(id)));
                    continue;
                }
                Some(id) => id,
                None => RecordId::new(),
            };

            record.id = Some(id);
            let now = Utc::now();
            record.created_at = now;
            record.updated_at = now;

            state.by_kind.entry(record.kind.clone()).or_default().push(id);
            state.by_id.insert(id, record);
            results.push(Ok(id));
        }
        Ok(results)
    }

    fn update_batch(&self, records: Vec<Record>) -> Result<Vec<BatchResult>, StoreError> {
        self.update_batch_calls.fetch_add(1, Ordering::Relaxed);
        let mut state = self
            .state
            .write()
            .map_err(|_| lock_err("store.update_batch"))?;

        let mut results = Vec::with_capacity(records.len());
        for mut record in records {
            let Some(id) = record.id else {
                results.push(Err(StoreError::MissingId));
                continue;
            };

            let Some(existing) = state.by_id.get(&id) else {
                results.push(Err(StoreError::NotFound(id)));
                continue;
            };

            if existing.kind != record.kind {
                results.push(Err(StoreError::Rejected {
                    reason: format!(
                        "cannot change record kind from {} to {}",
                        existing.kind, record.kind
                    ),
                }));
                continue;
            }

            record.created_at = existing.created_at;
            record.touch();
            state.by_id.insert(id, record);
            results.push(Ok(id));
        }
        Ok(results)
    }

    fn delete_batch(&self, ids: &[RecordId]) -> Result<Vec<Result<(), StoreError>>, StoreError> {
        self.delete_batch_calls.fetch_add(1, Ordering::Relaxed);
        let mut state = self
            .state
            .write()
            .map_err(|_| lock_err("store.delete_batch"))?;

        let mut results = Vec::with_capacity(ids.len());
        for id in ids {
            match state.by_id.remove(id) {
                Some(removed) => {
                    if let Some(kind_ids) = state.by_kind.get_mut(&removed.kind) {
                        kind_ids.retain(|k| k != id);
                        if kind_ids.is_empty() {
                            state.by_kind.remove(&removed.kind);
                        }
                    }
                    results.push(Ok(()));
                }
                None => results.push(Err(StoreError::NotFound(*id))),
            }
        }
        Ok(results)
    }
}
