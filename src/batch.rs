//! Order-preserving batch upserts.
//!
//! A staged batch usually mixes records that already exist (update) with
//! records that do not (insert). [`BatchUpserter`] splits the batch into at
//! most two store calls and scatters per-record results back into input
//! order, so `result[i]` always corresponds to `input[i]`.

use std::sync::Arc;

use tracing::debug;

use crate::record::{Record, RecordId};
use crate::store::{BatchResult, RecordStore, StoreError};

/// Routes staged records to insert or update and submits them in bulk.
///
/// No retries are performed here: per-record failures are passed through
/// unaggregated, and remediation is the caller's decision.
pub struct BatchUpserter {
    store: Arc<dyn RecordStore>,
}

impl BatchUpserter {
    /// Creates an upserter over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Upserts a batch, routing by identifier presence.
    ///
    /// Records carrying an identifier are updated; records without one are
    /// inserted. The result sequence preserves input order.
    ///
    /// # Errors
    /// Returns the store's error when a whole sub-batch call fails.
    /// Per-record failures are returned inside the result list instead.
    pub fn upsert(&self, records: Vec<Record>) -> Result<Vec<BatchResult>, StoreError> {
        self.upsert_with(records, |record| record.id)
    }

    /// Upserts a batch, deciding correspondence through `match_fn`.
    ///
    /// For each record, `match_fn` returns the identifier of the existing
    /// record it corresponds to, or `None` when the record is new. Matched
    /// records have that identifier assigned and are routed to update;
    /// unmatched records have any stale identifier cleared and are routed
    /// to insert, where the store assigns a fresh one.
    ///
    /// # Errors
    /// Returns the store's error when a whole sub-batch call fails.
    pub fn upsert_with<F>(
        &self,
        records: Vec<Record>,
        match_fn: F,
    ) -> Result<Vec<BatchResult>, StoreError>
    where
        F: Fn(&Record) -> Option<RecordId>,
    {
        let total = records.len();
        let mut updates = Vec::new();
        let mut update_slots = Vec::new();
        let mut inserts = Vec::new();
        let mut insert_slots = Vec::new();

        for (slot, mut record) in records.into_iter().enumerate() {
            match match_fn(&record) {
                Some(id) => {
                    record.id = Some(id);
                    update_slots.push(slot);
                    updates.push(record);
                }
                None => {
                    record.id = None;
                    insert_slots.push(slot);
                    inserts.push(record);
                }
            }
        }

        debug!(
            total,
            inserts = inserts.len(),
            updates = updates.len(),
            "splitting upsert batch"
        );

        let mut merged: Vec<Option<BatchResult>> = (0..total).map(|_| None).collect();

        if !inserts.is_empty() {
            let expected = inserts.len();
            let results = self.store.insert_batch(inserts)?;
            scatter(&mut merged, &insert_slots, results, expected, "insert")?;
        }

        if !updates.is_empty() {
            let expected = updates.len();
            let results = self.store.update_batch(updates)?;
            scatter(&mut merged, &update_slots, results, expected, "update")?;
        }

        // Every slot was assigned exactly once by construction.
        Ok(merged.into_iter().map(Option::unwrap).collect())
    }
}

fn scatter(
    merged: &mut [Option<BatchResult>],
    slots: &[usize],
    results: Vec<BatchResult>,
    expected: usize,
    op: &str,
) -> Result<(), StoreError> {
    if results.len() != expected {
        return Err(StoreError::Backend(format!(
            "store returned {} results for a {op} batch of {expected}",
            results.len()
        )));
    }
    for (slot, result) in slots.iter().zip(results) {
        merged[*slot] = Some(result);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordKind;
    use crate::store::{FieldFilter, InMemoryRecordStore};

    fn contact(name: &str) -> Record {
        Record::new(RecordKind::Contact).field("last_name", name)
    }

    #[test]
    fn all_new_records_are_inserted() {
        let store = Arc::new(InMemoryRecordStore::new());
        let upserter = BatchUpserter::new(store.clone());

        let results = upserter
            .upsert(vec![contact("Doe"), contact("Jane")])
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(Result::is_ok));
        assert_eq!(store.insert_batch_calls(), 1);
        assert_eq!(store.update_batch_calls(), 0);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn mixed_batch_preserves_input_order() {
        let store = Arc::new(InMemoryRecordStore::new());
        let seeded = store.insert_batch(vec![contact("Existing")]).unwrap();
        let existing_id = *seeded[0].as_ref().unwrap();

        let mut existing = store.get(existing_id).unwrap();
        existing.set("last_name", "Renamed");

        // Order: new, existing, new. result[i] must map back to input[i].
        let batch = vec![contact("First"), existing, contact("Last")];
        let upserter = BatchUpserter::new(store.clone());
        let results = upserter.upsert(batch).unwrap();

        assert_eq!(results.len(), 3);
        let first = *results[0].as_ref().unwrap();
        let middle = *results[1].as_ref().unwrap();
        let last = *results[2].as_ref().unwrap();

        assert_eq!(middle, existing_id);
        assert_eq!(
            store.get(first).unwrap().key_string("last_name"),
            Some("First")
        );
        assert_eq!(
            store.get(middle).unwrap().key_string("last_name"),
            Some("Renamed")
        );
        assert_eq!(
            store.get(last).unwrap().key_string("last_name"),
            Some("Last")
        );

        // One call per sub-batch, not one per record.
        assert_eq!(store.insert_batch_calls(), 2); // seed + upsert
        assert_eq!(store.update_batch_calls(), 1);
    }

    #[test]
    fn per_record_failures_pass_through_in_order() {
        let store = Arc::new(InMemoryRecordStore::new());
        let upserter = BatchUpserter::new(store.clone());

        // An update for a record the store has never seen fails per-record
        // while the neighboring insert succeeds.
        let ghost = Record::with_id(RecordId::new(), RecordKind::Contact).field("last_name", "Ghost");
        let results = upserter.upsert(vec![contact("Doe"), ghost]).unwrap();

        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(StoreError::NotFound(_))));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn match_fn_routes_and_assigns_identifiers() {
        let store = Arc::new(InMemoryRecordStore::new());
        let seeded = store.insert_batch(vec![contact("Doe")]).unwrap();
        let doe_id = *seeded[0].as_ref().unwrap();

        let upserter = BatchUpserter::new(store.clone());

        // Match by natural key rather than identifier presence.
        let results = upserter
            .upsert_with(vec![contact("Doe"), contact("Jane")], |record| {
                (record.key_string("last_name") == Some("Doe")).then_some(doe_id)
            })
            .unwrap();

        assert_eq!(*results[0].as_ref().unwrap(), doe_id);
        assert_ne!(*results[1].as_ref().unwrap(), doe_id);
        assert_eq!(store.len(), 2);

        let does = store
            .query(
                &RecordKind::Contact,
                &[FieldFilter::equals("last_name", "Doe")],
            )
            .unwrap();
        assert_eq!(does.len(), 1); // updated, not duplicated
    }

    #[test]
    fn unmatched_records_lose_stale_identifiers() {
        let store = Arc::new(InMemoryRecordStore::new());
        let upserter = BatchUpserter::new(store.clone());

        let stale = Record::with_id(RecordId::new(), RecordKind::Contact).field("last_name", "Doe");
        let stale_id = stale.id;

        let results = upserter.upsert_with(vec![stale], |_| None).unwrap();
        let assigned = *results[0].as_ref().unwrap();
        assert_ne!(Some(assigned), stale_id); // store assigned a fresh one
    }

    #[test]
    fn empty_batch_touches_nothing() {
        let store = Arc::new(InMemoryRecordStore::new());
        let upserter = BatchUpserter::new(store.clone());

        let results = upserter.upsert(Vec::new()).unwrap();
        assert!(results.is_empty());
        assert_eq!(store.insert_batch_calls(), 0);
        assert_eq!(store.update_batch_calls(), 0);
    }
}
