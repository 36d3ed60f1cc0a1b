//! Key-to-identifier indexing over query results.
//!
//! The reconciler never compares records pairwise. It builds a
//! [`ParentIndex`] over one batched query result and resolves every child
//! through it, turning the matching step into O(children + parents) hash
//! lookups.

use std::collections::HashMap;

use crate::record::{Record, RecordId};

/// Mapping from relation-key value to record identifier.
///
/// Invariant: at most one identifier per key value. When the underlying
/// query returns several records sharing a key (duplicate names in the
/// store), the first one seen wins. That is a deterministic policy choice,
/// not an error; see [`KeyIndex::build`].
///
/// Built fresh per reconciliation call and discarded afterwards; never
/// cached across calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParentIndex {
    by_key: HashMap<String, RecordId>,
}

impl ParentIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up the identifier for a key value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<RecordId> {
        self.by_key.get(key).copied()
    }

    /// Returns true if the key value is indexed.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    /// Number of distinct key values indexed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// Returns true if the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Inserts a key unless it is already present (first wins).
    ///
    /// Returns true if the entry was inserted.
    pub fn insert_first_wins(&mut self, key: impl Into<String>, id: RecordId) -> bool {
        let key = key.into();
        if self.by_key.contains_key(&key) {
            return false;
        }
        self.by_key.insert(key, id);
        true
    }

    /// Extends the index with `(key, id)` pairs, keeping existing entries
    /// on collision.
    pub fn extend_first_wins<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (String, RecordId)>,
    {
        for (key, id) in entries {
            self.insert_first_wins(key, id);
        }
    }
}

/// Builder of [`ParentIndex`] values from query results.
///
/// Pure function over its input; no store access, no side effects.
#[derive(Debug, Clone, Copy)]
pub struct KeyIndex;

impl KeyIndex {
    /// Builds a [`ParentIndex`] mapping each record's `key_field` value to
    /// its identifier.
    ///
    /// Key comparison is exact and case-sensitive; no normalization is
    /// performed. That is the documented matching contract, not a
    /// limitation to fix here.
    ///
    /// Records are consumed left to right. If two records share a key
    /// value, the first one encountered wins (stable policy). Records
    /// missing the key field, carrying a non-string key, or lacking an
    /// identifier are skipped: they cannot participate in matching.
    #[must_use]
    pub fn build(records: &[Record], key_field: &str) -> ParentIndex {
        let mut index = ParentIndex::new();
        for record in records {
            let Some(id) = record.id else {
                continue;
            };
            let Some(key) = record.key_string(key_field) else {
                continue;
            };
            index.insert_first_wins(key, id);
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordKind;

    fn parent(name: &str) -> Record {
        Record::with_id(RecordId::new(), RecordKind::Account).field("name", name)
    }

    #[test]
    fn build_maps_keys_to_identifiers() {
        let doe = parent("Doe");
        let jane = parent("Jane");
        let index = KeyIndex::build(&[doe.clone(), jane.clone()], "name");

        assert_eq!(index.len(), 2);
        assert_eq!(index.get("Doe"), doe.id);
        assert_eq!(index.get("Jane"), jane.id);
        assert_eq!(index.get("Smith"), None);
    }

    #[test]
    fn duplicate_keys_first_seen_wins() {
        let first = parent("Doe");
        let second = parent("Doe");
        let index = KeyIndex::build(&[first.clone(), second], "name");

        assert_eq!(index.len(), 1);
        assert_eq!(index.get("Doe"), first.id);
    }

    #[test]
    fn build_is_deterministic() {
        let records = vec![parent("Doe"), parent("Doe"), parent("Jane")];
        let a = KeyIndex::build(&records, "name");
        let b = KeyIndex::build(&records, "name");
        assert_eq!(a, b);
    }

    #[test]
    fn keys_are_case_sensitive() {
        let upper = parent("Doe");
        let lower = parent("doe");
        let index = KeyIndex::build(&[upper.clone(), lower.clone()], "name");

        assert_eq!(index.len(), 2);
        assert_eq!(index.get("Doe"), upper.id);
        assert_eq!(index.get("doe"), lower.id);
    }

    #[test]
    fn unusable_records_are_skipped() {
        let no_id = Record::new(RecordKind::Account).field("name", "Ghost");
        let no_key = Record::with_id(RecordId::new(), RecordKind::Account);
        let non_string = Record::with_id(RecordId::new(), RecordKind::Account).field("name", 7i64);
        let good = parent("Doe");

        let index = KeyIndex::build(&[no_id, no_key, non_string, good.clone()], "name");
        assert_eq!(index.len(), 1);
        assert_eq!(index.get("Doe"), good.id);
    }

    #[test]
    fn extend_first_wins_keeps_existing_entries() {
        let existing = RecordId::new();
        let late = RecordId::new();
        let fresh = RecordId::new();

        let mut index = ParentIndex::new();
        assert!(index.insert_first_wins("Doe", existing));

        index.extend_first_wins(vec![
            ("Doe".to_string(), late),
            ("Jane".to_string(), fresh),
        ]);

        assert_eq!(index.get("Doe"), Some(existing));
        assert_eq!(index.get("Jane"), Some(fresh));
    }
}
