use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use log::debug;

use crate::error::{DbError, DbResult};
use crate::storage::row::Value;

/// Stable identifier of a row within its table.
pub type RowId = usize;

/// Index key wrapper giving `Value` the total order of `Value::total_cmp`.
#[derive(Debug, Clone)]
pub struct IndexKey(pub Value);

impl PartialEq for IndexKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for IndexKey {}

impl PartialOrd for IndexKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IndexKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Per-column index mapping a key to the set of row ids holding it.
///
/// NULL keys are never stored, so a unique index admits any number of
/// NULL rows and lookups never return them.
#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    pub name: String,
    pub table: String,
    pub column: String,
    pub unique: bool,
    entries: BTreeMap<IndexKey, BTreeSet<RowId>>,
}

impl Index {
    pub fn new(name: &str, table: &str, column: &str, unique: bool) -> Self {
        Index {
            name: name.to_string(),
            table: table.to_string(),
            column: column.to_string(),
            unique,
            entries: BTreeMap::new(),
        }
    }

    pub fn add(&mut self, key: &Value, row_id: RowId) -> DbResult<()> {
        if key.is_null() {
            return Ok(());
        }
        let ids = self.entries.entry(IndexKey(key.clone())).or_default();
        if self.unique && ids.iter().any(|&id| id != row_id) {
            return Err(DbError::DuplicateKey {
                column: self.column.clone(),
                value: key.to_string(),
            });
        }
        ids.insert(row_id);
        Ok(())
    }

    /// Removing an absent pair is a no-op.
    pub fn remove(&mut self, key: &Value, row_id: RowId) {
        let probe = IndexKey(key.clone());
        if let Some(ids) = self.entries.get_mut(&probe) {
            ids.remove(&row_id);
            if ids.is_empty() {
                self.entries.remove(&probe);
            }
        }
    }

    pub fn find(&self, key: &Value) -> BTreeSet<RowId> {
        if key.is_null() {
            return BTreeSet::new();
        }
        self.entries
            .get(&IndexKey(key.clone()))
            .cloned()
            .unwrap_or_default()
    }

    /// Range lookup with independently open, closed or absent bounds.
    pub fn find_range(&self, low: Bound<&Value>, high: Bound<&Value>) -> BTreeSet<RowId> {
        let low = map_bound(low);
        let high = map_bound(high);
        if range_is_empty(&low, &high) {
            return BTreeSet::new();
        }
        let ids: BTreeSet<RowId> = self
            .entries
            .range((low, high))
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect();
        debug!("index '{}' range lookup matched {} rows", self.name, ids.len());
        ids
    }

    /// Inclusive range lookup; either bound may be omitted.
    pub fn find_between(&self, low: Option<&Value>, high: Option<&Value>) -> BTreeSet<RowId> {
        self.find_range(
            low.map_or(Bound::Unbounded, Bound::Included),
            high.map_or(Bound::Unbounded, Bound::Included),
        )
    }

    /// Number of (key, row id) pairs stored.
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

fn map_bound(bound: Bound<&Value>) -> Bound<IndexKey> {
    match bound {
        Bound::Included(v) => Bound::Included(IndexKey(v.clone())),
        Bound::Excluded(v) => Bound::Excluded(IndexKey(v.clone())),
        Bound::Unbounded => Bound::Unbounded,
    }
}

// BTreeMap::range panics on inverted bounds, so those are answered here.
fn range_is_empty(low: &Bound<IndexKey>, high: &Bound<IndexKey>) -> bool {
    match (low, high) {
        (Bound::Included(l), Bound::Included(h)) => l > h,
        (Bound::Included(l), Bound::Excluded(h))
        | (Bound::Excluded(l), Bound::Included(h))
        | (Bound::Excluded(l), Bound::Excluded(h)) => l >= h,
        _ => false,
    }
}
