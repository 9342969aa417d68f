//! Per-traversal cache of related records.
//!
//! The cache maps `(model, id)` to a shared record. It is created with a
//! traversal and handed to every derived or nested traversal, so a record
//! reached through several paths is fetched once and every owner hydrated
//! afterwards holds the same `Arc`.
//!
//! Each entry remembers the row it was built from and the nested paths
//! resolved on it. When a later path needs more nested relations on a cached
//! record, the loader rebuilds it from the cached row and the entry is
//! replaced; entries are never removed.
//!
//! ```rust
//! use gather_query::cache::RelationCache;
//! use gather_query::row::RecordId;
//!
//! let cache = RelationCache::new();
//! let shared = cache.clone();
//! assert!(cache.ptr_eq(&shared));
//! assert!(cache.get("User", RecordId(1)).is_none());
//! assert!(!cache.contains("User", RecordId(1)));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use smol_str::SmolStr;

use crate::relations::{RelationPath, merge_paths};
use crate::row::{RecordId, Row};
use crate::traits::ModelRef;

/// Key of a cached record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Model of the record.
    pub model: SmolStr,
    /// Primary key of the record.
    pub id: RecordId,
}

impl CacheKey {
    /// Create a new key.
    pub fn new(model: impl Into<SmolStr>, id: RecordId) -> Self {
        Self {
            model: model.into(),
            id,
        }
    }
}

/// Statistics about cache usage.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of lookups that found a record.
    pub hits: u64,
    /// Number of lookups that found nothing.
    pub misses: u64,
    /// Number of records inserted under a new key.
    pub insertions: u64,
    /// Number of records replaced by a copy carrying more nested relations.
    pub refreshes: u64,
}

impl CacheStats {
    /// Calculate the hit rate.
    #[inline]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// How far a cached record satisfies a set of nested paths.
#[derive(Debug)]
pub(crate) enum Coverage {
    /// Nothing cached under the key.
    Missing,
    /// Cached with every wanted path resolved.
    Covered,
    /// Cached, but some wanted paths are not resolved on it.
    Partial {
        /// Row the cached record was built from.
        row: Row,
        /// Paths already resolved on the cached record.
        resolved: Vec<RelationPath>,
    },
}

struct CacheEntry {
    record: ModelRef,
    row: Option<Row>,
    resolved: Vec<RelationPath>,
}

impl CacheEntry {
    fn covers(&self, wanted: &[RelationPath]) -> bool {
        wanted
            .iter()
            .all(|path| self.resolved.iter().any(|done| done.starts_with(path)))
    }
}

#[derive(Default)]
struct CacheInner {
    records: RwLock<HashMap<CacheKey, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
    insertions: AtomicU64,
    refreshes: AtomicU64,
}

/// Shared store of related records, keyed by model and ID.
///
/// Cloning is cheap and yields a handle to the same store.
#[derive(Clone, Default)]
pub struct RelationCache {
    inner: Arc<CacheInner>,
}

impl RelationCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a record.
    pub fn get(&self, model: &str, id: RecordId) -> Option<ModelRef> {
        let found = self
            .inner
            .records
            .read()
            .get(&CacheKey::new(model, id))
            .map(|entry| Arc::clone(&entry.record));

        let counter = if found.is_some() {
            &self.inner.hits
        } else {
            &self.inner.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Check for a record without touching the statistics.
    pub fn contains(&self, model: &str, id: RecordId) -> bool {
        self.inner
            .records
            .read()
            .contains_key(&CacheKey::new(model, id))
    }

    /// Insert a record unless one is already cached under the same key.
    ///
    /// Returns the cached instance, which is the existing one if present.
    /// Records inserted this way carry no source row and are never refreshed.
    pub fn insert(&self, model: &str, id: RecordId, record: ModelRef) -> ModelRef {
        let mut records = self.inner.records.write();
        let entry = records.entry(CacheKey::new(model, id)).or_insert_with(|| {
            self.inner.insertions.fetch_add(1, Ordering::Relaxed);
            CacheEntry {
                record,
                row: None,
                resolved: Vec::new(),
            }
        });
        Arc::clone(&entry.record)
    }

    /// Classify a cached record against the nested paths a caller needs.
    ///
    /// Entries without a source row count as covered since they cannot be
    /// rebuilt.
    pub(crate) fn coverage(&self, model: &str, id: RecordId, wanted: &[RelationPath]) -> Coverage {
        let records = self.inner.records.read();
        let Some(entry) = records.get(&CacheKey::new(model, id)) else {
            return Coverage::Missing;
        };
        match &entry.row {
            Some(row) if !entry.covers(wanted) => Coverage::Partial {
                row: row.clone(),
                resolved: entry.resolved.clone(),
            },
            _ => Coverage::Covered,
        }
    }

    /// Store a record built from `row` with `resolved` nested paths.
    ///
    /// An existing entry that already covers `resolved` wins. Otherwise the
    /// new record replaces it and the entry remembers the union of both path
    /// sets. Returns the cached instance.
    pub(crate) fn store(
        &self,
        model: &str,
        row: Row,
        record: ModelRef,
        resolved: Vec<RelationPath>,
    ) -> ModelRef {
        let key = CacheKey::new(model, record.id());
        let mut records = self.inner.records.write();

        if let Some(entry) = records.get_mut(&key) {
            if entry.covers(&resolved) {
                return Arc::clone(&entry.record);
            }
            let mut merged = resolved;
            merge_paths(&mut merged, entry.resolved.drain(..));
            entry.record = Arc::clone(&record);
            entry.row = Some(row);
            entry.resolved = merged;
            self.inner.refreshes.fetch_add(1, Ordering::Relaxed);
            return record;
        }

        self.inner.insertions.fetch_add(1, Ordering::Relaxed);
        records.insert(
            key,
            CacheEntry {
                record: Arc::clone(&record),
                row: Some(row),
                resolved,
            },
        );
        record
    }

    /// Number of cached records.
    pub fn len(&self) -> usize {
        self.inner.records.read().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.records.read().is_empty()
    }

    /// Number of cached records of one model.
    pub fn count_model(&self, model: &str) -> usize {
        self.inner
            .records
            .read()
            .keys()
            .filter(|key| key.model == model)
            .count()
    }

    /// Snapshot of the usage statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
            insertions: self.inner.insertions.load(Ordering::Relaxed),
            refreshes: self.inner.refreshes.load(Ordering::Relaxed),
        }
    }

    /// Whether two handles point to the same store.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for RelationCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationCache")
            .field("len", &self.len())
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Model;
    use pretty_assertions::assert_eq;

    #[derive(Debug)]
    struct Tag(i64);

    impl Model for Tag {
        fn model_name(&self) -> &str {
            "Tag"
        }

        fn id(&self) -> RecordId {
            RecordId(self.0)
        }

        fn set_relation(&mut self, _name: &str, _record: ModelRef) {}
    }

    #[test]
    fn test_insert_keeps_first_instance() {
        let cache = RelationCache::new();
        let first: ModelRef = Arc::new(Tag(1));
        let second: ModelRef = Arc::new(Tag(1));

        let stored = cache.insert("Tag", RecordId(1), Arc::clone(&first));
        assert!(Arc::ptr_eq(&stored, &first));

        let stored = cache.insert("Tag", RecordId(1), second);
        assert!(Arc::ptr_eq(&stored, &first));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().insertions, 1);
    }

    #[test]
    fn test_keys_are_per_model() {
        let cache = RelationCache::new();
        cache.insert("Tag", RecordId(1), Arc::new(Tag(1)));

        assert!(cache.contains("Tag", RecordId(1)));
        assert!(!cache.contains("User", RecordId(1)));
        assert_eq!(cache.count_model("Tag"), 1);
        assert_eq!(cache.count_model("User"), 0);
    }

    fn paths(list: &[&str]) -> Vec<RelationPath> {
        list.iter().map(|p| RelationPath::parse(p)).collect()
    }

    #[test]
    fn test_coverage_by_path_prefix() {
        let cache = RelationCache::new();
        let row = Row::new().with("id", 1);
        cache.store("Tag", row, Arc::new(Tag(1)), paths(&["owner.company"]));

        assert!(matches!(cache.coverage("Tag", RecordId(2), &[]), Coverage::Missing));
        assert!(matches!(cache.coverage("Tag", RecordId(1), &[]), Coverage::Covered));
        assert!(matches!(
            cache.coverage("Tag", RecordId(1), &paths(&["owner"])),
            Coverage::Covered
        ));
        match cache.coverage("Tag", RecordId(1), &paths(&["owner", "creator"])) {
            Coverage::Partial { row, resolved } => {
                assert_eq!(row.get("id"), Some(&crate::row::Value::from(1)));
                assert_eq!(resolved, paths(&["owner.company"]));
            }
            other => panic!("expected partial coverage, got {:?}", other),
        }
    }

    #[test]
    fn test_inserted_without_row_is_covered() {
        let cache = RelationCache::new();
        cache.insert("Tag", RecordId(1), Arc::new(Tag(1)));
        assert!(matches!(
            cache.coverage("Tag", RecordId(1), &paths(&["owner"])),
            Coverage::Covered
        ));
    }

    #[test]
    fn test_store_refreshes_partial_entry() {
        let cache = RelationCache::new();
        let bare: ModelRef = Arc::new(Tag(1));
        let rich: ModelRef = Arc::new(Tag(1));
        let row = Row::new().with("id", 1);

        let stored = cache.store("Tag", row.clone(), Arc::clone(&bare), Vec::new());
        assert!(Arc::ptr_eq(&stored, &bare));

        let stored = cache.store("Tag", row.clone(), Arc::clone(&rich), paths(&["owner"]));
        assert!(Arc::ptr_eq(&stored, &rich));
        assert!(Arc::ptr_eq(&cache.get("Tag", RecordId(1)).unwrap(), &rich));

        // Covered now, so a bare copy does not displace it
        let stored = cache.store("Tag", row, Arc::new(Tag(1)), Vec::new());
        assert!(Arc::ptr_eq(&stored, &rich));

        let stats = cache.stats();
        assert_eq!((stats.insertions, stats.refreshes), (1, 1));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clone_shares_store() {
        let cache = RelationCache::new();
        let handle = cache.clone();
        handle.insert("Tag", RecordId(5), Arc::new(Tag(5)));

        assert!(cache.ptr_eq(&handle));
        assert!(cache.get("Tag", RecordId(5)).is_some());
        assert!(cache.get("Tag", RecordId(6)).is_none());

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
        assert!(!RelationCache::new().ptr_eq(&cache));
    }
}
