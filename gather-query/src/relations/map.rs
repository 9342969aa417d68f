//! Resolved links from primary records to related records.

use std::collections::HashMap;

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::row::RecordId;

/// Single-valued links of one relation.
#[derive(Debug, Clone, Default)]
pub struct OneMap {
    /// Related model.
    pub target: SmolStr,
    links: HashMap<RecordId, RecordId>,
}

impl OneMap {
    /// Create an empty map.
    pub fn new(target: impl Into<SmolStr>) -> Self {
        Self {
            target: target.into(),
            links: HashMap::new(),
        }
    }

    /// Link a primary record to its related record.
    pub fn insert(&mut self, primary: RecordId, related: RecordId) {
        self.links.insert(primary, related);
    }

    /// Related ID of a primary record.
    pub fn get(&self, primary: RecordId) -> Option<RecordId> {
        self.links.get(&primary).copied()
    }

    /// Number of linked primary records.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Whether nothing is linked.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// Collection links of one relation.
#[derive(Debug, Clone, Default)]
pub struct ManyMap {
    /// Related model.
    pub target: SmolStr,
    links: HashMap<RecordId, Vec<RecordId>>,
}

impl ManyMap {
    /// Create a map where every primary ID starts with an empty list.
    pub fn with_owners(target: impl Into<SmolStr>, owners: &[RecordId]) -> Self {
        Self {
            target: target.into(),
            links: owners.iter().map(|id| (*id, Vec::new())).collect(),
        }
    }

    /// Append a related ID to an owner's list.
    pub fn push(&mut self, owner: RecordId, related: RecordId) {
        self.links.entry(owner).or_default().push(related);
    }

    /// Related IDs of a primary record, in fetch order.
    pub fn get(&self, primary: RecordId) -> &[RecordId] {
        self.links.get(&primary).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of primary records with an entry.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// All maps produced by one preparation, one bucket per relation type.
#[derive(Debug, Clone, Default)]
pub struct RelationMaps {
    /// One-to-one maps by relation name.
    pub one_to_one: IndexMap<SmolStr, OneMap>,
    /// One-to-many maps by relation name.
    pub one_to_many: IndexMap<SmolStr, ManyMap>,
    /// Many-to-many maps by relation name.
    pub many_to_many: IndexMap<SmolStr, ManyMap>,
}

impl RelationMaps {
    /// Number of resolved relations.
    pub fn len(&self) -> usize {
        self.one_to_one.len() + self.one_to_many.len() + self.many_to_many.len()
    }

    /// Whether no relation was resolved.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
