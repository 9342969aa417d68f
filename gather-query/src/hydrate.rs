//! Attaching resolved relations to freshly built records.

use tracing::debug;

use crate::cache::RelationCache;
use crate::error::{QueryError, QueryResult};
use crate::relations::{ManyMap, RelationMaps};
use crate::row::RecordId;
use crate::traits::{Model, ModelRef};

/// Pure lookup step run on every record a prepared traversal yields.
#[derive(Debug, Clone, Copy)]
pub struct Hydrator<'a> {
    maps: &'a RelationMaps,
    cache: &'a RelationCache,
}

impl<'a> Hydrator<'a> {
    /// Create a hydrator over prepared maps.
    pub fn new(maps: &'a RelationMaps, cache: &'a RelationCache) -> Self {
        Self { maps, cache }
    }

    /// Attach every resolved relation to `record`.
    ///
    /// Related IDs missing from the cache are skipped. Fails with
    /// `MissingCapability` when a to-many relation targets a record without
    /// the multi-relation hook.
    pub fn hydrate(&self, record: &mut dyn Model) -> QueryResult<()> {
        let id = record.id();

        for (name, map) in &self.maps.one_to_one {
            let Some(related_id) = map.get(id) else {
                continue;
            };
            match self.cache.get(&map.target, related_id) {
                Some(related) => record.set_relation(name, related),
                None => debug!(
                    model = record.model_name(),
                    relation = %name,
                    related_id = related_id.get(),
                    "Related record missing from cache"
                ),
            }
        }

        for (name, map) in self.maps.one_to_many.iter().chain(&self.maps.many_to_many) {
            if record.multi_relation().is_none() {
                return Err(QueryError::missing_capability(record.model_name(), name.as_str())
                    .with_context("Hydrating eager loaded relations"));
            }

            let related = self.resolve(record.model_name(), name, map, id);
            if let Some(target) = record.multi_relation() {
                target.set_relation_many(name, related);
            }
        }

        Ok(())
    }

    fn resolve(&self, model: &str, name: &str, map: &ManyMap, id: RecordId) -> Vec<ModelRef> {
        let ids = map.get(id);
        let mut related = Vec::with_capacity(ids.len());
        for related_id in ids {
            match self.cache.get(&map.target, *related_id) {
                Some(record) => related.push(record),
                None => debug!(
                    model,
                    relation = name,
                    related_id = related_id.get(),
                    "Related record missing from cache"
                ),
            }
        }
        related
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use indexmap::IndexMap;

    use super::*;
    use crate::error::ErrorCode;
    use crate::relations::OneMap;
    use crate::traits::MultiRelation;

    #[derive(Debug, Default)]
    struct Post {
        id: i64,
        author: Option<ModelRef>,
        tags: Vec<ModelRef>,
    }

    impl Model for Post {
        fn model_name(&self) -> &str {
            "Post"
        }

        fn id(&self) -> RecordId {
            RecordId(self.id)
        }

        fn set_relation(&mut self, _name: &str, record: ModelRef) {
            self.author = Some(record);
        }

        fn multi_relation(&mut self) -> Option<&mut dyn MultiRelation> {
            Some(self)
        }
    }

    impl MultiRelation for Post {
        fn set_relation_many(&mut self, _name: &str, records: Vec<ModelRef>) {
            self.tags = records;
        }
    }

    #[derive(Debug)]
    struct Leaf(i64);

    impl Model for Leaf {
        fn model_name(&self) -> &str {
            "Leaf"
        }

        fn id(&self) -> RecordId {
            RecordId(self.0)
        }

        fn set_relation(&mut self, _name: &str, _record: ModelRef) {}
    }

    fn maps() -> RelationMaps {
        let mut author = OneMap::new("User");
        author.insert(RecordId(1), RecordId(10));
        author.insert(RecordId(2), RecordId(11));

        let mut tags = ManyMap::with_owners("Tag", &[RecordId(1), RecordId(2)]);
        tags.push(RecordId(1), RecordId(100));
        tags.push(RecordId(1), RecordId(999));

        RelationMaps {
            one_to_one: IndexMap::from([("author".into(), author)]),
            one_to_many: IndexMap::new(),
            many_to_many: IndexMap::from([("tags".into(), tags)]),
        }
    }

    #[test]
    fn test_hydrates_and_skips_misses() {
        let cache = RelationCache::new();
        let user: ModelRef = Arc::new(Leaf(10));
        cache.insert("User", RecordId(10), Arc::clone(&user));
        cache.insert("Tag", RecordId(100), Arc::new(Leaf(100)));

        let maps = maps();
        let hydrator = Hydrator::new(&maps, &cache);

        let mut first = Post { id: 1, ..Default::default() };
        hydrator.hydrate(&mut first).unwrap();
        assert!(Arc::ptr_eq(first.author.as_ref().unwrap(), &user));
        assert_eq!(first.tags.len(), 1);

        let mut second = Post { id: 2, ..Default::default() };
        hydrator.hydrate(&mut second).unwrap();
        assert!(second.author.is_none());
        assert!(second.tags.is_empty());
    }

    #[test]
    fn test_missing_capability() {
        let cache = RelationCache::new();
        let maps = maps();
        let err = Hydrator::new(&maps, &cache)
            .hydrate(&mut Leaf(1))
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::MissingCapability);
        assert_eq!(err.context.model.as_deref(), Some("Leaf"));
        assert_eq!(err.context.relation.as_deref(), Some("tags"));
    }
}
