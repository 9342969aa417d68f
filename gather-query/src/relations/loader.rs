//! Batched fetching of related records.
//!
//! One [`BatchFetcher`] pass resolves every relation of a [`RelationPlan`]
//! for one batch of primary IDs. Fetch counts depend on the number of
//! relations and distinct IDs, never on the number of primary records:
//!
//! - one-to-one: a single key projection over the primary model, then the
//!   uncached foreign IDs fetched by ID
//! - one-to-many: one fetch over the related model by foreign key
//! - many-to-many: one join table projection, then the uncached child IDs
//!   fetched by ID
//!
//! By-ID fetches and owner-keyed fetches are split into chunks of at most
//! `chunk_size` IDs. A record already cached is never fetched by ID again;
//! when a later path needs more nested relations on it, it is rebuilt from
//! its cached row.

use std::slice::Chunks;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use smol_str::SmolStr;
use tracing::{debug, trace};

use crate::cache::{Coverage, RelationCache};
use crate::eager::{EagerContext, resolve_nested};
use crate::error::{QueryError, QueryResult};
use crate::memory::RowSet;
use crate::row::{RecordId, Row};

use super::map::{ManyMap, OneMap, RelationMaps};
use super::path::{RelationPath, merge_paths};
use super::plan::{RelationPlan, RelationRequest};

/// Resolves one relation plan against the relation source.
pub(crate) struct BatchFetcher<'a> {
    ctx: &'a Arc<EagerContext>,
    cache: &'a RelationCache,
    depth: usize,
}

impl<'a> BatchFetcher<'a> {
    pub(crate) fn new(ctx: &'a Arc<EagerContext>, cache: &'a RelationCache, depth: usize) -> Self {
        Self { ctx, cache, depth }
    }

    /// Resolve every relation in `plan` for the primary `ids` of `model`.
    ///
    /// Relation types run in order: one-to-one, one-to-many, many-to-many.
    pub(crate) async fn fetch(
        &self,
        model: &str,
        ids: &[RecordId],
        plan: &RelationPlan,
    ) -> QueryResult<RelationMaps> {
        let mut maps = RelationMaps::default();

        if !plan.one_to_one.is_empty() {
            maps.one_to_one = self.fetch_one_to_one(model, ids, &plan.one_to_one).await?;
        }

        for request in &plan.one_to_many {
            let map = self.fetch_one_to_many(ids, request).await?;
            maps.one_to_many.insert(request.spec.name.clone(), map);
        }

        for request in &plan.many_to_many {
            let map = self.fetch_many_to_many(ids, request).await?;
            maps.many_to_many.insert(request.spec.name.clone(), map);
        }

        Ok(maps)
    }

    async fn fetch_one_to_one(
        &self,
        model: &str,
        ids: &[RecordId],
        requests: &[RelationRequest],
    ) -> QueryResult<IndexMap<SmolStr, OneMap>> {
        let pk = self.ctx.primary_key(model);
        let mut fields = vec![pk];
        for request in requests {
            let key = request.spec.foreign_key.as_str();
            if !fields.contains(&key) {
                fields.push(key);
            }
        }

        // One key projection over every primary ID, shared by all one-to-one relations
        trace!(model, fields = ?fields, ids = ids.len(), depth = self.depth, "Projecting one-to-one keys");
        let rows = self.ctx.source().project_fields(model, &fields, ids).await?;

        let mut maps = IndexMap::with_capacity(requests.len());
        for request in requests {
            let spec = &request.spec;
            let target = spec.related_model.as_str();
            let mut map = OneMap::new(target);
            let mut foreign = IndexSet::new();

            for row in &rows {
                let id = row.id(model, pk)?;
                if let Some(foreign_id) = row.key(model, &spec.foreign_key)? {
                    map.insert(id, foreign_id);
                    foreign.insert(foreign_id);
                }
            }

            debug!(
                model,
                relation = %spec.name,
                linked = map.len(),
                unique = foreign.len(),
                "Resolving one-to-one relation"
            );
            self.resolve_ids(target, &foreign, &request.nested).await?;
            maps.insert(spec.name.clone(), map);
        }

        Ok(maps)
    }

    async fn fetch_one_to_many(
        &self,
        ids: &[RecordId],
        request: &RelationRequest,
    ) -> QueryResult<ManyMap> {
        let spec = &request.spec;
        let target = spec.related_model.as_str();
        let pk = self.ctx.primary_key(target);
        let mut map = ManyMap::with_owners(target, ids);

        for chunk in self.key_chunks(ids) {
            trace!(model = target, key = %spec.foreign_key, ids = chunk.len(), depth = self.depth, "Fetching by foreign key");
            let rows = self
                .ctx
                .source()
                .fetch_by_foreign_key(target, &spec.foreign_key, chunk)
                .await?;

            let mut links = Vec::with_capacity(rows.len());
            for row in &rows {
                let id = row.id(target, pk)?;
                if let Some(owner) = row.key(target, &spec.foreign_key)? {
                    links.push((owner, id));
                }
            }

            self.store(target, rows, &request.nested).await?;
            for (owner, id) in links {
                map.push(owner, id);
            }
        }

        debug!(relation = %spec.name, owners = map.len(), "Resolved one-to-many relation");
        Ok(map)
    }

    async fn fetch_many_to_many(
        &self,
        ids: &[RecordId],
        request: &RelationRequest,
    ) -> QueryResult<ManyMap> {
        let spec = &request.spec;
        let target = spec.related_model.as_str();
        let join = spec.join_table.as_ref().ok_or_else(|| {
            QueryError::internal(format!("many-to-many relation '{}' has no join table", spec.name))
                .with_relation(spec.name.as_str())
        })?;

        let mut map = ManyMap::with_owners(target, ids);
        let mut children = IndexSet::new();

        for chunk in self.key_chunks(ids) {
            trace!(table = %join.table_name, ids = chunk.len(), depth = self.depth, "Projecting join table");
            let pairs = self
                .ctx
                .source()
                .project_join(join, &join.source_column, chunk)
                .await?;

            for pair in pairs {
                map.push(pair.parent, pair.child);
                children.insert(pair.child);
            }
        }

        debug!(relation = %spec.name, unique = children.len(), "Resolving many-to-many relation");
        self.resolve_ids(target, &children, &request.nested).await?;
        Ok(map)
    }

    /// Make every record in `ids` cached with `nested` resolved on it.
    ///
    /// Uncached IDs are fetched by ID. Cached records missing some nested
    /// paths are rebuilt from their cached rows without another fetch.
    async fn resolve_ids(
        &self,
        target: &str,
        ids: &IndexSet<RecordId>,
        nested: &[RelationPath],
    ) -> QueryResult<()> {
        let mut missing = Vec::new();
        let mut partial = Vec::new();
        for id in ids {
            match self.cache.coverage(target, *id, nested) {
                Coverage::Missing => missing.push(*id),
                Coverage::Covered => {}
                Coverage::Partial { row, .. } => partial.push(row),
            }
        }

        debug!(
            model = target,
            to_fetch = missing.len(),
            to_refresh = partial.len(),
            depth = self.depth,
            "Resolving related ids"
        );

        for chunk in self.id_chunks(&missing) {
            trace!(model = target, ids = chunk.len(), depth = self.depth, "Fetching related records by id");
            let rows = self.ctx.source().fetch_by_ids(target, chunk).await?;
            self.store(target, rows, nested).await?;
        }
        self.store(target, partial, nested).await
    }

    /// Build and cache records for rows the cache does not cover yet.
    ///
    /// Uncached rows resolve `nested`. Rows cached without some of `nested`
    /// are rebuilt with the union of their resolved paths and `nested`, and
    /// replace the cached copy.
    async fn store(&self, target: &str, rows: Vec<Row>, nested: &[RelationPath]) -> QueryResult<()> {
        let pk = self.ctx.primary_key(target);
        let mut fresh = Vec::with_capacity(rows.len());
        let mut partial = Vec::new();
        let mut widened = nested.to_vec();

        for row in rows {
            match self.cache.coverage(target, row.id(target, pk)?, nested) {
                Coverage::Missing => fresh.push(row),
                Coverage::Covered => {}
                Coverage::Partial { resolved, .. } => {
                    merge_paths(&mut widened, resolved);
                    partial.push(row);
                }
            }
        }

        self.build(target, fresh, nested.to_vec()).await?;
        self.build(target, partial, widened).await
    }

    async fn build(&self, target: &str, rows: Vec<Row>, paths: Vec<RelationPath>) -> QueryResult<()> {
        if rows.is_empty() {
            return Ok(());
        }

        if paths.is_empty() {
            for row in rows {
                let record = self.ctx.factory().new_record(target, &row)?;
                self.cache.store(target, row, Arc::from(record), Vec::new());
            }
            return Ok(());
        }

        // Nested paths go through a child traversal so cached records carry their relations
        let set = RowSet::new(target, rows).with_primary_key(self.ctx.primary_key(target));
        let records = resolve_nested(
            Arc::clone(self.ctx),
            self.cache.clone(),
            self.depth + 1,
            set.clone(),
            paths.clone(),
        )
        .await?;

        for (row, record) in set.as_slice().iter().zip(records) {
            self.cache.store(target, row.clone(), Arc::from(record), paths.clone());
        }
        Ok(())
    }

    fn id_chunks<'b>(&self, ids: &'b [RecordId]) -> Chunks<'b, RecordId> {
        ids.chunks(self.ctx.config().chunk_size.max(1))
    }

    /// Batches for owner-keyed fetches, a single batch when chunking is off.
    fn key_chunks<'b>(&self, ids: &'b [RecordId]) -> Vec<&'b [RecordId]> {
        if ids.is_empty() || self.ctx.config().chunk_foreign_key_fetches {
            return self.id_chunks(ids).collect();
        }
        vec![ids]
    }
}
