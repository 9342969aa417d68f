//! Eager loading traversals.
//!
//! An [`Eager`] wraps any [`RowSource`] together with a set of declared
//! relation paths. Nothing is fetched until the first record is pulled from
//! its [`LazyResults`]; that pull resolves every declared relation with a
//! bounded number of batched fetches.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use gather_query::prelude::*;
//!
//! let ctx = Arc::new(EagerContext::new(registry, source.clone(), source.clone()));
//! let posts = Eager::new(Arc::clone(&ctx), source.rows("Post"))
//!     .declare(["author.company", "tags"])
//!     .collect()
//!     .await?;
//! ```

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::cache::RelationCache;
use crate::config::EagerConfig;
use crate::error::{QueryError, QueryResult};
use crate::lazy::LazyResults;
use crate::memory::RowSet;
use crate::relations::loader::BatchFetcher;
use crate::relations::{IntoRelationPaths, RelationMaps, RelationPath, RelationPlan, merge_paths};
use crate::traits::{BoxFuture, MetadataProvider, Model, RecordFactory, RelationSource, RowSource};

/// Collaborators and settings shared by every traversal.
pub struct EagerContext {
    metadata: Arc<dyn MetadataProvider>,
    source: Arc<dyn RelationSource>,
    factory: Arc<dyn RecordFactory>,
    config: EagerConfig,
}

impl EagerContext {
    /// Create a context with the default configuration.
    pub fn new(
        metadata: impl MetadataProvider + 'static,
        source: Arc<dyn RelationSource>,
        factory: Arc<dyn RecordFactory>,
    ) -> Self {
        Self {
            metadata: Arc::new(metadata),
            source,
            factory,
            config: EagerConfig::default(),
        }
    }

    /// Replace the configuration after validating it.
    pub fn with_config(mut self, config: EagerConfig) -> QueryResult<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// The active configuration.
    pub fn config(&self) -> &EagerConfig {
        &self.config
    }

    /// Relation metadata.
    pub fn metadata(&self) -> &dyn MetadataProvider {
        self.metadata.as_ref()
    }

    /// Source of related rows.
    pub fn source(&self) -> &dyn RelationSource {
        self.source.as_ref()
    }

    /// Factory for records.
    pub fn factory(&self) -> &dyn RecordFactory {
        self.factory.as_ref()
    }

    /// Primary key column of `model`.
    pub fn primary_key(&self, model: &str) -> &str {
        self.metadata.primary_key(model)
    }
}

impl fmt::Debug for EagerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EagerContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// A row source with declared relations to load eagerly.
pub struct Eager<S> {
    ctx: Arc<EagerContext>,
    source: Arc<S>,
    paths: Vec<RelationPath>,
    cache: RelationCache,
    depth: usize,
}

impl<S> Clone for Eager<S> {
    fn clone(&self) -> Self {
        Self {
            ctx: Arc::clone(&self.ctx),
            source: Arc::clone(&self.source),
            paths: self.paths.clone(),
            cache: self.cache.clone(),
            depth: self.depth,
        }
    }
}

impl<S: RowSource + 'static> Eager<S> {
    /// Wrap a row source with no declared relations.
    pub fn new(ctx: Arc<EagerContext>, source: S) -> Self {
        Self::from_shared(ctx, Arc::new(source))
    }

    /// Wrap an already shared row source.
    pub fn from_shared(ctx: Arc<EagerContext>, source: Arc<S>) -> Self {
        Self {
            ctx,
            source,
            paths: Vec::new(),
            cache: RelationCache::new(),
            depth: 0,
        }
    }

    /// Derive a traversal that also loads `paths`.
    ///
    /// The derived traversal keeps every path declared so far and shares this
    /// traversal's cache, so records already resolved are not fetched again.
    pub fn declare(&self, paths: impl IntoRelationPaths) -> Self {
        let mut derived = self.clone();
        merge_paths(&mut derived.paths, paths.into_relation_paths());
        derived
    }

    /// Declared paths, in declaration order.
    pub fn paths(&self) -> &[RelationPath] {
        &self.paths
    }

    /// The cache shared with derived traversals.
    pub fn cache(&self) -> &RelationCache {
        &self.cache
    }

    /// The wrapped row source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The context this traversal runs in.
    pub fn context(&self) -> &Arc<EagerContext> {
        &self.ctx
    }

    /// Turn into a lazy result sequence. Nothing is fetched yet.
    pub fn into_results(self) -> LazyResults {
        LazyResults::new(TraversalState {
            ctx: self.ctx,
            source: self.source,
            paths: self.paths,
            cache: self.cache,
            depth: self.depth,
        })
    }

    /// Resolve everything and collect the hydrated records.
    pub async fn collect(self) -> QueryResult<Vec<Box<dyn Model>>> {
        self.into_results().collect().await
    }
}

impl<S> fmt::Debug for Eager<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Eager")
            .field("paths", &self.paths)
            .field("depth", &self.depth)
            .field("cache", &self.cache)
            .finish()
    }
}

/// Everything a traversal needs to prepare, with the row source erased.
pub(crate) struct TraversalState {
    pub(crate) ctx: Arc<EagerContext>,
    pub(crate) source: Arc<dyn RowSource>,
    pub(crate) paths: Vec<RelationPath>,
    pub(crate) cache: RelationCache,
    pub(crate) depth: usize,
}

impl TraversalState {
    /// Resolve every declared relation into maps over the shared cache.
    pub(crate) async fn prepare(&self) -> QueryResult<RelationMaps> {
        let model = self.source.model();
        let config = self.ctx.config();

        if !self.paths.is_empty() && self.depth >= config.max_depth {
            return Err(QueryError::too_deep(config.max_depth).with_model(model));
        }

        let plan = RelationPlan::build(
            model,
            self.ctx.metadata().relations_of(model),
            &self.paths,
            config.unknown_relations,
        )?;
        if plan.is_empty() {
            debug!(model, depth = self.depth, "No relations to eager load");
            return Ok(RelationMaps::default());
        }

        let ids = self.source.ids().await?;
        if ids.is_empty() {
            debug!(model, depth = self.depth, "No primary records, skipping eager load");
            return Ok(RelationMaps::default());
        }

        debug!(
            model,
            depth = self.depth,
            records = ids.len(),
            one_to_one = plan.one_to_one.len(),
            one_to_many = plan.one_to_many.len(),
            many_to_many = plan.many_to_many.len(),
            "Preparing eager load"
        );

        let maps = BatchFetcher::new(&self.ctx, &self.cache, self.depth)
            .fetch(model, &ids, &plan)
            .await?;

        debug!(
            model,
            depth = self.depth,
            relations = maps.len(),
            cached = self.cache.len(),
            "Eager load prepared"
        );
        Ok(maps)
    }
}

/// Run a child traversal over already fetched related rows.
///
/// Boxed so that preparation can recurse into nested paths.
pub(crate) fn resolve_nested(
    ctx: Arc<EagerContext>,
    cache: RelationCache,
    depth: usize,
    rows: RowSet,
    paths: Vec<RelationPath>,
) -> BoxFuture<'static, QueryResult<Vec<Box<dyn Model>>>> {
    Box::pin(async move {
        let traversal = TraversalState {
            ctx,
            source: Arc::new(rows),
            paths,
            cache,
            depth,
        };
        LazyResults::new(traversal).collect().await
    })
}
