//! Lazily prepared result sequences.
//!
//! A [`LazyResults`] does no work until it is first pulled. The first pull
//! resolves every declared relation and opens the row cursor; later pulls
//! only build and hydrate one record each, without fetching.
//!
//! The sequence is forward-only and finite. Dropping it releases the cursor.
//! If preparation fails, the error is yielded once and the sequence ends.

use std::fmt;
use std::sync::Arc;

use futures::stream::{self, Stream, StreamExt};
use smol_str::SmolStr;

use crate::cache::RelationCache;
use crate::eager::{EagerContext, TraversalState};
use crate::error::QueryResult;
use crate::hydrate::Hydrator;
use crate::relations::RelationMaps;
use crate::row::Row;
use crate::traits::{Model, RowStream};

enum State {
    Unprepared(TraversalState),
    Prepared(Prepared),
    Finished,
}

struct Prepared {
    ctx: Arc<EagerContext>,
    model: SmolStr,
    rows: RowStream,
    maps: RelationMaps,
    cache: RelationCache,
}

impl Prepared {
    fn build(&self, row: &Row) -> QueryResult<Box<dyn Model>> {
        let mut record = self.ctx.factory().new_record(&self.model, row)?;
        Hydrator::new(&self.maps, &self.cache).hydrate(record.as_mut())?;
        Ok(record)
    }
}

impl TraversalState {
    async fn open(self) -> QueryResult<Prepared> {
        let maps = self.prepare().await?;
        let rows = self.source.open().await?;
        crate::gather_trace!(model = self.source.model(), relations = maps.len(), "Opened eager result cursor");

        Ok(Prepared {
            model: SmolStr::new(self.source.model()),
            ctx: self.ctx,
            rows,
            maps,
            cache: self.cache,
        })
    }
}

/// Records of an eager traversal, prepared on first pull.
pub struct LazyResults {
    state: State,
}

impl LazyResults {
    pub(crate) fn new(traversal: TraversalState) -> Self {
        Self {
            state: State::Unprepared(traversal),
        }
    }

    /// Whether the preparation step has already run.
    pub fn is_prepared(&self) -> bool {
        !matches!(self.state, State::Unprepared(_))
    }

    /// Pull the next hydrated record.
    ///
    /// Returns `None` once the cursor is exhausted or preparation failed.
    pub async fn next(&mut self) -> Option<QueryResult<Box<dyn Model>>> {
        loop {
            match std::mem::replace(&mut self.state, State::Finished) {
                State::Finished => return None,
                State::Unprepared(traversal) => match traversal.open().await {
                    Ok(prepared) => self.state = State::Prepared(prepared),
                    Err(e) => return Some(Err(e)),
                },
                State::Prepared(mut prepared) => {
                    let item = match prepared.rows.next().await {
                        None => return None,
                        Some(Ok(row)) => prepared.build(&row),
                        Some(Err(e)) => Err(e),
                    };
                    self.state = State::Prepared(prepared);
                    return Some(item);
                }
            }
        }
    }

    /// Convert into a `Stream` of hydrated records.
    pub fn into_stream(self) -> impl Stream<Item = QueryResult<Box<dyn Model>>> + Send {
        stream::unfold(self, |mut results| async move {
            results.next().await.map(|item| (item, results))
        })
    }

    /// Drain the sequence, stopping at the first error.
    pub async fn collect(mut self) -> QueryResult<Vec<Box<dyn Model>>> {
        let mut records = Vec::new();
        while let Some(record) = self.next().await {
            records.push(record?);
        }
        Ok(records)
    }
}

impl fmt::Debug for LazyResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            State::Unprepared(_) => "unprepared",
            State::Prepared(_) => "prepared",
            State::Finished => "finished",
        };
        f.debug_struct("LazyResults").field("state", &state).finish()
    }
}

#[cfg(test)]
mod tests {
    use futures::TryStreamExt;

    use super::*;
    use crate::config::{EagerConfig, UnknownRelationPolicy};
    use crate::eager::Eager;
    use crate::memory::MemorySource;
    use crate::relations::{ModelRelations, RelationRegistry, RelationSpec};

    fn setup(policy: UnknownRelationPolicy) -> (Arc<MemorySource>, Arc<EagerContext>) {
        let source = Arc::new(MemorySource::new());
        source.insert("User", Row::new().with("id", 10).with("name", "Ada"));
        source.insert("Post", Row::new().with("id", 1).with("author_id", 10));
        source.insert("Post", Row::new().with("id", 2).with("author_id", 10));

        let registry = RelationRegistry::new().with(
            ModelRelations::new("Post").relation(RelationSpec::one_to_one("author", "User", "author_id")),
        );
        let ctx = EagerContext::new(registry, source.clone(), source.clone())
            .with_config(EagerConfig::default().unknown_relations(policy))
            .unwrap();
        (source, Arc::new(ctx))
    }

    #[tokio::test]
    async fn test_prepares_on_first_pull_only() {
        let (source, ctx) = setup(UnknownRelationPolicy::Warn);
        let mut results = Eager::new(ctx, source.rows("Post"))
            .declare("author")
            .into_results();

        assert!(!results.is_prepared());
        assert_eq!(source.fetch_count(), 0);

        assert!(results.next().await.unwrap().is_ok());
        assert!(results.is_prepared());
        let after_first = source.fetch_count();
        assert_eq!(after_first, 2);

        assert!(results.next().await.unwrap().is_ok());
        assert!(results.next().await.is_none());
        assert!(results.next().await.is_none());
        assert_eq!(source.fetch_count(), after_first);
    }

    #[tokio::test]
    async fn test_failed_prepare_finishes() {
        let (source, ctx) = setup(UnknownRelationPolicy::Error);
        let mut results = Eager::new(ctx, source.rows("Post"))
            .declare("editor")
            .into_results();

        let err = results.next().await.unwrap().unwrap_err();
        assert!(err.is_unknown_relation());
        assert!(results.next().await.is_none());
    }

    #[tokio::test]
    async fn test_into_stream() {
        let (source, ctx) = setup(UnknownRelationPolicy::Warn);
        let records: Vec<_> = Eager::new(ctx, source.rows("Post"))
            .declare("author")
            .into_results()
            .into_stream()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_debug_shows_state() {
        let (source, ctx) = setup(UnknownRelationPolicy::Warn);
        let results = Eager::new(ctx, source.rows("Post")).into_results();
        assert_eq!(format!("{:?}", results), "LazyResults { state: \"unprepared\" }");
    }
}
