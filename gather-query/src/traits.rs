//! Collaborator traits the eager loading engine depends on.
//!
//! The engine never talks to a database directly. It asks a [`RelationSource`]
//! for rows, a [`RecordFactory`] to turn rows into records, and a
//! [`MetadataProvider`] for relation descriptions. Records themselves are
//! [`Model`] trait objects that accept resolved relations.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::QueryResult;
use crate::relations::{JoinTableSpec, ModelRelations};
use crate::row::{JoinRow, RecordId, Row};

/// A boxed future for recursive async resolution.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A forward-only cursor over base rows.
pub type RowStream = BoxStream<'static, QueryResult<Row>>;

/// A shared, hydrated record.
pub type ModelRef = Arc<dyn Model>;

/// Primary key column used when metadata does not name one.
pub const DEFAULT_PRIMARY_KEY: &str = "id";

/// Upcast helper so records can be downcast to their concrete type.
pub trait AsAny: Any {
    /// Borrow as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;
    /// Borrow as `&mut dyn Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A record that can receive eagerly loaded relations.
///
/// Single-valued relations go through [`Model::set_relation`]. Collection
/// relations need the [`MultiRelation`] capability, exposed through
/// [`Model::multi_relation`]; models that leave the default `None` cannot be
/// the owner of a one-to-many or many-to-many relation.
pub trait Model: AsAny + fmt::Debug + Send + Sync {
    /// Name of the model this record belongs to.
    fn model_name(&self) -> &str;

    /// Primary key of this record.
    fn id(&self) -> RecordId;

    /// Attach a single related record.
    fn set_relation(&mut self, name: &str, record: ModelRef);

    /// Access the collection-relation capability, if the model has one.
    fn multi_relation(&mut self) -> Option<&mut dyn MultiRelation> {
        None
    }
}

impl dyn Model {
    /// Downcast to a concrete record type.
    pub fn downcast_ref<T: Model>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Mutably downcast to a concrete record type.
    pub fn downcast_mut<T: Model>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    /// Check the concrete record type.
    pub fn is<T: Model>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

/// Capability for receiving collection relations.
pub trait MultiRelation {
    /// Attach a list of related records, replacing any previous list.
    fn set_relation_many(&mut self, name: &str, records: Vec<ModelRef>);
}

/// Builds records from raw rows.
pub trait RecordFactory: Send + Sync {
    /// Construct a fresh record of `model` from `row`.
    fn new_record(&self, model: &str, row: &Row) -> QueryResult<Box<dyn Model>>;
}

/// Batched access to related rows.
///
/// Every method receives at most one chunk of identifiers. Ordering of the
/// returned rows is up to the implementation; to-many lists follow it.
#[async_trait]
pub trait RelationSource: Send + Sync {
    /// Fetch full rows of `model` whose primary key is in `ids`.
    async fn fetch_by_ids(&self, model: &str, ids: &[RecordId]) -> QueryResult<Vec<Row>>;

    /// Fetch full rows of `model` whose `key` column is in `ids`.
    async fn fetch_by_foreign_key(
        &self,
        model: &str,
        key: &str,
        ids: &[RecordId],
    ) -> QueryResult<Vec<Row>>;

    /// Fetch only `fields` of the `model` rows whose primary key is in `ids`.
    async fn project_fields(
        &self,
        model: &str,
        fields: &[&str],
        ids: &[RecordId],
    ) -> QueryResult<Vec<Row>>;

    /// Fetch `(child, parent)` pairs from a join table where `filter_field` is in `ids`.
    async fn project_join(
        &self,
        join: &JoinTableSpec,
        filter_field: &str,
        ids: &[RecordId],
    ) -> QueryResult<Vec<JoinRow>>;
}

/// The base collection an eager traversal wraps.
#[async_trait]
pub trait RowSource: Send + Sync {
    /// Model of the rows.
    fn model(&self) -> &str;

    /// Primary keys of every row the cursor will yield.
    async fn ids(&self) -> QueryResult<Vec<RecordId>>;

    /// Open a fresh cursor over the rows.
    async fn open(&self) -> QueryResult<RowStream>;
}

/// Relation metadata lookup.
pub trait MetadataProvider: Send + Sync {
    /// Relations declared on `model`, grouped by kind.
    fn relations_of(&self, model: &str) -> Option<&ModelRelations>;

    /// Primary key column of `model`.
    fn primary_key(&self, model: &str) -> &str {
        self.relations_of(model)
            .map(|relations| relations.primary_key())
            .unwrap_or(DEFAULT_PRIMARY_KEY)
    }
}

impl<T: MetadataProvider + ?Sized> MetadataProvider for Arc<T> {
    fn relations_of(&self, model: &str) -> Option<&ModelRelations> {
        (**self).relations_of(model)
    }

    fn primary_key(&self, model: &str) -> &str {
        (**self).primary_key(model)
    }
}

#[async_trait]
impl<T: RowSource + ?Sized> RowSource for Arc<T> {
    fn model(&self) -> &str {
        (**self).model()
    }

    async fn ids(&self) -> QueryResult<Vec<RecordId>> {
        (**self).ids().await
    }

    async fn open(&self) -> QueryResult<RowStream> {
        (**self).open().await
    }
}
