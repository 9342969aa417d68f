//! In-memory relation source and record factory.
//!
//! [`MemorySource`] keeps tables of [`Row`]s per model plus join tables, and
//! answers every [`RelationSource`] call from them while logging each fetch.
//! It doubles as a [`RecordFactory`] producing [`MemoryRecord`]s, which
//! makes it a complete backend for tests, benchmarks and demos.
//!
//! [`RowSet`] is a [`RowSource`] over rows that are already in memory.
//!
//! ```rust
//! use gather_query::memory::MemorySource;
//! use gather_query::row::Row;
//!
//! let source = MemorySource::new();
//! source.insert("User", Row::new().with("id", 1).with("name", "Ada"));
//! assert_eq!(source.rows("User").len(), 1);
//! assert_eq!(source.fetch_count(), 0);
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use smol_str::SmolStr;

use crate::error::{QueryError, QueryResult};
use crate::relations::JoinTableSpec;
use crate::row::{JoinRow, RecordId, Row, Value};
use crate::traits::{
    DEFAULT_PRIMARY_KEY, Model, ModelRef, MultiRelation, RecordFactory, RelationSource, RowSource,
    RowStream,
};

/// Kind of a logged fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchKind {
    /// `fetch_by_ids`.
    ById,
    /// `fetch_by_foreign_key`.
    ByForeignKey,
    /// `project_fields`.
    Projection,
    /// `project_join`.
    JoinProjection,
}

/// One logged call against a [`MemorySource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRecord {
    /// Kind of fetch.
    pub kind: FetchKind,
    /// Model or join table queried.
    pub model: SmolStr,
    /// Number of IDs in the request.
    pub ids: usize,
}

#[derive(Debug, Clone)]
struct MemoryTable {
    primary_key: SmolStr,
    rows: Vec<Row>,
}

impl MemoryTable {
    fn new(primary_key: impl Into<SmolStr>) -> Self {
        Self {
            primary_key: primary_key.into(),
            rows: Vec::new(),
        }
    }
}

fn key_of(row: &Row, column: &str) -> Option<RecordId> {
    row.get(column).and_then(Value::as_i64).map(RecordId)
}

/// In-memory tables answering batched relation fetches.
#[derive(Debug, Default)]
pub struct MemorySource {
    tables: RwLock<HashMap<SmolStr, MemoryTable>>,
    joins: RwLock<HashMap<SmolStr, Vec<Row>>>,
    log: Mutex<Vec<FetchRecord>>,
    failing: RwLock<HashSet<SmolStr>>,
    single_valued: RwLock<HashSet<SmolStr>>,
}

impl MemorySource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a table with a custom primary key column.
    pub fn create_table(&self, model: &str, primary_key: &str) {
        self.tables
            .write()
            .insert(SmolStr::new(model), MemoryTable::new(primary_key));
    }

    /// Append a row to a model's table, creating it with an `id` key if needed.
    pub fn insert(&self, model: &str, row: Row) {
        self.tables
            .write()
            .entry(SmolStr::new(model))
            .or_insert_with(|| MemoryTable::new(DEFAULT_PRIMARY_KEY))
            .rows
            .push(row);
    }

    /// Append a `(parent, child)` pair to a join table.
    pub fn link(&self, join: &JoinTableSpec, parent: impl Into<RecordId>, child: impl Into<RecordId>) {
        let row = Row::new()
            .with(join.source_column.as_str(), parent.into())
            .with(join.target_column.as_str(), child.into());
        self.joins
            .write()
            .entry(join.table_name.clone())
            .or_default()
            .push(row);
    }

    /// Snapshot a model's rows as a row source.
    pub fn rows(&self, model: &str) -> RowSet {
        let tables = self.tables.read();
        match tables.get(model) {
            Some(table) => RowSet::new(model, table.rows.clone()).with_primary_key(table.primary_key.clone()),
            None => RowSet::new(model, Vec::new()),
        }
    }

    /// Make every fetch touching `model` fail with a database error.
    pub fn fail_on(&self, model: &str) {
        self.failing.write().insert(SmolStr::new(model));
    }

    /// Build records of `model` without the collection-relation capability.
    pub fn without_multi_relation(&self, model: &str) {
        self.single_valued.write().insert(SmolStr::new(model));
    }

    /// Total number of fetches served.
    pub fn fetch_count(&self) -> usize {
        self.log.lock().len()
    }

    /// Number of fetches served for one model or join table.
    pub fn fetch_count_for(&self, model: &str) -> usize {
        self.log.lock().iter().filter(|f| f.model == model).count()
    }

    /// Every fetch served so far, in order.
    pub fn fetches(&self) -> Vec<FetchRecord> {
        self.log.lock().clone()
    }

    /// Forget the fetch log.
    pub fn reset_fetches(&self) {
        self.log.lock().clear();
    }

    fn record(&self, kind: FetchKind, model: &str, ids: &[RecordId]) -> QueryResult<()> {
        self.log.lock().push(FetchRecord {
            kind,
            model: SmolStr::new(model),
            ids: ids.len(),
        });
        if self.failing.read().contains(model) {
            return Err(QueryError::database(format!("simulated failure fetching {}", model))
                .with_model(model));
        }
        Ok(())
    }

    fn select<F>(&self, model: &str, mut keep: F) -> Vec<Row>
    where
        F: FnMut(&Row, &str) -> bool,
    {
        let tables = self.tables.read();
        let Some(table) = tables.get(model) else {
            return Vec::new();
        };
        table
            .rows
            .iter()
            .filter(|row| keep(row, table.primary_key.as_str()))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl RelationSource for MemorySource {
    async fn fetch_by_ids(&self, model: &str, ids: &[RecordId]) -> QueryResult<Vec<Row>> {
        self.record(FetchKind::ById, model, ids)?;
        let wanted: HashSet<_> = ids.iter().copied().collect();
        Ok(self.select(model, |row, pk| {
            key_of(row, pk).is_some_and(|id| wanted.contains(&id))
        }))
    }

    async fn fetch_by_foreign_key(
        &self,
        model: &str,
        key: &str,
        ids: &[RecordId],
    ) -> QueryResult<Vec<Row>> {
        self.record(FetchKind::ByForeignKey, model, ids)?;
        let wanted: HashSet<_> = ids.iter().copied().collect();
        Ok(self.select(model, |row, _| {
            key_of(row, key).is_some_and(|id| wanted.contains(&id))
        }))
    }

    async fn project_fields(
        &self,
        model: &str,
        fields: &[&str],
        ids: &[RecordId],
    ) -> QueryResult<Vec<Row>> {
        self.record(FetchKind::Projection, model, ids)?;
        let wanted: HashSet<_> = ids.iter().copied().collect();
        Ok(self
            .select(model, |row, pk| {
                key_of(row, pk).is_some_and(|id| wanted.contains(&id))
            })
            .iter()
            .map(|row| {
                let mut projected = row.project(fields);
                // Absent columns read as null, like a SQL projection
                for field in fields {
                    if projected.get(field).is_none() {
                        projected.insert(*field, Value::Null);
                    }
                }
                projected
            })
            .collect())
    }

    async fn project_join(
        &self,
        join: &JoinTableSpec,
        filter_field: &str,
        ids: &[RecordId],
    ) -> QueryResult<Vec<JoinRow>> {
        self.record(FetchKind::JoinProjection, &join.table_name, ids)?;
        let wanted: HashSet<_> = ids.iter().copied().collect();
        let joins = self.joins.read();
        let Some(rows) = joins.get(join.table_name.as_str()) else {
            return Ok(Vec::new());
        };

        Ok(rows
            .iter()
            .filter_map(|row| {
                let parent = key_of(row, filter_field)?;
                let child = key_of(row, &join.target_column)?;
                wanted.contains(&parent).then_some(JoinRow { child, parent })
            })
            .collect())
    }
}

impl RecordFactory for MemorySource {
    fn new_record(&self, model: &str, row: &Row) -> QueryResult<Box<dyn Model>> {
        let primary_key = self
            .tables
            .read()
            .get(model)
            .map(|table| table.primary_key.clone())
            .unwrap_or_else(|| SmolStr::new_static(DEFAULT_PRIMARY_KEY));
        let id = row.id(model, &primary_key)?;

        let mut record = MemoryRecord::new(model, id, row.clone());
        record.multi = !self.single_valued.read().contains(model);
        Ok(Box::new(record))
    }
}

/// A generic record built by [`MemorySource`].
#[derive(Debug, Clone)]
pub struct MemoryRecord {
    model: SmolStr,
    id: RecordId,
    row: Row,
    one: IndexMap<SmolStr, ModelRef>,
    many: IndexMap<SmolStr, Vec<ModelRef>>,
    multi: bool,
}

impl MemoryRecord {
    /// Create a record with no relations attached.
    pub fn new(model: impl Into<SmolStr>, id: RecordId, row: Row) -> Self {
        Self {
            model: model.into(),
            id,
            row,
            one: IndexMap::new(),
            many: IndexMap::new(),
            multi: true,
        }
    }

    /// A column of the underlying row.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.row.get(column)
    }

    /// The underlying row.
    pub fn row(&self) -> &Row {
        &self.row
    }

    /// An attached single-valued relation.
    pub fn relation(&self, name: &str) -> Option<&ModelRef> {
        self.one.get(name)
    }

    /// An attached collection relation.
    pub fn relation_many(&self, name: &str) -> Option<&[ModelRef]> {
        self.many.get(name).map(Vec::as_slice)
    }
}

impl Model for MemoryRecord {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn id(&self) -> RecordId {
        self.id
    }

    fn set_relation(&mut self, name: &str, record: ModelRef) {
        self.one.insert(SmolStr::new(name), record);
    }

    fn multi_relation(&mut self) -> Option<&mut dyn MultiRelation> {
        if self.multi { Some(self) } else { None }
    }
}

impl MultiRelation for MemoryRecord {
    fn set_relation_many(&mut self, name: &str, records: Vec<ModelRef>) {
        self.many.insert(SmolStr::new(name), records);
    }
}

/// A row source over rows already held in memory.
#[derive(Debug, Clone)]
pub struct RowSet {
    model: SmolStr,
    primary_key: SmolStr,
    rows: Arc<Vec<Row>>,
}

impl RowSet {
    /// Wrap rows of `model` keyed by `id`.
    pub fn new(model: impl Into<SmolStr>, rows: Vec<Row>) -> Self {
        Self {
            model: model.into(),
            primary_key: SmolStr::new_static(DEFAULT_PRIMARY_KEY),
            rows: Arc::new(rows),
        }
    }

    /// Use a different primary key column.
    pub fn with_primary_key(mut self, column: impl Into<SmolStr>) -> Self {
        self.primary_key = column.into();
        self
    }

    /// The wrapped rows.
    pub fn as_slice(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl RowSource for RowSet {
    fn model(&self) -> &str {
        &self.model
    }

    async fn ids(&self) -> QueryResult<Vec<RecordId>> {
        self.rows
            .iter()
            .map(|row| row.id(&self.model, &self.primary_key))
            .collect()
    }

    async fn open(&self) -> QueryResult<RowStream> {
        let rows = Arc::clone(&self.rows);
        Ok(stream::iter((0..rows.len()).map(move |i| Ok(rows[i].clone()))).boxed())
    }
}
