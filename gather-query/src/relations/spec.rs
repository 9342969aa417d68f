//! Relation specification types.

use std::collections::HashMap;

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::traits::{DEFAULT_PRIMARY_KEY, MetadataProvider};

/// Type of relation between models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationType {
    /// One-to-one relation through a local foreign key (e.g., Post has one Author).
    OneToOne,
    /// One-to-many relation through a remote foreign key (e.g., User has many Posts).
    OneToMany,
    /// Many-to-many relation through a join table (e.g., Post has many Tags).
    ManyToMany,
}

impl RelationType {
    /// All relation types, in resolution order.
    pub const ALL: [RelationType; 3] = [Self::OneToOne, Self::OneToMany, Self::ManyToMany];

    /// Check if this relation returns multiple records.
    pub fn is_many(&self) -> bool {
        matches!(self, Self::OneToMany | Self::ManyToMany)
    }

    /// Check if this relation returns a single record.
    pub fn is_one(&self) -> bool {
        matches!(self, Self::OneToOne)
    }
}

/// Specification for a relation between models.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationSpec {
    /// Name of the relation (field name).
    pub name: SmolStr,
    /// Type of relation.
    pub relation_type: RelationType,
    /// Name of the related model.
    pub related_model: SmolStr,
    /// Key column linking the two sides.
    ///
    /// For one-to-one this is the column on the owning model, for one-to-many
    /// the column on the related model, and for many-to-many the join table
    /// column referencing the owner.
    pub foreign_key: SmolStr,
    /// Join table for many-to-many relations.
    pub join_table: Option<JoinTableSpec>,
}

impl RelationSpec {
    /// Create a one-to-one relation spec keyed by a local column.
    pub fn one_to_one(
        name: impl Into<SmolStr>,
        related_model: impl Into<SmolStr>,
        local_key: impl Into<SmolStr>,
    ) -> Self {
        Self {
            name: name.into(),
            relation_type: RelationType::OneToOne,
            related_model: related_model.into(),
            foreign_key: local_key.into(),
            join_table: None,
        }
    }

    /// Create a one-to-many relation spec keyed by a column on the related model.
    pub fn one_to_many(
        name: impl Into<SmolStr>,
        related_model: impl Into<SmolStr>,
        remote_key: impl Into<SmolStr>,
    ) -> Self {
        Self {
            name: name.into(),
            relation_type: RelationType::OneToMany,
            related_model: related_model.into(),
            foreign_key: remote_key.into(),
            join_table: None,
        }
    }

    /// Create a many-to-many relation spec.
    pub fn many_to_many(
        name: impl Into<SmolStr>,
        related_model: impl Into<SmolStr>,
        join_table: JoinTableSpec,
    ) -> Self {
        Self {
            name: name.into(),
            relation_type: RelationType::ManyToMany,
            related_model: related_model.into(),
            foreign_key: join_table.source_column.clone(),
            join_table: Some(join_table),
        }
    }
}

/// Specification for a join table (many-to-many).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinTableSpec {
    /// Name of the join table.
    pub table_name: SmolStr,
    /// Column referencing the source (owning) model.
    pub source_column: SmolStr,
    /// Column referencing the target (related) model.
    pub target_column: SmolStr,
}

impl JoinTableSpec {
    /// Create a new join table spec.
    pub fn new(
        table_name: impl Into<SmolStr>,
        source_column: impl Into<SmolStr>,
        target_column: impl Into<SmolStr>,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            source_column: source_column.into(),
            target_column: target_column.into(),
        }
    }
}

/// Relations declared on one model, grouped by type.
#[derive(Debug, Clone)]
pub struct ModelRelations {
    model: SmolStr,
    primary_key: SmolStr,
    one_to_one: IndexMap<SmolStr, RelationSpec>,
    one_to_many: IndexMap<SmolStr, RelationSpec>,
    many_to_many: IndexMap<SmolStr, RelationSpec>,
}

impl ModelRelations {
    /// Create an empty relation set with the default `id` primary key.
    pub fn new(model: impl Into<SmolStr>) -> Self {
        Self {
            model: model.into(),
            primary_key: SmolStr::new_static(DEFAULT_PRIMARY_KEY),
            one_to_one: IndexMap::new(),
            one_to_many: IndexMap::new(),
            many_to_many: IndexMap::new(),
        }
    }

    /// Set the primary key column.
    pub fn primary_key_column(mut self, column: impl Into<SmolStr>) -> Self {
        self.primary_key = column.into();
        self
    }

    /// Builder-style relation registration.
    pub fn relation(mut self, spec: RelationSpec) -> Self {
        self.register(spec);
        self
    }

    /// Register a relation in the bucket of its type.
    pub fn register(&mut self, spec: RelationSpec) {
        let bucket = match spec.relation_type {
            RelationType::OneToOne => &mut self.one_to_one,
            RelationType::OneToMany => &mut self.one_to_many,
            RelationType::ManyToMany => &mut self.many_to_many,
        };
        bucket.insert(spec.name.clone(), spec);
    }

    /// Model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Primary key column.
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Relations of one type, in registration order.
    pub fn of_type(&self, relation_type: RelationType) -> &IndexMap<SmolStr, RelationSpec> {
        match relation_type {
            RelationType::OneToOne => &self.one_to_one,
            RelationType::OneToMany => &self.one_to_many,
            RelationType::ManyToMany => &self.many_to_many,
        }
    }

    /// Look up a relation of a given type by name.
    pub fn find(&self, relation_type: RelationType, name: &str) -> Option<&RelationSpec> {
        self.of_type(relation_type).get(name)
    }

    /// Look up a relation by name in any bucket.
    pub fn get(&self, name: &str) -> Option<&RelationSpec> {
        RelationType::ALL
            .iter()
            .find_map(|relation_type| self.find(*relation_type, name))
    }

    /// Get all one-to-one relations.
    pub fn one_to_one(&self) -> impl Iterator<Item = &RelationSpec> {
        self.one_to_one.values()
    }

    /// Get all one-to-many relations.
    pub fn one_to_many(&self) -> impl Iterator<Item = &RelationSpec> {
        self.one_to_many.values()
    }

    /// Get all many-to-many relations.
    pub fn many_to_many(&self) -> impl Iterator<Item = &RelationSpec> {
        self.many_to_many.values()
    }

    /// Total number of relations.
    pub fn len(&self) -> usize {
        self.one_to_one.len() + self.one_to_many.len() + self.many_to_many.len()
    }

    /// Whether the model declares no relations.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Registry of relation metadata for every model.
#[derive(Debug, Clone, Default)]
pub struct RelationRegistry {
    models: HashMap<SmolStr, ModelRelations>,
}

impl RelationRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style model registration.
    pub fn with(mut self, relations: ModelRelations) -> Self {
        self.register(relations);
        self
    }

    /// Register (or replace) a model's relations.
    pub fn register(&mut self, relations: ModelRelations) {
        self.models.insert(relations.model.clone(), relations);
    }

    /// Get a model's relations.
    pub fn get(&self, model: &str) -> Option<&ModelRelations> {
        self.models.get(model)
    }

    /// Number of registered models.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Whether no model is registered.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl MetadataProvider for RelationRegistry {
    fn relations_of(&self, model: &str) -> Option<&ModelRelations> {
        self.models.get(model)
    }
}
