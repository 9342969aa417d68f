//! Grouping of declared paths by relation type.

use tracing::{debug, warn};

use crate::config::UnknownRelationPolicy;
use crate::error::{QueryError, QueryResult};

use super::path::{RelationPath, merge_path};
use super::spec::{ModelRelations, RelationSpec, RelationType};

/// One relation to resolve, plus the paths to continue with on its targets.
#[derive(Debug, Clone)]
pub struct RelationRequest {
    /// The relation being resolved.
    pub spec: RelationSpec,
    /// Remainders to declare on the related records.
    pub nested: Vec<RelationPath>,
}

impl RelationRequest {
    fn new(spec: RelationSpec) -> Self {
        Self {
            spec,
            nested: Vec::new(),
        }
    }

    /// Relation name.
    pub fn name(&self) -> &str {
        &self.spec.name
    }
}

/// Declared relations of one traversal, grouped by type.
///
/// Paths that share a first segment collapse into a single request whose
/// nested remainders are merged, so each relation is fetched once.
#[derive(Debug, Clone, Default)]
pub struct RelationPlan {
    /// One-to-one requests.
    pub one_to_one: Vec<RelationRequest>,
    /// One-to-many requests.
    pub one_to_many: Vec<RelationRequest>,
    /// Many-to-many requests.
    pub many_to_many: Vec<RelationRequest>,
}

impl RelationPlan {
    /// Group `paths` against the relations of `model`.
    ///
    /// A path whose first segment matches no relation is handled by `policy`.
    pub fn build(
        model: &str,
        relations: Option<&ModelRelations>,
        paths: &[RelationPath],
        policy: UnknownRelationPolicy,
    ) -> QueryResult<Self> {
        let mut plan = Self::default();

        for path in paths {
            let Some(first) = path.first() else {
                continue;
            };

            let mut matched = false;
            if let Some(relations) = relations {
                for relation_type in RelationType::ALL {
                    if let Some(spec) = relations.find(relation_type, first) {
                        plan.add(spec, path.rest());
                        matched = true;
                    }
                }
            }

            if !matched {
                match policy {
                    UnknownRelationPolicy::Ignore => {
                        debug!(model, relation = first, "Ignoring unknown relation");
                    }
                    UnknownRelationPolicy::Warn => {
                        warn!(model, relation = first, path = %path, "Unknown relation dropped from eager load");
                    }
                    UnknownRelationPolicy::Error => {
                        return Err(QueryError::unknown_relation(model, first)
                            .with_context(format!("Eager loading '{}'", path)));
                    }
                }
            }
        }

        Ok(plan)
    }

    fn add(&mut self, spec: &RelationSpec, rest: Option<RelationPath>) {
        let bucket = self.bucket_mut(spec.relation_type);
        let index = match bucket.iter().position(|r| r.spec.name == spec.name) {
            Some(index) => index,
            None => {
                bucket.push(RelationRequest::new(spec.clone()));
                bucket.len() - 1
            }
        };
        if let Some(rest) = rest {
            merge_path(&mut bucket[index].nested, rest);
        }
    }

    fn bucket_mut(&mut self, relation_type: RelationType) -> &mut Vec<RelationRequest> {
        match relation_type {
            RelationType::OneToOne => &mut self.one_to_one,
            RelationType::OneToMany => &mut self.one_to_many,
            RelationType::ManyToMany => &mut self.many_to_many,
        }
    }

    /// Total number of relation requests.
    pub fn len(&self) -> usize {
        self.one_to_one.len() + self.one_to_many.len() + self.many_to_many.len()
    }

    /// Whether nothing needs resolving.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
