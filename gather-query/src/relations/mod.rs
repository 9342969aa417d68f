//! Relation metadata, path parsing and batched relation loading.
//!
//! This module provides the pieces a traversal uses to resolve relations:
//! - `RelationSpec` and `ModelRelations` describing what can be loaded
//! - `RelationPath` for dotted paths such as `"author.company"`
//! - `RelationPlan` grouping declared paths by relation type
//! - `RelationMaps` holding the resolved primary-to-related links
//!
//! ## Example
//!
//! ```rust
//! use gather_query::relations::{JoinTableSpec, ModelRelations, RelationRegistry, RelationSpec};
//!
//! let registry = RelationRegistry::new().with(
//!     ModelRelations::new("Post")
//!         .relation(RelationSpec::one_to_one("author", "User", "author_id"))
//!         .relation(RelationSpec::one_to_many("comments", "Comment", "post_id"))
//!         .relation(RelationSpec::many_to_many(
//!             "tags",
//!             "Tag",
//!             JoinTableSpec::new("post_tags", "post_id", "tag_id"),
//!         )),
//! );
//! assert_eq!(registry.get("Post").map(|r| r.len()), Some(3));
//! ```

pub(crate) mod loader;
mod map;
mod path;
mod plan;
mod spec;

pub use map::{ManyMap, OneMap, RelationMaps};
pub use path::{IntoRelationPaths, RelationPath, merge_path, merge_paths};
pub use plan::{RelationPlan, RelationRequest};
pub use spec::{JoinTableSpec, ModelRelations, RelationRegistry, RelationSpec, RelationType};
