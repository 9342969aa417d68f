//! # gather-query
//!
//! Eager relation loading engine for the Gather ORM.
//!
//! Loading a list of records and then touching a relation on each one costs a
//! query per record. This crate resolves every declared relation up front,
//! with a bounded number of batched fetches:
//! - Dotted relation paths (`"author.company"`) with nesting
//! - One-to-one, one-to-many and many-to-many relations
//! - ID chunking for large batches
//! - A per-traversal cache shared across relations and nesting levels
//! - Lazy preparation on the first pulled record
//!
//! ## Declaring Relations
//!
//! ```rust
//! use gather_query::{ModelRelations, RelationRegistry, RelationSpec};
//!
//! let registry = RelationRegistry::new()
//!     .with(
//!         ModelRelations::new("Post")
//!             .relation(RelationSpec::one_to_one("author", "User", "author_id")),
//!     )
//!     .with(
//!         ModelRelations::new("User")
//!             .relation(RelationSpec::one_to_one("company", "Company", "company_id")),
//!     );
//! assert_eq!(registry.len(), 2);
//! ```
//!
//! ## Relation Paths
//!
//! ```rust
//! use gather_query::RelationPath;
//!
//! let path = RelationPath::parse("author.company");
//! assert_eq!(path.first(), Some("author"));
//! assert_eq!(path.rest().map(|p| p.to_string()), Some("company".to_string()));
//! ```
//!
//! ## Eager Loading
//!
//! ```rust
//! use std::sync::Arc;
//! use gather_query::prelude::*;
//! use gather_query::memory::{MemoryRecord, MemorySource};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let source = Arc::new(MemorySource::new());
//! source.insert("User", Row::new().with("id", 10).with("name", "Ada"));
//! source.insert("Post", Row::new().with("id", 1).with("author_id", 10));
//! source.insert("Post", Row::new().with("id", 2).with("author_id", 10));
//!
//! let registry = RelationRegistry::new().with(
//!     ModelRelations::new("Post")
//!         .relation(RelationSpec::one_to_one("author", "User", "author_id")),
//! );
//! let ctx = Arc::new(EagerContext::new(registry, source.clone(), source.clone()));
//!
//! let posts = Eager::new(ctx, source.rows("Post"))
//!     .declare("author")
//!     .collect()
//!     .await
//!     .unwrap();
//!
//! let post = posts[0].downcast_ref::<MemoryRecord>().unwrap();
//! assert!(post.relation("author").is_some());
//! // One key projection plus one author fetch
//! assert_eq!(source.fetch_count(), 2);
//! # });
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use gather_query::{QueryError, ErrorCode};
//!
//! let err = QueryError::unknown_relation("Post", "autor");
//! assert_eq!(err.code, ErrorCode::UnknownRelation);
//! ```

pub mod cache;
pub mod config;
pub mod eager;
pub mod error;
pub mod hydrate;
pub mod lazy;
pub mod logging;
pub mod memory;
pub mod relations;
pub mod row;
pub mod traits;

pub use cache::{CacheStats, RelationCache};
pub use config::{EagerConfig, MAX_CHUNK_SIZE, UnknownRelationPolicy};
pub use eager::{Eager, EagerContext};
pub use error::{ErrorCode, ErrorContext, QueryError, QueryResult, Suggestion};
pub use hydrate::Hydrator;
pub use lazy::LazyResults;
pub use relations::{
    IntoRelationPaths, JoinTableSpec, ManyMap, ModelRelations, OneMap, RelationMaps, RelationPath,
    RelationPlan, RelationRegistry, RelationRequest, RelationSpec, RelationType,
};
pub use row::{JoinRow, RecordId, Row, Value};
pub use traits::{
    BoxFuture, MetadataProvider, Model, ModelRef, MultiRelation, RecordFactory, RelationSource,
    RowSource, RowStream,
};

// Re-export logging utilities
pub use logging::{LogFormat, LogSettings, init as init_logging};

// Re-export async_trait for collaborator implementations
pub use async_trait::async_trait;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{EagerConfig, UnknownRelationPolicy};
    pub use crate::eager::{Eager, EagerContext};
    pub use crate::error::{ErrorCode, QueryError, QueryResult};
    pub use crate::lazy::LazyResults;
    pub use crate::relations::{
        IntoRelationPaths, JoinTableSpec, ModelRelations, RelationPath, RelationRegistry,
        RelationSpec, RelationType,
    };
    pub use crate::row::{JoinRow, RecordId, Row, Value};
    pub use crate::traits::{
        MetadataProvider, Model, ModelRef, MultiRelation, RecordFactory, RelationSource,
        RowSource, RowStream,
    };
}
