//! # Gather
//!
//! Batched eager relation loading that removes N+1 queries.
//!
//! Gather provides:
//! - Dotted relation paths such as `"author.company"`, declared up front
//! - One-to-one, one-to-many and many-to-many resolution with ID batching
//! - A per-traversal record cache, so shared related records load once
//! - Async, pull-based results prepared on the first record
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use gather::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), QueryError> {
//!     let registry = RelationRegistry::new().with(
//!         ModelRelations::new("Post")
//!             .relation(RelationSpec::one_to_one("author", "User", "author_id")),
//!     );
//!     let ctx = Arc::new(EagerContext::new(registry, source.clone(), factory));
//!
//!     let mut posts = Eager::new(ctx, post_rows)
//!         .declare(["author.company", "tags"])
//!         .into_results();
//!
//!     while let Some(post) = posts.next().await {
//!         let post = post?;
//!         // relations are attached, no further queries
//!     }
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// The eager loading engine.
pub mod query {
    pub use gather_query::*;
}

/// In-memory backend for tests and prototyping.
pub mod memory {
    pub use gather_query::memory::*;
}

/// Logging setup.
pub mod logging {
    pub use gather_query::logging::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use gather_query::prelude::*;
}

// Re-export key types at the crate root
pub use gather_query::{Eager, EagerConfig, EagerContext, ErrorCode, QueryError, QueryResult};
