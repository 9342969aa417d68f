//! Eager loading a blog against the in-memory backend.
//!
//! Run with `GATHER_LOG=trace cargo run --example eager_loading --features logging`
//! to see every batched fetch.

use std::sync::Arc;

use gather::memory::{MemoryRecord, MemorySource};
use gather::prelude::*;

fn registry() -> RelationRegistry {
    RelationRegistry::new()
        .with(
            ModelRelations::new("Post")
                .relation(RelationSpec::one_to_one("author", "User", "author_id"))
                .relation(RelationSpec::one_to_many("comments", "Comment", "post_id"))
                .relation(RelationSpec::many_to_many(
                    "tags",
                    "Tag",
                    JoinTableSpec::new("post_tags", "post_id", "tag_id"),
                )),
        )
        .with(
            ModelRelations::new("User")
                .relation(RelationSpec::one_to_one("company", "Company", "company_id")),
        )
        .with(
            ModelRelations::new("Comment")
                .relation(RelationSpec::one_to_one("author", "User", "author_id")),
        )
}

fn seed(source: &MemorySource) {
    source.insert("Company", Row::new().with("id", 1).with("name", "Initech"));
    source.insert("Company", Row::new().with("id", 2).with("name", "Globex"));

    for (id, name, company) in [(10, "ada", 1), (11, "grace", 2), (12, "linus", 1)] {
        source.insert(
            "User",
            Row::new().with("id", id).with("name", name).with("company_id", company),
        );
    }

    for (id, label) in [(100, "rust"), (101, "databases"), (102, "async")] {
        source.insert("Tag", Row::new().with("id", id).with("label", label));
    }

    let post_tags = JoinTableSpec::new("post_tags", "post_id", "tag_id");
    for id in 1..=6_i64 {
        source.insert(
            "Post",
            Row::new()
                .with("id", id)
                .with("title", format!("Post #{}", id))
                .with("author_id", 10 + id % 3),
        );
        source.insert(
            "Comment",
            Row::new()
                .with("id", 1000 + id)
                .with("post_id", id)
                .with("author_id", 10 + (id + 1) % 3),
        );
        source.link(&post_tags, id, 100 + id % 3);
        source.link(&post_tags, id, 100);
    }
}

fn text<'a>(record: &'a MemoryRecord, column: &str) -> &'a str {
    record.get(column).and_then(Value::as_str).unwrap_or("?")
}

fn as_record(model: &dyn Model) -> Option<&MemoryRecord> {
    model.downcast_ref::<MemoryRecord>()
}

#[tokio::main]
async fn main() -> Result<(), QueryError> {
    gather::logging::init();

    let source = Arc::new(MemorySource::new());
    seed(&source);

    let ctx = Arc::new(
        EagerContext::new(registry(), source.clone(), source.clone())
            .with_config(EagerConfig::default().chunk_size(500))?,
    );

    let mut posts = Eager::new(ctx, source.rows("Post"))
        .declare(["author.company", "comments.author", "tags"])
        .into_results();

    while let Some(post) = posts.next().await {
        let post = post?;
        let Some(post) = as_record(post.as_ref()) else {
            continue;
        };

        let author = post.relation("author").and_then(|a| as_record(a.as_ref()));
        let company = author
            .and_then(|a| a.relation("company"))
            .and_then(|c| as_record(c.as_ref()));
        println!(
            "{} by {} ({})",
            text(post, "title"),
            author.map_or("?", |a| text(a, "name")),
            company.map_or("?", |c| text(c, "name")),
        );

        let tags: Vec<&str> = post
            .relation_many("tags")
            .unwrap_or_default()
            .iter()
            .filter_map(|t| as_record(t.as_ref()))
            .map(|t| text(t, "label"))
            .collect();
        println!("  tags: {}", tags.join(", "));

        for comment in post.relation_many("comments").unwrap_or_default() {
            let commenter = as_record(comment.as_ref())
                .and_then(|c| c.relation("author"))
                .and_then(|a| as_record(a.as_ref()));
            println!("  comment by {}", commenter.map_or("?", |a| text(a, "name")));
        }
    }

    println!("{} batched fetches in total", source.fetch_count());
    Ok(())
}
