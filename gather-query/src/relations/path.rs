//! Dotted relation paths.
//!
//! `"author.company"` parses into the segments `["author", "company"]`. The
//! first segment names a relation on the model being traversed; the rest is
//! resolved on the related model.

use std::fmt;

use smallvec::SmallVec;
use smol_str::SmolStr;

use crate::error::{QueryError, QueryResult};

/// An ordered sequence of relation names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RelationPath {
    segments: SmallVec<[SmolStr; 4]>,
}

impl RelationPath {
    /// Parse a dotted path.
    ///
    /// Whitespace around segments is trimmed and empty segments are dropped, so
    /// `"a..b"` is `["a", "b"]` and `""` is the empty path.
    pub fn parse(path: &str) -> Self {
        Self {
            segments: path
                .split('.')
                .map(str::trim)
                .filter(|segment| !segment.is_empty())
                .map(SmolStr::new)
                .collect(),
        }
    }

    /// Parse a dotted path, rejecting paths without segments.
    pub fn try_parse(path: &str) -> QueryResult<Self> {
        let parsed = Self::parse(path);
        if parsed.is_empty() {
            return Err(QueryError::invalid_path(path));
        }
        Ok(parsed)
    }

    /// Build a path from already split segments.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// The segments of this path.
    pub fn segments(&self) -> &[SmolStr] {
        &self.segments
    }

    /// Relation name resolved on the current model.
    pub fn first(&self) -> Option<&str> {
        self.segments.first().map(SmolStr::as_str)
    }

    /// The remainder after the first segment, if any.
    pub fn rest(&self) -> Option<RelationPath> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(Self {
            segments: self.segments[1..].iter().cloned().collect(),
        })
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the path has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether `prefix` is a leading run of this path's segments.
    ///
    /// Resolving `"company.address"` also resolves `"company"`.
    pub fn starts_with(&self, prefix: &RelationPath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }
}

impl fmt::Display for RelationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

impl From<&str> for RelationPath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

/// Append `path` unless it is empty or already present.
pub fn merge_path(paths: &mut Vec<RelationPath>, path: RelationPath) {
    if !path.is_empty() && !paths.contains(&path) {
        paths.push(path);
    }
}

/// Append every path from `incoming`, keeping declaration order.
pub fn merge_paths(paths: &mut Vec<RelationPath>, incoming: impl IntoIterator<Item = RelationPath>) {
    for path in incoming {
        merge_path(paths, path);
    }
}

/// Anything that can be declared as a set of relation paths.
pub trait IntoRelationPaths {
    /// Convert into parsed paths. Empty paths may be included.
    fn into_relation_paths(self) -> Vec<RelationPath>;
}

impl IntoRelationPaths for &str {
    fn into_relation_paths(self) -> Vec<RelationPath> {
        vec![RelationPath::parse(self)]
    }
}

impl IntoRelationPaths for String {
    fn into_relation_paths(self) -> Vec<RelationPath> {
        vec![RelationPath::parse(&self)]
    }
}

impl IntoRelationPaths for &String {
    fn into_relation_paths(self) -> Vec<RelationPath> {
        vec![RelationPath::parse(self)]
    }
}

impl IntoRelationPaths for RelationPath {
    fn into_relation_paths(self) -> Vec<RelationPath> {
        vec![self]
    }
}

impl IntoRelationPaths for &[&str] {
    fn into_relation_paths(self) -> Vec<RelationPath> {
        self.iter().map(|p| RelationPath::parse(p)).collect()
    }
}

impl IntoRelationPaths for &[String] {
    fn into_relation_paths(self) -> Vec<RelationPath> {
        self.iter().map(|p| RelationPath::parse(p)).collect()
    }
}

impl<const N: usize> IntoRelationPaths for [&str; N] {
    fn into_relation_paths(self) -> Vec<RelationPath> {
        self.iter().map(|p| RelationPath::parse(p)).collect()
    }
}

impl IntoRelationPaths for Vec<&str> {
    fn into_relation_paths(self) -> Vec<RelationPath> {
        self.as_slice().into_relation_paths()
    }
}

impl IntoRelationPaths for Vec<String> {
    fn into_relation_paths(self) -> Vec<RelationPath> {
        self.as_slice().into_relation_paths()
    }
}

impl IntoRelationPaths for Vec<RelationPath> {
    fn into_relation_paths(self) -> Vec<RelationPath> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_nested() {
        let path = RelationPath::parse("author.company");
        assert_eq!(path.len(), 2);
        assert_eq!(path.first(), Some("author"));
        assert_eq!(path.rest(), Some(RelationPath::parse("company")));
        assert_eq!(path.to_string(), "author.company");
    }

    #[test]
    fn test_parse_trims_and_drops_empty_segments() {
        assert_eq!(
            RelationPath::parse(" a .. b ."),
            RelationPath::from_segments(["a", "b"])
        );
        assert!(RelationPath::parse("").is_empty());
        assert!(RelationPath::parse("author").rest().is_none());
    }

    #[test]
    fn test_try_parse_rejects_empty() {
        let err = RelationPath::try_parse(" . ").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidRelationPath);
        assert!(RelationPath::try_parse("tags").is_ok());
    }

    #[test]
    fn test_starts_with() {
        let path = RelationPath::parse("company.address");
        assert!(path.starts_with(&RelationPath::parse("company")));
        assert!(path.starts_with(&path.clone()));
        assert!(!path.starts_with(&RelationPath::parse("address")));
        assert!(!RelationPath::parse("company").starts_with(&path));
    }

    #[test]
    fn test_merge_dedups_and_skips_empty() {
        let mut paths = Vec::new();
        merge_paths(&mut paths, ["author", "tags"].into_relation_paths());
        merge_paths(&mut paths, vec!["author", "", "author.company"].into_relation_paths());

        let names: Vec<String> = paths.iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["author", "tags", "author.company"]);
    }

    #[test]
    fn test_into_relation_paths_variants() {
        assert_eq!("a.b".into_relation_paths().len(), 1);
        assert_eq!(String::from("a").into_relation_paths().len(), 1);
        assert_eq!(vec![String::from("a"), String::from("b")].into_relation_paths().len(), 2);
        assert_eq!(RelationPath::parse("x").into_relation_paths().len(), 1);
    }
}
