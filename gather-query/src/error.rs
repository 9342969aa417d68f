//! Error types for eager loading with actionable messages.
//!
//! Every failure surfaced by the engine is a [`QueryError`] carrying:
//! - An error code for programmatic handling
//! - Actionable suggestions for fixing the issue
//! - Context about what was being resolved (model, relation, operation)
//!
//! # Error Codes
//!
//! Error codes follow a pattern: G{category}{number}
//! - 1xxx: Relation errors (unknown relation, missing capability, bad path)
//! - 3xxx: Connection errors reported by the relation source
//! - 5xxx: Execution errors (timeout, depth, database)
//! - 6xxx: Data errors (row conversion)
//! - 7xxx: Configuration errors
//! - 9xxx: Internal errors
//!
//! ```rust
//! use gather_query::{QueryError, ErrorCode};
//!
//! let err = QueryError::missing_capability("Post", "tags");
//! assert_eq!(err.code, ErrorCode::MissingCapability);
//! assert!(err.to_string().contains("G1007"));
//! ```

use std::fmt;
use thiserror::Error;

/// Result type for eager loading operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Relation errors (1xxx)
    /// Required column missing from a row (G1005).
    RequiredFieldMissing = 1005,
    /// Declared relation is not known for the model (G1006).
    UnknownRelation = 1006,
    /// Model cannot receive a to-many relation (G1007).
    MissingCapability = 1007,
    /// Relation path could not be parsed (G1008).
    InvalidRelationPath = 1008,

    // Connection errors (3xxx)
    /// Database connection failed (G3001).
    ConnectionFailed = 3001,
    /// Connection timeout (G3003).
    ConnectionTimeout = 3003,

    // Query execution errors (5xxx)
    /// Query timeout (G5001).
    QueryTimeout = 5001,
    /// Relation nesting too deep (G5004).
    QueryTooComplex = 5004,
    /// General database error (G5005).
    DatabaseError = 5005,

    // Data errors (6xxx)
    /// Invalid data type (G6001).
    InvalidDataType = 6001,

    // Configuration errors (7xxx)
    /// Invalid configuration (G7001).
    InvalidConfiguration = 7001,

    // Internal errors (9xxx)
    /// Internal error (G9001).
    Internal = 9001,
}

impl ErrorCode {
    /// Get the error code string (e.g., "G1006").
    pub fn code(&self) -> String {
        format!("G{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::RequiredFieldMissing => "Required field missing",
            Self::UnknownRelation => "Unknown relation",
            Self::MissingCapability => "Missing multi-relation capability",
            Self::InvalidRelationPath => "Invalid relation path",
            Self::ConnectionFailed => "Database connection failed",
            Self::ConnectionTimeout => "Connection timeout",
            Self::QueryTimeout => "Query timeout",
            Self::QueryTooComplex => "Relation nesting too deep",
            Self::DatabaseError => "Database error",
            Self::InvalidDataType => "Invalid data type",
            Self::InvalidConfiguration => "Invalid configuration",
            Self::Internal => "Internal error",
        }
    }

    /// Whether the error was raised by the relation source rather than the engine.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed
                | Self::ConnectionTimeout
                | Self::QueryTimeout
                | Self::DatabaseError
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Suggestion for fixing an error.
#[derive(Debug, Clone)]
pub struct Suggestion {
    /// The suggestion text.
    pub text: String,
    /// Optional code example.
    pub code: Option<String>,
}

impl Suggestion {
    /// Create a new suggestion.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            code: None,
        }
    }

    /// Add a code example.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Additional context for an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation that was being performed.
    pub operation: Option<String>,
    /// The model involved.
    pub model: Option<String>,
    /// The relation involved.
    pub relation: Option<String>,
    /// Suggestions for fixing the error.
    pub suggestions: Vec<Suggestion>,
    /// Help text.
    pub help: Option<String>,
}

impl ErrorContext {
    /// Create new empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the operation.
    pub fn operation(mut self, op: impl Into<String>) -> Self {
        self.operation = Some(op.into());
        self
    }

    /// Set the model.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the relation.
    pub fn relation(mut self, relation: impl Into<String>) -> Self {
        self.relation = Some(relation.into());
        self
    }

    /// Add a text suggestion.
    pub fn suggest(mut self, text: impl Into<String>) -> Self {
        self.suggestions.push(Suggestion::new(text));
        self
    }
}

/// Errors that can occur while resolving relations.
#[derive(Error, Debug)]
pub struct QueryError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// The source error (if any).
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl QueryError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Add context about the operation.
    pub fn with_context(mut self, operation: impl Into<String>) -> Self {
        self.context.operation = Some(operation.into());
        self
    }

    /// Add a suggestion for fixing the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context.suggestions.push(Suggestion::new(suggestion));
        self
    }

    /// Add a code suggestion.
    pub fn with_code_suggestion(mut self, text: impl Into<String>, code: impl Into<String>) -> Self {
        self.context
            .suggestions
            .push(Suggestion::new(text).with_code(code));
        self
    }

    /// Add help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.context.help = Some(help.into());
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.context.model = Some(model.into());
        self
    }

    /// Set the relation.
    pub fn with_relation(mut self, relation: impl Into<String>) -> Self {
        self.context.relation = Some(relation.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // ============== Constructor Functions ==============

    /// A relation was declared that the model does not define.
    pub fn unknown_relation(model: impl Into<String>, relation: impl Into<String>) -> Self {
        let model = model.into();
        let relation = relation.into();
        Self::new(
            ErrorCode::UnknownRelation,
            format!("Model '{}' has no relation named '{}'", model, relation),
        )
        .with_model(&model)
        .with_relation(&relation)
        .with_suggestion("Check the spelling of the relation path")
        .with_suggestion("Register the relation in the model's relation metadata")
        .with_code_suggestion(
            "Or relax the policy to drop unknown relations",
            "EagerConfig::default().unknown_relations(UnknownRelationPolicy::Warn)",
        )
    }

    /// A to-many relation was requested on a model without the multi-relation hook.
    pub fn missing_capability(model: impl Into<String>, relation: impl Into<String>) -> Self {
        let model = model.into();
        let relation = relation.into();
        Self::new(
            ErrorCode::MissingCapability,
            format!(
                "Model '{}' cannot receive to-many relation '{}': it does not expose a multi-relation hook",
                model, relation
            ),
        )
        .with_model(&model)
        .with_relation(&relation)
        .with_code_suggestion(
            "Implement MultiRelation and return it from Model::multi_relation",
            "fn multi_relation(&mut self) -> Option<&mut dyn MultiRelation> { Some(self) }",
        )
    }

    /// A relation path string could not be turned into segments.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        let path = path.into();
        Self::new(
            ErrorCode::InvalidRelationPath,
            format!("Relation path '{}' has no segments", path),
        )
        .with_suggestion("Use dotted relation names such as \"author.company\"")
    }

    /// A row lacks a column the engine needs.
    pub fn missing_field(model: impl Into<String>, field: impl Into<String>) -> Self {
        let model = model.into();
        let field = field.into();
        Self::new(
            ErrorCode::RequiredFieldMissing,
            format!("Row of model '{}' has no column '{}'", model, field),
        )
        .with_model(&model)
        .with_suggestion("Make sure the relation source selects key columns")
    }

    /// A key column holds a value that is not an integer identifier.
    pub fn invalid_key(model: impl Into<String>, field: impl Into<String>, found: impl fmt::Debug) -> Self {
        let model = model.into();
        let field = field.into();
        Self::new(
            ErrorCode::InvalidDataType,
            format!(
                "Column '{}' of model '{}' is not an integer key: {:?}",
                field, model, found
            ),
        )
        .with_model(&model)
    }

    /// Nested relation recursion exceeded the configured depth.
    pub fn too_deep(max_depth: usize) -> Self {
        Self::new(
            ErrorCode::QueryTooComplex,
            format!("Relation paths nest deeper than {} levels", max_depth),
        )
        .with_suggestion("Shorten the declared relation paths")
        .with_suggestion("Increase max_depth in the eager loading configuration")
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::ConnectionFailed, format!("Connection error: {}", message))
            .with_suggestion("Check that the database server is running")
    }

    /// Create a timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::new(
            ErrorCode::QueryTimeout,
            format!("Query timed out after {}ms", duration_ms),
        )
    }

    /// Create a general database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
            .with_suggestion("Check the database logs for more details")
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(
            ErrorCode::InvalidConfiguration,
            format!("Invalid configuration: {}", message),
        )
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::Internal, format!("Internal error: {}", message))
    }

    // ============== Error Checks ==============

    /// Check if this is a missing capability error.
    pub fn is_missing_capability(&self) -> bool {
        self.code == ErrorCode::MissingCapability
    }

    /// Check if this is an unknown relation error.
    pub fn is_unknown_relation(&self) -> bool {
        self.code == ErrorCode::UnknownRelation
    }

    /// Check if this error came from the relation source.
    pub fn is_fetch_failure(&self) -> bool {
        self.code.is_fetch_failure()
    }

    /// Display the full error with all context and suggestions.
    pub fn display_full(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("Error [{}]: {}\n", self.code.code(), self.message));

        if let Some(ref op) = self.context.operation {
            output.push_str(&format!("  → While: {}\n", op));
        }
        if let Some(ref model) = self.context.model {
            output.push_str(&format!("  → Model: {}\n", model));
        }
        if let Some(ref relation) = self.context.relation {
            output.push_str(&format!("  → Relation: {}\n", relation));
        }

        if !self.context.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for (i, suggestion) in self.context.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion.text));
                if let Some(ref code) = suggestion.code {
                    output.push_str(&format!(
                        "     ```\n     {}\n     ```\n",
                        code.replace('\n', "\n     ")
                    ));
                }
            }
        }

        if let Some(ref help) = self.context.help {
            output.push_str(&format!("\nHelp: {}\n", help));
        }

        output
    }
}

/// Helper for creating errors with context.
#[macro_export]
macro_rules! query_error {
    ($code:expr, $msg:expr) => {
        $crate::error::QueryError::new($code, $msg)
    };
    ($code:expr, $msg:expr, $($key:ident = $value:expr),+ $(,)?) => {{
        let mut err = $crate::error::QueryError::new($code, $msg);
        $(
            err = err.$key($value);
        )+
        err
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_format() {
        assert_eq!(ErrorCode::UnknownRelation.code(), "G1006");
        assert_eq!(ErrorCode::MissingCapability.code(), "G1007");
        assert_eq!(ErrorCode::InvalidConfiguration.code(), "G7001");
    }

    #[test]
    fn test_missing_capability_error() {
        let err = QueryError::missing_capability("Post", "tags");
        assert!(err.is_missing_capability());
        assert!(err.message.contains("Post"));
        assert!(err.message.contains("tags"));
        assert_eq!(err.context.model, Some("Post".to_string()));
        assert_eq!(err.context.relation, Some("tags".to_string()));
    }

    #[test]
    fn test_unknown_relation_error() {
        let err = QueryError::unknown_relation("Post", "autor");
        assert!(err.is_unknown_relation());
        assert!(err.context.suggestions.len() >= 2);
    }

    #[test]
    fn test_fetch_failure_classification() {
        assert!(QueryError::database("boom").is_fetch_failure());
        assert!(QueryError::connection("refused").is_fetch_failure());
        assert!(QueryError::timeout(100).is_fetch_failure());
        assert!(!QueryError::missing_capability("Post", "tags").is_fetch_failure());
    }

    #[test]
    fn test_display_full() {
        let err = QueryError::missing_capability("Post", "tags")
            .with_context("Hydrating Post");

        let output = err.display_full();
        assert!(output.contains("G1007"));
        assert!(output.contains("While: Hydrating Post"));
        assert!(output.contains("Relation: tags"));
        assert!(output.contains("Suggestions"));
    }

    #[test]
    fn test_error_macro() {
        let err = query_error!(
            ErrorCode::InvalidRelationPath,
            "bad path",
            with_relation = "author",
            with_suggestion = "Use dotted names"
        );

        assert_eq!(err.code, ErrorCode::InvalidRelationPath);
        assert_eq!(err.context.relation, Some("author".to_string()));
    }

    #[test]
    fn test_with_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "socket closed");
        let err = QueryError::connection("lost").with_source(io);
        assert!(std::error::Error::source(&err).is_some());
    }
}
