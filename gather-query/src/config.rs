//! Eager loading configuration.
//!
//! Settings can be built in code or read from the `[eager]` table of a TOML
//! file. `${VAR}` references in the file are expanded from the environment
//! before parsing.
//!
//! ```toml
//! [eager]
//! chunk_size = 1000
//! chunk_foreign_key_fetches = true
//! unknown_relations = "error"
//! max_depth = 8
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, QueryResult};

/// Upper bound on the number of IDs sent in one batched fetch.
pub const MAX_CHUNK_SIZE: usize = 5000;

/// What to do with a declared relation the model does not define.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownRelationPolicy {
    /// Drop the path silently.
    Ignore,
    /// Drop the path and emit a warning.
    #[default]
    Warn,
    /// Fail preparation with `UnknownRelation`.
    Error,
}

/// Configuration for one eager loading context.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct EagerConfig {
    /// Maximum IDs per batched fetch (1..=5000).
    pub chunk_size: usize,
    /// Also chunk foreign-key and join-table fetches by `chunk_size`.
    pub chunk_foreign_key_fetches: bool,
    /// Handling of unknown relation names.
    pub unknown_relations: UnknownRelationPolicy,
    /// Maximum nesting depth of relation paths.
    pub max_depth: usize,
}

impl Default for EagerConfig {
    fn default() -> Self {
        Self {
            chunk_size: MAX_CHUNK_SIZE,
            chunk_foreign_key_fetches: true,
            unknown_relations: UnknownRelationPolicy::Warn,
            max_depth: 16,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    eager: EagerConfig,
}

impl EagerConfig {
    /// Load configuration from a TOML file path.
    pub fn from_file(path: impl AsRef<Path>) -> QueryResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            QueryError::configuration(format!("failed to read {}", path.display())).with_source(e)
        })?;

        Self::from_toml_str(&content)
    }

    /// Parse the `[eager]` table of a TOML document.
    pub fn from_toml_str(content: &str) -> QueryResult<Self> {
        let expanded = expand_env_vars(content);
        let file: ConfigFile = toml::from_str(&expanded)
            .map_err(|e| QueryError::configuration("failed to parse TOML").with_source(e))?;

        file.eager.validate()?;
        crate::gather_debug!(
            chunk_size = file.eager.chunk_size,
            unknown_relations = ?file.eager.unknown_relations,
            "Eager loading configuration loaded"
        );
        Ok(file.eager)
    }

    /// Set the chunk size.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Toggle chunking of foreign-key and join-table fetches.
    pub fn chunk_foreign_key_fetches(mut self, enabled: bool) -> Self {
        self.chunk_foreign_key_fetches = enabled;
        self
    }

    /// Set the unknown relation policy.
    pub fn unknown_relations(mut self, policy: UnknownRelationPolicy) -> Self {
        self.unknown_relations = policy;
        self
    }

    /// Set the maximum nesting depth.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Check that all values are within range.
    pub fn validate(&self) -> QueryResult<()> {
        if self.chunk_size == 0 || self.chunk_size > MAX_CHUNK_SIZE {
            return Err(QueryError::configuration(format!(
                "chunk_size must be between 1 and {}, got {}",
                MAX_CHUNK_SIZE, self.chunk_size
            )));
        }
        if self.max_depth == 0 {
            return Err(QueryError::configuration("max_depth must be at least 1"));
        }
        Ok(())
    }
}

fn expand_env_vars(content: &str) -> String {
    let mut result = content.to_string();
    let Ok(re) = regex_lite::Regex::new(r"\$\{([^}]+)\}") else {
        return result;
    };

    for cap in re.captures_iter(content) {
        let var_name = &cap[1];
        let full_match = &cap[0];

        if let Ok(value) = std::env::var(var_name) {
            result = result.replace(full_match, &value);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_default_config() {
        let config = EagerConfig::default();
        assert_eq!(config.chunk_size, 5000);
        assert!(config.chunk_foreign_key_fetches);
        assert_eq!(config.unknown_relations, UnknownRelationPolicy::Warn);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [eager]
            chunk_size = 250
            unknown_relations = "error"
        "#;

        let config = EagerConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.chunk_size, 250);
        assert_eq!(config.unknown_relations, UnknownRelationPolicy::Error);
        assert_eq!(config.max_depth, 16);
    }

    #[test]
    fn test_missing_table_uses_defaults() {
        let config = EagerConfig::from_toml_str("").unwrap();
        assert_eq!(config, EagerConfig::default());
    }

    #[test]
    fn test_rejects_oversized_chunk() {
        let err = EagerConfig::from_toml_str("[eager]\nchunk_size = 6000\n").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfiguration);
    }

    #[test]
    fn test_rejects_unknown_fields() {
        let err = EagerConfig::from_toml_str("[eager]\nchunk = 10\n").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfiguration);
    }

    #[test]
    fn test_env_var_expansion() {
        // SAFETY: This test runs single-threaded and we clean up after
        unsafe {
            std::env::set_var("GATHER_TEST_CHUNK", "42");
        }
        let config = EagerConfig::from_toml_str("[eager]\nchunk_size = ${GATHER_TEST_CHUNK}\n").unwrap();
        assert_eq!(config.chunk_size, 42);
        unsafe {
            std::env::remove_var("GATHER_TEST_CHUNK");
        }
    }

    #[test]
    fn test_builder() {
        let config = EagerConfig::default()
            .chunk_size(10)
            .chunk_foreign_key_fetches(false)
            .unknown_relations(UnknownRelationPolicy::Ignore)
            .max_depth(2);

        assert_eq!(config.chunk_size, 10);
        assert!(!config.chunk_foreign_key_fetches);
        assert_eq!(config.max_depth, 2);
        assert!(EagerConfig::default().chunk_size(0).validate().is_err());
    }
}
