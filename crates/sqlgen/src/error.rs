//! Error types for sqlgen

use thiserror::Error;

/// Result type alias for sqlgen operations
pub type GenResult<T> = Result<T, GenError>;

/// Error types for batch generation and execution
#[derive(Debug, Error)]
pub enum GenError {
    /// Invalid table description (unknown field, duplicate key group, bad identifier)
    #[error("Config error: {0}")]
    Config(String),

    /// Auto-id table whose primary key is not part of the field list
    #[error("Primary key '{field}' is not a field of table '{table}'")]
    MissingPrimaryKey { table: String, field: String },

    /// Auto-id counter cannot produce another id
    #[error("Id counter of table '{table}' is exhausted")]
    IdExhausted { table: String },

    /// Lookup on a key group that was never declared
    #[error("Unknown key group ({group}) on table '{table}'")]
    UnknownKeyGroup { table: String, group: String },

    /// Duplicate record rejected by a `DuplicateAction::Fail` hook
    #[error("Duplicate record on table '{table}' for key ({group})")]
    Duplicate { table: String, group: String },

    /// Value conversion error
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// Query execution error reported by an executor
    #[error("Query error: {0}")]
    Query(String),

    /// Query timeout error
    #[error("Query timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// Reading a table description from disk failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing a TOML table description failed
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl GenError {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a query error
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query(message.into())
    }

    /// Create a conversion error
    pub fn conversion(message: impl Into<String>) -> Self {
        Self::Conversion(message.into())
    }

    pub(crate) fn unknown_group(table: &str, group: &[impl AsRef<str>]) -> Self {
        Self::UnknownKeyGroup {
            table: table.to_string(),
            group: join_group(group),
        }
    }

    pub(crate) fn duplicate(table: &str, group: &[impl AsRef<str>]) -> Self {
        Self::Duplicate {
            table: table.to_string(),
            group: join_group(group),
        }
    }

    /// Check if this is a duplicate error
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

fn join_group(group: &[impl AsRef<str>]) -> String {
    group
        .iter()
        .map(|f| f.as_ref())
        .collect::<Vec<_>>()
        .join(", ")
}
