//! Error types for the vecgraph adapter.
//!
//! One enum covers the whole error taxonomy: configuration and connection
//! failures that abort initialization, plus the per-operation categories
//! (maintenance, query, embedding, storage) that the adapter boundary turns
//! into structured outcomes.

use thiserror::Error;

/// Unified error type for vecgraph.
///
/// All fallible functions return `Result<T, AppError>`.
/// We never panic: errors must be represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Fatal configuration problem detected before any I/O
    #[error("Configuration error: {0}")]
    Config(String),

    /// Backing engine unreachable or handshake failed (retried on next session)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Index/graph maintenance step failed (structures left stale)
    #[error("Maintenance error: {0}")]
    Maintenance(String),

    /// Similarity query failed
    #[error("Query error: {0}")]
    Query(String),

    /// Embedding provider or splitter failure
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Backing engine read/write failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Namespace identifier rejected by validation
    #[error("Invalid namespace: {0}")]
    InvalidNamespace(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Short category label used as a log prefix.
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::Connection(_) => "connection",
            AppError::Maintenance(_) => "maintenance",
            AppError::Query(_) => "query",
            AppError::Embedding(_) => "embedding",
            AppError::Storage(_) => "storage",
            AppError::InvalidNamespace(_) => "namespace",
            AppError::Io(_) => "io",
            AppError::Serialization(_) => "serialization",
            AppError::Other(_) => "other",
        }
    }

    /// Whether the error should abort the adapter rather than a single operation.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Config(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
