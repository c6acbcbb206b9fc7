//! Error types for repository operations.

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Error type for repository operations
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The recording lacks a table or column the query needs.
    #[error("Schema error: {0}")]
    SchemaError(String),

    #[error("Data validation error: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl RepositoryError {
    /// Whether the error means the requested data cannot be read from this
    /// recording, as opposed to the store being unreachable.
    ///
    /// Optional data (cage sensors) is skipped on such errors instead of
    /// failing the analysis.
    pub fn is_data_unavailable(&self) -> bool {
        matches!(
            self,
            RepositoryError::NotFound(_)
                | RepositoryError::SchemaError(_)
                | RepositoryError::QueryError(_)
                | RepositoryError::ValidationError(_)
        )
    }
}

impl From<String> for RepositoryError {
    fn from(s: String) -> Self {
        RepositoryError::InternalError(s)
    }
}

impl From<&str> for RepositoryError {
    fn from(s: &str) -> Self {
        RepositoryError::InternalError(s.to_string())
    }
}

#[cfg(feature = "sqlite-repo")]
impl From<rusqlite::Error> for RepositoryError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(_, Some(message))
                if message.contains("no such column") || message.contains("no such table") =>
            {
                RepositoryError::SchemaError(message.clone())
            }
            rusqlite::Error::InvalidColumnType(..) | rusqlite::Error::FromSqlConversionFailure(..) => {
                RepositoryError::ValidationError(e.to_string())
            }
            _ => RepositoryError::QueryError(e.to_string()),
        }
    }
}
