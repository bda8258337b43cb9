use thiserror::Error;

/// Errors raised by the persistence layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database connection or query execution failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration execution failed
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored or supplied value is outside the representable range
    #[error("Value out of range for key '{key}': {value}")]
    OutOfRange { key: String, value: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl StorageError {
    pub fn out_of_range(key: impl Into<String>, value: impl ToString) -> Self {
        Self::OutOfRange {
            key: key.into(),
            value: value.to_string(),
        }
    }
}

/// Specialized result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
