//! Error types for the PostgreSQL `DatabaseProvider`.

use odata_core::Error as CoreError;

/// Errors specific to pool/connection setup, before a query is even built.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database connection error.
    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx_core::error::Error),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl PostgresError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }
}

impl From<PostgresError> for CoreError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::Connection(e) => CoreError::Execution(e.to_string()),
            PostgresError::Config { message } => CoreError::build(format!("configuration error: {message}")),
        }
    }
}

/// Result type alias for PostgreSQL pool/connection setup.
pub type Result<T> = std::result::Result<T, PostgresError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PostgresError::config("invalid URL");
        assert!(err.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_conversion_to_core_error() {
        let pg_err = PostgresError::config("test error");
        let core_err: CoreError = pg_err.into();
        assert!(matches!(core_err, CoreError::Build { .. }));
    }
}
