//! Error types for pgchain

use crate::condition::ConditionError;
use thiserror::Error;

/// Result type alias for pgchain operations
pub type ChainResult<T> = Result<T, ChainError>;

/// Error types for query building and execution
#[derive(Debug, Error)]
pub enum ChainError {
    /// The physical connection could not be established
    #[error("Connection error: {0}")]
    Connection(String),

    /// Prepare, bind or execute failed
    #[error("Statement error: {0}")]
    Statement(#[from] tokio_postgres::Error),

    /// Statement failed before reaching the engine (e.g. an unbound placeholder)
    #[error("Statement error: {0}")]
    Binding(String),

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    /// Malformed WHERE expression
    #[error("Condition error: {0}")]
    Condition(#[from] ConditionError),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration could not be loaded
    #[error("Config error: {0}")]
    Config(String),
}

impl ChainError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Check if the connection could not be established
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Check if this error came from preparing, binding or executing a statement
    pub fn is_statement_error(&self) -> bool {
        matches!(
            self,
            Self::Statement(_)
                | Self::Binding(_)
                | Self::UniqueViolation(_)
                | Self::ForeignKeyViolation(_)
                | Self::CheckViolation(_)
        )
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Parse a tokio_postgres error into a more specific ChainError
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();

            match db_err.code().code() {
                "23505" => return Self::UniqueViolation(format!("{}: {}", constraint, message)),
                "23503" => {
                    return Self::ForeignKeyViolation(format!("{}: {}", constraint, message));
                }
                "23514" => return Self::CheckViolation(format!("{}: {}", constraint, message)),
                _ => {}
            }
        }
        Self::Statement(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_kinds_are_grouped() {
        assert!(ChainError::Binding("unbound :x".into()).is_statement_error());
        assert!(ChainError::UniqueViolation("users_pkey: dup".into()).is_statement_error());
        assert!(!ChainError::Connection("refused".into()).is_statement_error());
        assert!(ChainError::Connection("refused".into()).is_connection_error());
    }

    #[test]
    fn condition_error_converts() {
        let err: ChainError = ConditionError::Empty.into();
        assert!(matches!(err, ChainError::Condition(ConditionError::Empty)));
        assert!(!err.is_statement_error());
    }
}
