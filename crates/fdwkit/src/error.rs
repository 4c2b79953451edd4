//! Error types for FDW catalog and reconciliation operations.
//!
//! Errors are categorized so the CLI can give appropriate feedback.
//! Database failures always carry the operation that failed and, for
//! mutations, the object it was applied to.

use crate::backend::DbError;
use thiserror::Error;

/// Categories of errors for user feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Could not open a database session
    Connection,
    /// A catalog query or DDL statement failed
    Database,
    /// A secret could not be resolved from any source
    Secret,
    /// The caller supplied an invalid or incomplete request
    Input,
    /// The operation was cancelled or its deadline passed
    Cancelled,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Connection => "Database connection failed",
            Self::Database => "Database operation failed",
            Self::Secret => "Secret could not be resolved",
            Self::Input => "Invalid request",
            Self::Cancelled => "Operation cancelled",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Connection => "Check the connection string, network access and credentials",
            Self::Database => "Check that the connecting role has the privileges the statement needs",
            Self::Secret => "Check the secret's value, environment variable, file or cluster secret",
            Self::Input => "Check the command arguments and the desired state document",
            Self::Cancelled => "Re-run the command; reconciliation is safe to repeat",
        }
    }
}

/// Errors that can occur while managing FDW objects.
#[derive(Debug, Error)]
pub enum Error {
    /// A database session could not be opened
    #[error("cannot connect to {target}: {message}")]
    Connection {
        /// Connection target with the password removed
        target: String,
        /// Driver error message
        message: String,
    },

    /// A read-only catalog query failed
    #[error("{operation} failed: {source}")]
    Query {
        /// What was being queried
        operation: String,
        /// Underlying database error
        source: DbError,
    },

    /// A catalog row did not have the expected shape
    #[error("{operation}: unexpected row: {message}")]
    Scan {
        /// What was being queried
        operation: String,
        /// Description of the mismatch
        message: String,
    },

    /// A DDL statement failed
    #[error("{operation} {object} failed: {source}")]
    Mutation {
        /// The kind of change, e.g. "create server"
        operation: String,
        /// The object the change was applied to
        object: String,
        /// Underlying database error
        source: DbError,
    },

    /// No configured secret source produced a value
    #[error("unable to resolve secret: {reason}")]
    SecretUnresolved {
        /// Why the last attempted source failed
        reason: String,
    },

    /// Enum import was requested without a connection to read enums from
    #[error("schema {schema} imports enums but has no enum connection string")]
    EnumConnectionRequired {
        /// Local schema name
        schema: String,
    },

    /// An item reported as modified could not be found in the live state
    #[error("{kind} {name} not found in live state")]
    IdentityNotFound {
        /// Kind of object, e.g. "server"
        kind: &'static str,
        /// Identity that was looked up
        name: String,
    },

    /// The request is invalid before any database work is attempted
    #[error("{0}")]
    InvalidArgument(String),

    /// The operation was cancelled or its deadline passed
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Wrap a failed catalog query.
    pub fn query(operation: impl Into<String>, source: DbError) -> Self {
        match source {
            DbError::Cancelled => Error::Cancelled,
            source => Error::Query {
                operation: operation.into(),
                source,
            },
        }
    }

    /// Wrap a failed DDL statement.
    pub fn mutation(operation: impl Into<String>, object: impl Into<String>, source: DbError) -> Self {
        match source {
            DbError::Cancelled => Error::Cancelled,
            source => Error::Mutation {
                operation: operation.into(),
                object: object.into(),
                source,
            },
        }
    }

    /// Shorthand for a secret resolution failure.
    pub fn secret(reason: impl Into<String>) -> Self {
        Error::SecretUnresolved {
            reason: reason.into(),
        }
    }

    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Connection { .. } => ErrorCategory::Connection,
            Error::Query { .. } | Error::Scan { .. } | Error::Mutation { .. } => {
                ErrorCategory::Database
            }
            Error::SecretUnresolved { .. } => ErrorCategory::Secret,
            Error::EnumConnectionRequired { .. }
            | Error::IdentityNotFound { .. }
            | Error::InvalidArgument(_) => ErrorCategory::Input,
            Error::Cancelled => ErrorCategory::Cancelled,
        }
    }
}

/// Result type for FDW operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_error_keeps_operation() {
        let err = Error::query("list servers", DbError::Backend("relation missing".into()));
        assert_eq!(err.to_string(), "list servers failed: relation missing");
        assert_eq!(err.category(), ErrorCategory::Database);
    }

    #[test]
    fn test_mutation_error_names_object() {
        let err = Error::mutation("create server", "films", DbError::Backend("exists".into()));
        assert_eq!(err.to_string(), "create server films failed: exists");
    }

    #[test]
    fn test_cancelled_backend_error_becomes_cancelled() {
        let err = Error::mutation("drop schema", "s", DbError::Cancelled);
        assert!(matches!(err, Error::Cancelled));
        assert_eq!(err.category(), ErrorCategory::Cancelled);

        let err = Error::query("list schemas", DbError::Cancelled);
        assert!(matches!(err, Error::Cancelled));
    }

    #[test]
    fn test_categories() {
        assert_eq!(Error::secret("x").category(), ErrorCategory::Secret);
        assert_eq!(
            Error::EnumConnectionRequired { schema: "s".into() }.category(),
            ErrorCategory::Input
        );
        assert_eq!(
            Error::Connection {
                target: "postgres://db".into(),
                message: "refused".into()
            }
            .category(),
            ErrorCategory::Connection
        );
    }

    #[test]
    fn test_category_advice_is_present() {
        for category in [
            ErrorCategory::Connection,
            ErrorCategory::Database,
            ErrorCategory::Secret,
            ErrorCategory::Input,
            ErrorCategory::Cancelled,
        ] {
            assert!(!category.description().is_empty());
            assert!(!category.advice().is_empty());
        }
    }
}
