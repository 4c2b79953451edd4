//! Backend abstraction for database sessions.
//!
//! The [`Session`] trait is the narrow interface the catalog accessors use:
//! parameterized queries returning text columns, and single DDL statements.
//! This allows for different implementations:
//! - [`pg::PostgresSession`] for a real server
//! - [`dry_run::DryRunSession`] to record statements without running them
//! - an in-memory recording session in tests

pub mod dry_run;
pub mod pg;

#[cfg(test)]
pub(crate) mod mock;

use crate::error::Result;
use thiserror::Error;

/// Error reported by a [`Session`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DbError {
    /// The server or driver rejected the statement
    #[error("{0}")]
    Backend(String),
    /// The session observed cancellation before sending the statement
    #[error("cancelled")]
    Cancelled,
}

/// Error reading a column from a [`Row`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("column {0} is missing")]
    Missing(usize),
    #[error("column {0} is NULL")]
    Null(usize),
    #[error("column {index}: {message}")]
    Invalid { index: usize, message: String },
}

/// A result row. Every column is read as nullable text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    values: Vec<Option<String>>,
}

impl Row {
    pub fn new(values: Vec<Option<String>>) -> Self {
        Self { values }
    }

    /// Row of non-NULL values.
    pub fn from_strs(values: &[&str]) -> Self {
        Self::new(values.iter().map(|v| Some((*v).to_string())).collect())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// A non-NULL text column.
    pub fn text(&self, index: usize) -> std::result::Result<&str, ScanError> {
        self.opt_text(index)?.ok_or(ScanError::Null(index))
    }

    /// A nullable text column.
    pub fn opt_text(&self, index: usize) -> std::result::Result<Option<&str>, ScanError> {
        self.values
            .get(index)
            .map(Option::as_deref)
            .ok_or(ScanError::Missing(index))
    }

    /// A port column; empty text means unset (0).
    pub fn port(&self, index: usize) -> std::result::Result<u16, ScanError> {
        match self.opt_text(index)?.map(str::trim) {
            None | Some("") => Ok(0),
            Some(v) => v.parse().map_err(|_| ScanError::Invalid {
                index,
                message: format!("{v:?} is not a port number"),
            }),
        }
    }
}

/// An open database session.
pub trait Session {
    /// Run a read-only query with text parameters bound to `$1..$n`.
    fn query(&mut self, sql: &str, params: &[&str]) -> std::result::Result<Vec<Row>, DbError>;

    /// Run a single statement that returns no rows.
    fn execute(&mut self, sql: &str) -> std::result::Result<u64, DbError>;

    /// Close the session.
    fn close(self: Box<Self>) -> std::result::Result<(), DbError>;
}

/// Opens secondary sessions, e.g. to the remote database when cloning enums.
pub trait Connector {
    fn connect(&self, connection_string: &str) -> Result<Box<dyn Session>>;
}
