//! Session wrapper that reads live state but never changes it.

use super::{DbError, Row, Session};
use crate::sql::mask_passwords;

/// Passes queries through to the wrapped session and records DDL instead of
/// running it. Recorded statements have passwords masked.
pub struct DryRunSession {
    inner: Box<dyn Session>,
    statements: Vec<String>,
}

impl DryRunSession {
    pub fn new(inner: Box<dyn Session>) -> Self {
        Self {
            inner,
            statements: Vec::new(),
        }
    }

    /// Statements that would have been executed, in order.
    pub fn statements(&self) -> &[String] {
        &self.statements
    }
}

impl Session for DryRunSession {
    fn query(&mut self, sql: &str, params: &[&str]) -> Result<Vec<Row>, DbError> {
        self.inner.query(sql, params)
    }

    fn execute(&mut self, sql: &str) -> Result<u64, DbError> {
        let masked = mask_passwords(sql);
        log::info!("dry run: {masked}");
        self.statements.push(masked);
        Ok(0)
    }

    fn close(self: Box<Self>) -> Result<(), DbError> {
        self.inner.close()
    }
}
