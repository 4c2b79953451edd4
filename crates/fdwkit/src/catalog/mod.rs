//! Catalog accessors: read and change FDW objects through a [`Session`].
//!
//! Readers return domain types from [`crate::model`]. Writers issue one DDL
//! statement per call (plus any prerequisite statement noted on the
//! function) and log the statement with passwords masked.

pub mod enums;
pub mod extension;
pub mod schema;
pub mod server;
pub mod user;
pub mod usermap;

use crate::backend::{Row, ScanError, Session};
use crate::error::{Error, Result};
use crate::sql::mask_passwords;

/// Run a query and map each row, attributing failures to `operation`.
pub(crate) fn query_map<T>(
    session: &mut dyn Session,
    operation: &str,
    sql: &str,
    params: &[&str],
    map: impl Fn(&Row) -> std::result::Result<T, ScanError>,
) -> Result<Vec<T>> {
    let rows = session
        .query(sql, params)
        .map_err(|e| Error::query(operation, e))?;
    rows.iter()
        .map(|row| {
            map(row).map_err(|e| Error::Scan {
                operation: operation.to_string(),
                message: e.to_string(),
            })
        })
        .collect()
}

/// Whether a query returns any rows.
pub(crate) fn exists(
    session: &mut dyn Session,
    operation: &str,
    sql: &str,
    params: &[&str],
) -> Result<bool> {
    let rows = session
        .query(sql, params)
        .map_err(|e| Error::query(operation, e))?;
    Ok(!rows.is_empty())
}

/// Execute one DDL statement.
pub(crate) fn execute(
    session: &mut dyn Session,
    operation: &str,
    object: &str,
    sql: &str,
) -> Result<()> {
    log::debug!("{operation} {object}: {}", mask_passwords(sql));
    session
        .execute(sql)
        .map_err(|e| Error::mutation(operation, object, e))?;
    Ok(())
}

/// Reject empty identity fields before any SQL is built.
pub(crate) fn require(kind: &str, field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidArgument(format!("{kind} {field} is required")));
    }
    Ok(())
}
