//! Session backed by a live Postgres server.

use super::{Connector, DbError, Row, Session};
use crate::cancel::CancelToken;
use crate::connstr;
use crate::error::{Error, Result};
use crate::sql::mask_passwords;
use postgres::types::ToSql;
use postgres::{Client, Config, NoTls};

/// A synchronous connection to Postgres.
///
/// Server notices (e.g. "schema already exists, skipping") are forwarded to
/// the logger. The cancel token is checked before each statement, and its
/// deadline, if any, bounds the connect timeout.
pub struct PostgresSession {
    client: Client,
    cancel: CancelToken,
}

impl PostgresSession {
    /// Open a session. The connection string must already carry any
    /// resolved password.
    pub fn connect(connection_string: &str, cancel: CancelToken) -> Result<Self> {
        if connection_string.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "a database connection string is required".into(),
            ));
        }
        cancel.check()?;

        let target = connstr::sanitize(connection_string);
        log::debug!("connecting to {target}");
        let mut config: Config = connection_string.parse().map_err(|e: postgres::Error| {
            Error::Connection {
                target: target.clone(),
                message: describe(&e),
            }
        })?;
        config.notice_callback(|notice| match notice.severity() {
            "WARNING" => log::warn!("{}", notice.message()),
            _ => log::info!("{}", notice.message()),
        });
        if let Some(remaining) = cancel.remaining() {
            config.connect_timeout(remaining);
        }

        let client = config.connect(NoTls).map_err(|e| Error::Connection {
            target: target.clone(),
            message: describe(&e),
        })?;
        log::debug!("connected to {target}");
        Ok(Self { client, cancel })
    }
}

impl Session for PostgresSession {
    fn query(&mut self, sql: &str, params: &[&str]) -> std::result::Result<Vec<Row>, DbError> {
        if self.cancel.is_cancelled() {
            return Err(DbError::Cancelled);
        }
        log::trace!("query: {sql}, args: {params:?}");
        let bound: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
        let rows = self
            .client
            .query(sql, &bound)
            .map_err(|e| DbError::Backend(describe(&e)))?;

        rows.iter()
            .map(|row| {
                (0..row.len())
                    .map(|i| {
                        row.try_get::<_, Option<String>>(i)
                            .map_err(|e| DbError::Backend(describe(&e)))
                    })
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map(Row::new)
            })
            .collect()
    }

    fn execute(&mut self, sql: &str) -> std::result::Result<u64, DbError> {
        if self.cancel.is_cancelled() {
            return Err(DbError::Cancelled);
        }
        log::trace!("query: {}", mask_passwords(sql));
        self.client
            .execute(sql, &[])
            .map_err(|e| DbError::Backend(describe(&e)))
    }

    fn close(self: Box<Self>) -> std::result::Result<(), DbError> {
        log::trace!("closing connection");
        self.client
            .close()
            .map_err(|e| DbError::Backend(describe(&e)))
    }
}

/// Opens [`PostgresSession`]s sharing one cancel token.
#[derive(Debug, Clone, Default)]
pub struct PostgresConnector {
    cancel: CancelToken,
}

impl PostgresConnector {
    pub fn new(cancel: CancelToken) -> Self {
        Self { cancel }
    }
}

impl Connector for PostgresConnector {
    fn connect(&self, connection_string: &str) -> Result<Box<dyn Session>> {
        let session = PostgresSession::connect(connection_string, self.cancel.clone())?;
        Ok(Box::new(session))
    }
}

/// Prefer the server's message over the driver's wrapper text.
fn describe(err: &postgres::Error) -> String {
    match err.as_db_error() {
        Some(db) => match db.detail() {
            Some(detail) => format!("{} ({})", db.message(), detail),
            None => db.message().to_string(),
        },
        None => err.to_string(),
    }
}
