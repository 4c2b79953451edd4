//! Command implementations
//!
//! Every command opens one session on the managed database, does its work
//! through `fdwkit`, and closes the session before returning.

pub mod apply;
pub mod create;
pub mod drop;
pub mod edit;
pub mod list;

use anyhow::{Context as AnyhowContext, Result, bail};
use fdwkit::{PostgresConnector, PostgresSession, SecretResolver, Session, connstr};

use crate::Context;
use crate::config::AppConfig;
use crate::paths;

/// Load the config file named by `--config`, or the default one.
pub fn load_config(ctx: &Context) -> Result<AppConfig> {
    let path = paths::resolve_config(ctx.config.as_deref())?;
    AppConfig::load(&path)
}

/// Connection string with any configured secret applied.
///
/// `--connection` / `FDWCTL_CONNECTION` win over the config file.
pub fn connection_string(ctx: &Context, config: &AppConfig, secrets: &SecretResolver) -> Result<String> {
    let raw = ctx
        .connection
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .unwrap_or(&config.connection);
    if raw.trim().is_empty() {
        bail!(
            "No connection string. Pass --connection, set FDWCTL_CONNECTION, \
             or set `connection` in the config file"
        );
    }
    Ok(connstr::resolve(raw.trim(), &config.connection_secret, secrets)?)
}

/// Everything a command needs to talk to the database.
pub struct Db {
    pub session: PostgresSession,
    pub connector: PostgresConnector,
    pub secrets: SecretResolver,
}

impl Db {
    /// Open the primary session.
    pub fn open(ctx: &Context, config: &AppConfig) -> Result<Self> {
        let secrets = SecretResolver::new(ctx.cancel.clone());
        let conn = connection_string(ctx, config, &secrets)?;
        log::debug!("connecting to {}", connstr::sanitize(&conn));
        let session = PostgresSession::connect(&conn, ctx.cancel.clone())
            .with_context(|| format!("Could not connect to {}", connstr::sanitize(&conn)))?;
        Ok(Self {
            session,
            connector: PostgresConnector::new(ctx.cancel.clone()),
            secrets,
        })
    }

    /// Load the config and open a session in one go.
    pub fn from_context(ctx: &Context) -> Result<Self> {
        let config = load_config(ctx)?;
        Self::open(ctx, &config)
    }
}

/// Close a session, logging instead of failing.
pub fn close(session: Box<dyn Session>) {
    if let Err(e) = session.close() {
        log::warn!("closing connection: {e}");
    }
}

/// Run `f` against the session and close it afterwards, whatever happened.
pub fn with_db<T>(ctx: &Context, f: impl FnOnce(&mut Db) -> Result<T>) -> Result<T> {
    let mut db = Db::from_context(ctx)?;
    let result = f(&mut db);
    close(Box::new(db.session));
    result
}
