//! Local roles backing user mappings.

use super::{execute, exists, require};
use crate::backend::Session;
use crate::error::Result;
use crate::sql::quote_ident;

const ROLE_EXISTS: &str = "SELECT rolname::text FROM pg_roles WHERE rolname::text = $1";

pub fn user_exists(session: &mut dyn Session, name: &str) -> Result<bool> {
    exists(session, "check user", ROLE_EXISTS, &[name])
}

/// Create a local role unless it already exists. Returns whether it was
/// created.
pub fn ensure_user(session: &mut dyn Session, name: &str) -> Result<bool> {
    require("user", "name", name)?;
    if user_exists(session, name)? {
        log::debug!("user {name} already exists");
        return Ok(false);
    }
    execute(
        session,
        "create user",
        name,
        &format!("CREATE USER {}", quote_ident(name)),
    )?;
    log::info!("user {name} created");
    Ok(true)
}

pub fn drop_user(session: &mut dyn Session, name: &str) -> Result<()> {
    require("user", "name", name)?;
    execute(
        session,
        "drop user",
        name,
        &format!("DROP USER IF EXISTS {}", quote_ident(name)),
    )
}
