//! Installed extensions.

use super::{execute, query_map, require};
use crate::backend::Session;
use crate::error::Result;
use crate::model::Extension;
use crate::sql::quote_ident;

const LIST_EXTENSIONS: &str =
    "SELECT extname::text, extversion::text FROM pg_extension ORDER BY extname";

pub fn list_extensions(session: &mut dyn Session) -> Result<Vec<Extension>> {
    query_map(session, "list extensions", LIST_EXTENSIONS, &[], |row| {
        Ok(Extension {
            name: row.text(0)?.to_string(),
            version: row.text(1)?.to_string(),
        })
    })
}

/// Install an extension. Succeeds if it is already installed.
pub fn create_extension(session: &mut dyn Session, extension: &Extension) -> Result<()> {
    require("extension", "name", &extension.name)?;
    let sql = format!(
        "CREATE EXTENSION IF NOT EXISTS {}",
        quote_ident(&extension.name)
    );
    execute(session, "create extension", &extension.name, &sql)
}

pub fn drop_extension(session: &mut dyn Session, name: &str, cascade: bool) -> Result<()> {
    require("extension", "name", name)?;
    let mut sql = format!("DROP EXTENSION IF EXISTS {}", quote_ident(name));
    if cascade {
        sql.push_str(" CASCADE");
    }
    execute(session, "drop extension", name, &sql)
}
