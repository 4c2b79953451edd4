//! `fdwctl list` - show live FDW objects

use anyhow::Result;
use fdwkit::catalog::{extension, schema, server, usermap};
use fdwkit::{Extension, ForeignServer, Schema, UserMapping};
use serde::Serialize;

use super::with_db;
use crate::Context;
use crate::cli::{ListArgs, ListCommand};
use crate::ui;

pub fn run(ctx: &Context, args: ListArgs) -> Result<()> {
    let json = args.json;
    with_db(ctx, |db| {
        let session = &mut db.session;
        match args.target {
            ListCommand::Server => {
                let servers = server::list_servers(session)?;
                emit(json, &servers, || {
                    ui::table(
                        &["NAME", "WRAPPER", "HOST", "PORT", "DBNAME", "OWNER"],
                        &server_rows(&servers),
                        "no foreign servers",
                    );
                })
            }
            ListCommand::Extension => {
                let extensions = extension::list_extensions(session)?;
                emit(json, &extensions, || {
                    ui::table(
                        &["NAME", "VERSION"],
                        &extension_rows(&extensions),
                        "no extensions",
                    );
                })
            }
            ListCommand::Usermap { server } => {
                let mappings = usermap::list_user_mappings(session, server.as_deref())?;
                emit(json, &mappings, || {
                    ui::table(
                        &["SERVER", "LOCAL USER", "REMOTE USER", "PASSWORD"],
                        &usermap_rows(&mappings),
                        "no user mappings",
                    );
                })
            }
            ListCommand::Schema { server } => {
                let schemas = schema::list_schemas(session, server.as_deref())?;
                emit(json, &schemas, || {
                    ui::table(
                        &["LOCAL SCHEMA", "SERVER", "REMOTE SCHEMA"],
                        &schema_rows(&schemas),
                        "no imported schemas",
                    );
                })
            }
        }
    })
}

fn emit<T: Serialize>(json: bool, items: &[T], table: impl FnOnce()) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(items)?);
    } else {
        table();
    }
    Ok(())
}

fn server_rows(servers: &[ForeignServer]) -> Vec<Vec<String>> {
    servers
        .iter()
        .map(|s| {
            vec![
                s.name.clone(),
                s.wrapper.clone(),
                s.host.clone(),
                if s.port == 0 {
                    String::new()
                } else {
                    s.port.to_string()
                },
                s.database.clone(),
                s.owner.clone(),
            ]
        })
        .collect()
}

fn extension_rows(extensions: &[Extension]) -> Vec<Vec<String>> {
    extensions
        .iter()
        .map(|e| vec![e.name.clone(), e.version.clone()])
        .collect()
}

/// Passwords are never printed, only whether one is set.
fn usermap_rows(mappings: &[UserMapping]) -> Vec<Vec<String>> {
    mappings
        .iter()
        .map(|m| {
            vec![
                m.server_name.clone(),
                m.local_user.clone(),
                m.remote_user.clone(),
                if m.stored_password().is_some() {
                    "set".to_string()
                } else {
                    String::new()
                },
            ]
        })
        .collect()
}

fn schema_rows(schemas: &[Schema]) -> Vec<Vec<String>> {
    schemas
        .iter()
        .map(|s| {
            vec![
                s.local_schema.clone(),
                s.server_name.clone(),
                s.remote_schema.clone(),
            ]
        })
        .collect()
}
