//! `fdwctl edit` - change an existing server or user mapping

use anyhow::Result;
use fdwkit::catalog::{server, usermap};
use fdwkit::{Error, ForeignServer, UserMapping};

use super::with_db;
use crate::Context;
use crate::cli::EditCommand;
use crate::ui;

pub fn run(ctx: &Context, cmd: EditCommand) -> Result<()> {
    with_db(ctx, |db| {
        let session = &mut db.session;
        match cmd {
            EditCommand::Server {
                name,
                host,
                port,
                dbname,
                new_name,
            } => {
                let name = name.trim();
                if server::find_server(session, name)?.is_none() {
                    return Err(not_found("server", name).into());
                }

                let changes = server_changes(name, host, port, dbname);
                let updated = server::update_server(session, &changes)?;
                let new_name = new_name
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty() && *n != name);
                if let Some(new_name) = new_name {
                    server::rename_server(session, name, new_name)?;
                    ui::success(&format!("server {name} renamed to {new_name}"));
                }

                if updated {
                    ui::success(&format!("server {} updated", new_name.unwrap_or(name)));
                } else if new_name.is_none() {
                    ui::info("Nothing to change");
                }
                Ok(())
            }
            EditCommand::Usermap {
                server,
                local_user,
                remote_user,
                remote_password,
            } => {
                let server = server.trim();
                let local_user = local_user.trim();
                if !usermap::list_user_mappings(session, Some(server))?
                    .iter()
                    .any(|m| m.local_user == local_user)
                {
                    return Err(not_found("user mapping", &format!("{local_user}@{server}")).into());
                }

                let changes = UserMapping::new(
                    server,
                    local_user,
                    remote_user.as_deref().map(str::trim).unwrap_or_default(),
                );
                let updated =
                    usermap::update_user_mapping(session, &changes, remote_password.as_deref())?;
                if updated {
                    ui::success(&format!("user mapping {local_user}@{server} updated"));
                } else {
                    ui::info("Nothing to change");
                }
                Ok(())
            }
        }
    })
}

fn not_found(kind: &'static str, name: &str) -> Error {
    Error::IdentityNotFound {
        kind,
        name: name.to_string(),
    }
}

/// Only the given options are set; the rest stay empty and are left alone.
fn server_changes(
    name: &str,
    host: Option<String>,
    port: Option<u16>,
    dbname: Option<String>,
) -> ForeignServer {
    ForeignServer::new(
        name,
        host.unwrap_or_default().trim(),
        port.unwrap_or(0),
        dbname.unwrap_or_default().trim(),
    )
}
