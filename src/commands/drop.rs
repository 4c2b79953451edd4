//! `fdwctl drop` - drop a single FDW object

use anyhow::Result;
use fdwkit::UserMapping;
use fdwkit::catalog::{extension, schema, server, usermap};

use super::with_db;
use crate::Context;
use crate::cli::DropCommand;
use crate::ui;

pub fn run(ctx: &Context, cmd: DropCommand) -> Result<()> {
    with_db(ctx, |db| {
        let session = &mut db.session;
        let dropped = match cmd {
            DropCommand::Extension { name, cascade } => {
                extension::drop_extension(session, name.trim(), cascade)?;
                format!("extension {}", name.trim())
            }
            DropCommand::Server { name, cascade } => {
                server::drop_server(session, name.trim(), cascade)?;
                format!("server {}", name.trim())
            }
            DropCommand::Usermap {
                server,
                local_user,
                drop_local,
            } => {
                let mapping = UserMapping::new(server.trim(), local_user.trim(), "");
                usermap::drop_user_mapping(session, &mapping, drop_local)?;
                format!("user mapping {}@{}", mapping.local_user, mapping.server_name)
            }
            DropCommand::Schema { name, cascade } => {
                schema::drop_schema(session, name.trim(), cascade)?;
                format!("schema {}", name.trim())
            }
        };
        ui::success(&format!("{dropped} dropped"));
        Ok(())
    })
}
