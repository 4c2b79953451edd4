//! `fdwctl create` - create a single FDW object

use anyhow::Result;
use fdwkit::catalog::{extension, schema, server, usermap};
use fdwkit::{Extension, ForeignServer, Grant, Schema, Secret, UserMapping};

use super::with_db;
use crate::Context;
use crate::cli::CreateCommand;
use crate::ui;

pub fn run(ctx: &Context, cmd: CreateCommand) -> Result<()> {
    with_db(ctx, |db| match cmd {
        CreateCommand::Server {
            name,
            host,
            port,
            dbname,
            wrapper,
        } => {
            let target = server_from_args(name, host, port, dbname, wrapper);
            server::create_server(&mut db.session, &target)?;
            ui::success(&format!("server {} created", target.name));
            Ok(())
        }
        CreateCommand::Extension { name } => {
            extension::create_extension(&mut db.session, &Extension::new(name.trim()))?;
            ui::success(&format!("extension {} created", name.trim()));
            Ok(())
        }
        CreateCommand::Usermap {
            server,
            local_user,
            remote_user,
            remote_password,
        } => {
            let mapping = UserMapping::new(server.trim(), local_user.trim(), remote_user.trim())
                .with_secret(remote_password.map(Secret::literal).unwrap_or_default());
            usermap::create_user_mapping(&mut db.session, &db.secrets, &mapping)?;
            ui::success(&format!(
                "user mapping {} -> {} created",
                mapping.local_user, mapping.remote_user
            ));
            Ok(())
        }
        CreateCommand::Schema {
            server,
            local_schema,
            remote_schema,
            import_enums,
            enum_connection,
            grants,
        } => {
            let target = Schema {
                import_enums,
                enum_connection: enum_connection.unwrap_or_default(),
                grants: grants.iter().map(|g| Grant::new(g.trim())).collect(),
                ..Schema::new(server.trim(), local_schema.trim(), remote_schema.trim())
            };
            let enums = schema::import_schema(&mut db.session, &db.connector, &db.secrets, &target)?;
            for item in &enums {
                ui::dim(&format!("enum {item} created"));
            }
            ui::success(&format!("foreign schema {} imported", target.local_schema));
            Ok(())
        }
    })
}

/// Build a server, naming it after its options when no name is given.
fn server_from_args(
    name: Option<String>,
    host: String,
    port: u16,
    dbname: String,
    wrapper: String,
) -> ForeignServer {
    let host = host.trim();
    let dbname = dbname.trim();
    let name = name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| ForeignServer::default_name(host, port, dbname));
    ForeignServer {
        wrapper: wrapper.trim().to_string(),
        ..ForeignServer::new(name, host, port, dbname)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_name_defaults_from_options() {
        let server = server_from_args(
            None,
            "films.db.internal".into(),
            5432,
            "films".into(),
            "postgres_fdw".into(),
        );
        assert_eq!(server.name, "films-db-internal_5432_films");
        assert_eq!(server.host, "films.db.internal");
    }

    #[test]
    fn test_explicit_server_name_is_trimmed() {
        let server = server_from_args(
            Some(" films ".into()),
            "h".into(),
            5432,
            "d".into(),
            "postgres_fdw".into(),
        );
        assert_eq!(server.name, "films");
    }

    #[test]
    fn test_blank_server_name_falls_back_to_default() {
        let server = server_from_args(Some("  ".into()), "h".into(), 1, "d".into(), "w".into());
        assert_eq!(server.name, "h_1_d");
        assert_eq!(server.wrapper, "w");
    }
}
