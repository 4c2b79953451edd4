//! Imported foreign schemas and their grants.

use super::{enums, execute, exists, query_map, require};
use crate::backend::{Connector, Session};
use crate::error::{Error, Result};
use crate::model::{Grant, Schema, SchemaEnum};
use crate::secret::SecretResolver;
use crate::sql::{quote_ident, quote_role};

const LIST_SCHEMAS: &str = "\
SELECT DISTINCT ft.foreign_table_schema::text,
       ft.foreign_server_name::text,
       ftos.option_value::text
FROM information_schema.foreign_tables ft
JOIN information_schema.foreign_table_options ftos
  ON ftos.foreign_table_catalog = ft.foreign_table_catalog
 AND ftos.foreign_table_schema = ft.foreign_table_schema
 AND ftos.foreign_table_name = ft.foreign_table_name
 AND ftos.option_name = 'schema_name'";

const SCHEMA_EXISTS: &str = "SELECT nspname::text FROM pg_namespace WHERE nspname::text = $1";

/// Imported schemas, derived from the foreign tables they contain.
///
/// A schema whose import produced no tables is not visible here.
pub fn list_schemas(session: &mut dyn Session, server: Option<&str>) -> Result<Vec<Schema>> {
    let mut sql = LIST_SCHEMAS.to_string();
    let mut params = Vec::new();
    if let Some(server) = server {
        sql.push_str("\nWHERE ft.foreign_server_name::text = $1");
        params.push(server);
    }
    sql.push_str("\nORDER BY 1, 2, 3");

    query_map(session, "list schemas", &sql, &params, |row| {
        Ok(Schema {
            local_schema: row.text(0)?.to_string(),
            server_name: row.text(1)?.to_string(),
            remote_schema: row.text(2)?.to_string(),
            ..Schema::default()
        })
    })
}

pub fn schema_exists(session: &mut dyn Session, name: &str) -> Result<bool> {
    exists(session, "check schema", SCHEMA_EXISTS, &[name])
}

/// Create a local schema unless it already exists. Returns whether it was
/// created.
pub fn ensure_schema(session: &mut dyn Session, name: &str) -> Result<bool> {
    require("schema", "name", name)?;
    if schema_exists(session, name)? {
        return Ok(false);
    }
    execute(
        session,
        "create schema",
        name,
        &format!("CREATE SCHEMA {}", quote_ident(name)),
    )?;
    Ok(true)
}

/// Drop a local schema. With `cascade`, its foreign tables go too.
pub fn drop_schema(session: &mut dyn Session, name: &str, cascade: bool) -> Result<()> {
    require("schema", "name", name)?;
    let mut sql = format!("DROP SCHEMA IF EXISTS {}", quote_ident(name));
    if cascade {
        sql.push_str(" CASCADE");
    }
    execute(session, "drop schema", name, &sql)
}

/// Fail when enum cloning is requested without a connection string to read
/// the remote enums from.
pub fn check_enum_connection(schema: &Schema) -> Result<()> {
    if schema.import_enums && schema.enum_connection.trim().is_empty() {
        return Err(Error::EnumConnectionRequired {
            schema: schema.local_schema.clone(),
        });
    }
    Ok(())
}

/// Import a remote schema into a local one.
///
/// Preconditions are checked before anything runs. Then, in order: ensure the local schema exists, clone referenced remote enums
/// if requested, import the foreign schema, then apply grants. A failed
/// import leaves the created schema in place. Returns the enums created.
pub fn import_schema(
    session: &mut dyn Session,
    connector: &dyn Connector,
    secrets: &SecretResolver,
    schema: &Schema,
) -> Result<Vec<SchemaEnum>> {
    require("schema", "server", &schema.server_name)?;
    require("schema", "local name", &schema.local_schema)?;
    require("schema", "remote name", &schema.remote_schema)?;
    check_enum_connection(schema)?;

    ensure_schema(session, &schema.local_schema)?;

    let created = if schema.import_enums {
        enums::clone_remote_enums(session, connector, secrets, schema)?
    } else {
        Vec::new()
    };

    let sql = format!(
        "IMPORT FOREIGN SCHEMA {} FROM SERVER {} INTO {}",
        quote_ident(&schema.remote_schema),
        quote_ident(&schema.server_name),
        quote_ident(&schema.local_schema),
    );
    execute(session, "import schema", &schema.local_schema, &sql)?;

    apply_grants(session, &schema.local_schema, &schema.grants)?;
    Ok(created)
}

/// Grant each configured permission, one statement per permission.
pub fn apply_grants(session: &mut dyn Session, schema: &str, grants: &[Grant]) -> Result<()> {
    for grant in grants {
        require("grant", "user", &grant.user)?;
        let role = quote_role(&grant.user);
        if grant.permissions.usage {
            let sql = format!("GRANT USAGE ON SCHEMA {} TO {role}", quote_ident(schema));
            execute(session, "grant usage on", schema, &sql)?;
        }
        if grant.permissions.select {
            let sql = format!(
                "GRANT SELECT ON ALL TABLES IN SCHEMA {} TO {role}",
                quote_ident(schema)
            );
            execute(session, "grant select on", schema, &sql)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::{Journal, MockConnector, MockSession};
    use crate::error::Error;
    use crate::model::Permissions;

    #[test]
    fn test_list_schemas() {
        let journal = Journal::default();
        let mut session = MockSession::new("local", &journal).with_rows_for(
            "foreign_table_options",
            "films",
            &[&["films_local", "films", "public"]],
        );
        let schemas = list_schemas(&mut session, Some("films")).unwrap();
        assert_eq!(schemas.len(), 1);
        assert_eq!(schemas[0].local_schema, "films_local");
        assert_eq!(schemas[0].remote_schema, "public");
        assert_eq!(schemas[0].server_name, "films");
    }

    #[test]
    fn test_ensure_schema() {
        let journal = Journal::default();
        let mut session =
            MockSession::new("local", &journal).with_rows_for("pg_namespace", "exists", &[&["exists"]]);
        assert!(!ensure_schema(&mut session, "exists").unwrap());
        assert!(ensure_schema(&mut session, "fresh").unwrap());
        assert_eq!(journal.executed(), ["CREATE SCHEMA \"fresh\""]);
    }

    #[test]
    fn test_drop_schema() {
        let journal = Journal::default();
        let mut session = MockSession::new("local", &journal);
        drop_schema(&mut session, "s", true).unwrap();
        drop_schema(&mut session, "t", false).unwrap();
        assert_eq!(
            journal.executed(),
            ["DROP SCHEMA IF EXISTS \"s\" CASCADE", "DROP SCHEMA IF EXISTS \"t\""]
        );
    }

    #[test]
    fn test_import_schema_with_grants() {
        let journal = Journal::default();
        let mut session = MockSession::new("local", &journal);
        let connector = MockConnector::new(&journal);
        let schema = Schema {
            grants: vec![
                Grant::new("reader"),
                Grant {
                    user: "auditor".into(),
                    permissions: Permissions {
                        usage: true,
                        select: false,
                    },
                },
            ],
            ..Schema::new("films", "films_local", "public")
        };

        let created =
            import_schema(&mut session, &connector, &SecretResolver::default(), &schema).unwrap();
        assert!(created.is_empty());
        assert_eq!(
            journal.executed(),
            [
                "CREATE SCHEMA \"films_local\"",
                "IMPORT FOREIGN SCHEMA \"public\" FROM SERVER \"films\" INTO \"films_local\"",
                "GRANT USAGE ON SCHEMA \"films_local\" TO \"reader\"",
                "GRANT SELECT ON ALL TABLES IN SCHEMA \"films_local\" TO \"reader\"",
                "GRANT USAGE ON SCHEMA \"films_local\" TO \"auditor\"",
            ]
        );
        assert!(journal.position("connect").is_none());
    }

    #[test]
    fn test_import_schema_clones_enums_before_import() {
        let journal = Journal::default();
        let mut session = MockSession::new("local", &journal);
        let remote = MockSession::new("remote", &journal)
            .with_rows("column_udt_usage", &[&["public", "mood"]])
            .with_rows("pg_enum", &[&["happy"]]);
        let connector = MockConnector::new(&journal).with_session(remote);
        let schema = Schema {
            import_enums: true,
            enum_connection: "postgres://reader@remote/films".into(),
            ..Schema::new("films", "films_local", "public")
        };

        import_schema(&mut session, &connector, &SecretResolver::default(), &schema).unwrap();

        let create_type = journal.position("CREATE TYPE").unwrap();
        let import = journal.position("IMPORT FOREIGN SCHEMA").unwrap();
        assert!(create_type < import);
        assert!(journal.position("remote close").unwrap() < import);
    }

    #[test]
    fn test_import_schema_stops_on_grant_failure() {
        let journal = Journal::default();
        let mut session = MockSession::new("local", &journal).failing_on("GRANT USAGE");
        let connector = MockConnector::new(&journal);
        let schema = Schema {
            grants: vec![Grant::new("reader")],
            ..Schema::new("films", "films_local", "public")
        };

        let err = import_schema(&mut session, &connector, &SecretResolver::default(), &schema)
            .unwrap_err();
        assert!(matches!(err, Error::Mutation { .. }));
        assert!(journal.position("GRANT SELECT").is_none());
    }

    #[test]
    fn test_import_schema_requires_names() {
        let journal = Journal::default();
        let mut session = MockSession::new("local", &journal);
        let connector = MockConnector::new(&journal);
        let schema = Schema::new("films", "films_local", "");
        assert!(matches!(
            import_schema(&mut session, &connector, &SecretResolver::default(), &schema),
            Err(Error::InvalidArgument(_))
        ));
        assert!(journal.entries().is_empty());
    }

    #[test]
    fn test_import_schema_without_enum_connection_runs_nothing() {
        let journal = Journal::default();
        let mut session = MockSession::new("local", &journal);
        let connector = MockConnector::new(&journal);
        let schema = Schema {
            import_enums: true,
            enum_connection: "  ".into(),
            ..Schema::new("films", "films_local", "public")
        };

        let err = import_schema(&mut session, &connector, &SecretResolver::default(), &schema)
            .unwrap_err();
        assert!(matches!(err, Error::EnumConnectionRequired { ref schema } if schema == "films_local"));
        assert!(journal.entries().is_empty());
    }

    #[test]
    fn test_check_enum_connection() {
        let plain = Schema::new("films", "films_local", "public");
        assert!(check_enum_connection(&plain).is_ok());

        let with_conn = Schema {
            import_enums: true,
            enum_connection: "postgres://reader@remote/films".into(),
            ..plain.clone()
        };
        assert!(check_enum_connection(&with_conn).is_ok());

        let without_conn = Schema {
            import_enums: true,
            ..plain
        };
        assert!(check_enum_connection(&without_conn).is_err());
    }

    #[test]
    fn test_grant_to_public_is_not_quoted() {
        let journal = Journal::default();
        let mut session = MockSession::new("local", &journal);
        apply_grants(&mut session, "films_local", &[Grant::new("public")]).unwrap();
        assert_eq!(
            journal.executed(),
            [
                "GRANT USAGE ON SCHEMA \"films_local\" TO PUBLIC",
                "GRANT SELECT ON ALL TABLES IN SCHEMA \"films_local\" TO PUBLIC",
            ]
        );
    }
}
