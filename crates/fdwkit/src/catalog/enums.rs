//! Cloning remote enum types so imported foreign tables can reference them.
//!
//! `IMPORT FOREIGN SCHEMA` emits column types qualified with their remote
//! schema, so a missing enum is created locally under the same schema and
//! name. Enums that already exist locally are left alone; their labels are
//! not compared.

use super::{execute, query_map, schema::ensure_schema};
use crate::backend::{Connector, Session};
use crate::connstr;
use crate::error::{Error, Result};
use crate::model::{Schema, SchemaEnum};
use crate::secret::SecretResolver;
use crate::sql::{quote_ident, quote_literal};
use std::collections::BTreeSet;

const LIST_LOCAL_ENUMS: &str = "\
SELECT n.nspname::text, t.typname::text
FROM pg_type t
JOIN pg_namespace n ON n.oid = t.typnamespace
WHERE t.typtype = 'e'
ORDER BY 1, 2";

const LIST_ENUMS_IN_USE: &str = "\
SELECT DISTINCT cuu.udt_schema::text, cuu.udt_name::text
FROM information_schema.column_udt_usage cuu
JOIN pg_namespace n ON n.nspname = cuu.udt_schema::name
JOIN pg_type t ON t.typnamespace = n.oid AND t.typname = cuu.udt_name::name
WHERE t.typtype = 'e' AND cuu.table_schema::text = $1
ORDER BY 1, 2";

const LIST_ENUM_LABELS: &str = "\
SELECT e.enumlabel::text
FROM pg_enum e
JOIN pg_type t ON t.oid = e.enumtypid
JOIN pg_namespace n ON n.oid = t.typnamespace
WHERE n.nspname::text = $1 AND t.typname::text = $2
ORDER BY e.enumsortorder";

/// Enum types defined in the database.
pub fn list_local_enums(session: &mut dyn Session) -> Result<Vec<SchemaEnum>> {
    query_map(session, "list enums", LIST_LOCAL_ENUMS, &[], |row| {
        Ok(SchemaEnum::new(row.text(0)?, row.text(1)?))
    })
}

/// Enum types used by columns of tables in `schema`.
pub fn list_enums_in_use(session: &mut dyn Session, schema: &str) -> Result<Vec<SchemaEnum>> {
    query_map(
        session,
        "list enums in use",
        LIST_ENUMS_IN_USE,
        &[schema],
        |row| Ok(SchemaEnum::new(row.text(0)?, row.text(1)?)),
    )
}

/// Labels of an enum in sort order.
pub fn enum_labels(session: &mut dyn Session, item: &SchemaEnum) -> Result<Vec<String>> {
    query_map(
        session,
        "list enum labels",
        LIST_ENUM_LABELS,
        &[item.schema.as_str(), item.name.as_str()],
        |row| Ok(row.text(0)?.to_string()),
    )
}

pub fn create_enum(session: &mut dyn Session, item: &SchemaEnum, labels: &[String]) -> Result<()> {
    let labels: Vec<String> = labels.iter().map(|l| quote_literal(l)).collect();
    let sql = format!(
        "CREATE TYPE {}.{} AS ENUM ({})",
        quote_ident(&item.schema),
        quote_ident(&item.name),
        labels.join(", ")
    );
    execute(session, "create enum", &item.to_string(), &sql)
}

/// Create locally every enum the remote schema's tables use that does not
/// exist yet. Returns the enums created.
///
/// A secondary session is opened with the schema's enum connection string
/// and closed before returning, on success or failure.
pub fn clone_remote_enums(
    local: &mut dyn Session,
    connector: &dyn Connector,
    secrets: &SecretResolver,
    schema: &Schema,
) -> Result<Vec<SchemaEnum>> {
    let conn = connstr::resolve(&schema.enum_connection, &schema.enum_secret, secrets)?;
    if conn.is_empty() {
        return Err(Error::EnumConnectionRequired {
            schema: schema.local_schema.clone(),
        });
    }

    log::debug!(
        "reading enums for remote schema {} from {}",
        schema.remote_schema,
        connstr::sanitize(&conn)
    );
    let mut remote = connector.connect(&conn)?;
    let result = clone_from(local, remote.as_mut(), &schema.remote_schema);
    if let Err(e) = remote.close() {
        log::warn!("closing enum source connection: {e}");
    }
    result
}

fn clone_from(
    local: &mut dyn Session,
    remote: &mut dyn Session,
    remote_schema: &str,
) -> Result<Vec<SchemaEnum>> {
    let existing: BTreeSet<SchemaEnum> = list_local_enums(local)?.into_iter().collect();
    let missing: Vec<SchemaEnum> = list_enums_in_use(remote, remote_schema)?
        .into_iter()
        .filter(|e| !existing.contains(e))
        .collect();

    if missing.is_empty() {
        log::debug!("no enums to create for remote schema {remote_schema}");
        return Ok(missing);
    }

    for item in &missing {
        let labels = enum_labels(remote, item)?;
        ensure_schema(local, &item.schema)?;
        create_enum(local, item, &labels)?;
        log::info!("enum {item} created");
    }
    Ok(missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::{Journal, MockConnector, MockSession};
    use crate::secret::Secret;

    fn schema_with_enums() -> Schema {
        Schema {
            import_enums: true,
            enum_connection: "postgres://reader@remote/films".into(),
            ..Schema::new("films", "films_local", "sales")
        }
    }

    #[test]
    fn test_creates_only_missing_enums() {
        let journal = Journal::default();
        let mut local = MockSession::new("local", &journal)
            .with_rows("typtype = 'e'", &[&["public", "mood"]])
            .with_rows_for("pg_namespace WHERE", "public", &[&["public"]]);
        let remote = MockSession::new("remote", &journal)
            .with_rows("column_udt_usage", &[&["public", "mood"], &["public", "status"]])
            .with_rows_for("pg_enum", "status", &[&["active"], &["it's done"]]);
        let connector = MockConnector::new(&journal).with_session(remote);

        let created = clone_remote_enums(
            &mut local,
            &connector,
            &SecretResolver::default(),
            &schema_with_enums(),
        )
        .unwrap();

        assert_eq!(created, [SchemaEnum::new("public", "status")]);
        assert_eq!(
            journal.executed(),
            ["CREATE TYPE \"public\".\"status\" AS ENUM ('active', 'it''s done')"]
        );
        assert!(journal.position("remote close").is_some());
    }

    #[test]
    fn test_creates_enum_schema_when_missing() {
        let journal = Journal::default();
        let mut local = MockSession::new("local", &journal);
        let remote = MockSession::new("remote", &journal)
            .with_rows("column_udt_usage", &[&["types", "mood"]])
            .with_rows("pg_enum", &[&["happy"], &["sad"]]);
        let connector = MockConnector::new(&journal).with_session(remote);

        clone_remote_enums(
            &mut local,
            &connector,
            &SecretResolver::default(),
            &schema_with_enums(),
        )
        .unwrap();

        assert_eq!(
            journal.executed(),
            [
                "CREATE SCHEMA \"types\"",
                "CREATE TYPE \"types\".\"mood\" AS ENUM ('happy', 'sad')",
            ]
        );
    }

    #[test]
    fn test_secret_is_applied_to_enum_connection() {
        let journal = Journal::default();
        let mut local = MockSession::new("local", &journal);
        let connector =
            MockConnector::new(&journal).with_session(MockSession::new("remote", &journal));
        let schema = Schema {
            enum_secret: Secret::literal("pw"),
            ..schema_with_enums()
        };

        clone_remote_enums(&mut local, &connector, &SecretResolver::default(), &schema).unwrap();
        assert!(
            journal
                .position("connect postgres://reader:pw@remote/films")
                .is_some()
        );
    }

    #[test]
    fn test_requires_enum_connection() {
        let journal = Journal::default();
        let mut local = MockSession::new("local", &journal);
        let connector = MockConnector::new(&journal);
        let schema = Schema {
            import_enums: true,
            ..Schema::new("films", "films_local", "sales")
        };

        let err = clone_remote_enums(&mut local, &connector, &SecretResolver::default(), &schema)
            .unwrap_err();
        assert!(matches!(err, Error::EnumConnectionRequired { .. }));
        assert!(journal.entries().is_empty());
    }

    #[test]
    fn test_remote_session_closed_on_failure() {
        let journal = Journal::default();
        let mut local = MockSession::new("local", &journal);
        let remote = MockSession::new("remote", &journal).failing_on("column_udt_usage");
        let connector = MockConnector::new(&journal).with_session(remote);

        let result = clone_remote_enums(
            &mut local,
            &connector,
            &SecretResolver::default(),
            &schema_with_enums(),
        );
        assert!(matches!(result, Err(Error::Query { .. })));
        assert!(journal.position("remote close").is_some());
    }
}
