//! User mappings.

use super::{execute, query_map, require, user};
use crate::backend::Session;
use crate::error::Result;
use crate::model::UserMapping;
use crate::secret::{Secret, SecretResolver};
use crate::sql::{quote_ident, quote_literal, quote_role};

const LIST_USER_MAPPINGS: &str = "\
SELECT um.authorization_identifier::text,
       um.foreign_server_name::text,
       COALESCE(ru.option_value, '')::text,
       rp.option_value::text
FROM information_schema.user_mappings um
LEFT JOIN information_schema.user_mapping_options ru
       ON ru.authorization_identifier = um.authorization_identifier
      AND ru.foreign_server_name = um.foreign_server_name
      AND ru.option_name = 'user'
LEFT JOIN information_schema.user_mapping_options rp
       ON rp.authorization_identifier = um.authorization_identifier
      AND rp.foreign_server_name = um.foreign_server_name
      AND rp.option_name = 'password'";

/// User mappings, optionally restricted to one server.
///
/// The stored password is only visible to superusers and the mapped role;
/// otherwise it reads as unset.
pub fn list_user_mappings(
    session: &mut dyn Session,
    server: Option<&str>,
) -> Result<Vec<UserMapping>> {
    let mut sql = LIST_USER_MAPPINGS.to_string();
    let mut params = Vec::new();
    if let Some(server) = server {
        sql.push_str("\nWHERE um.foreign_server_name::text = $1");
        params.push(server);
    }
    sql.push_str("\nORDER BY um.foreign_server_name, um.authorization_identifier");

    query_map(session, "list user mappings", &sql, &params, |row| {
        Ok(UserMapping {
            local_user: row.text(0)?.to_string(),
            server_name: row.text(1)?.to_string(),
            remote_user: row.text(2)?.to_string(),
            remote_secret: Secret {
                value: row.opt_text(3)?.map(str::to_string),
                ..Secret::default()
            },
        })
    })
}

/// Create a user mapping, creating the local role first if needed.
///
/// The password comes from the mapping's secret; with no secret defined
/// the mapping is created with an empty password.
pub fn create_user_mapping(
    session: &mut dyn Session,
    secrets: &SecretResolver,
    mapping: &UserMapping,
) -> Result<()> {
    require("user mapping", "server", &mapping.server_name)?;
    require("user mapping", "local user", &mapping.local_user)?;
    let password = secrets
        .resolve_optional(&mapping.remote_secret)?
        .unwrap_or_default();

    if !mapping.is_public() {
        user::ensure_user(session, &mapping.local_user)?;
    }
    let sql = format!(
        "CREATE USER MAPPING FOR {} SERVER {} OPTIONS (user {}, password {})",
        quote_role(&mapping.local_user),
        quote_ident(&mapping.server_name),
        quote_literal(&mapping.remote_user),
        quote_literal(&password),
    );
    execute(session, "create user mapping", &describe(mapping), &sql)
}

/// Set the mapping's remote user and password.
///
/// An empty remote user and a `None` password are left unchanged. The
/// password is always changed with `SET`: mappings created here always
/// carry a password option, and the catalog hides stored passwords from
/// non-superusers, so its absence there cannot be trusted.
/// Returns `false` without issuing a statement if there is nothing to set.
pub fn update_user_mapping(
    session: &mut dyn Session,
    mapping: &UserMapping,
    password: Option<&str>,
) -> Result<bool> {
    require("user mapping", "server", &mapping.server_name)?;
    require("user mapping", "local user", &mapping.local_user)?;

    let mut options = Vec::new();
    if !mapping.remote_user.is_empty() {
        options.push(format!("SET user {}", quote_literal(&mapping.remote_user)));
    }
    if let Some(password) = password {
        options.push(format!("SET password {}", quote_literal(password)));
    }
    if options.is_empty() {
        log::debug!("user mapping {}: nothing to update", describe(mapping));
        return Ok(false);
    }

    let sql = format!(
        "ALTER USER MAPPING FOR {} SERVER {} OPTIONS ({})",
        quote_role(&mapping.local_user),
        quote_ident(&mapping.server_name),
        options.join(", ")
    );
    execute(session, "update user mapping", &describe(mapping), &sql)?;
    Ok(true)
}

/// Drop a user mapping, and optionally the local role it maps.
pub fn drop_user_mapping(
    session: &mut dyn Session,
    mapping: &UserMapping,
    drop_local_user: bool,
) -> Result<()> {
    require("user mapping", "server", &mapping.server_name)?;
    require("user mapping", "local user", &mapping.local_user)?;
    let sql = format!(
        "DROP USER MAPPING IF EXISTS FOR {} SERVER {}",
        quote_role(&mapping.local_user),
        quote_ident(&mapping.server_name)
    );
    execute(session, "drop user mapping", &describe(mapping), &sql)?;

    if drop_local_user && !mapping.is_public() {
        user::drop_user(session, &mapping.local_user)?;
    }
    Ok(())
}

fn describe(mapping: &UserMapping) -> String {
    format!("{}@{}", mapping.local_user, mapping.server_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Row;
    use crate::backend::mock::{Journal, MockSession};
    use crate::error::Error;

    #[test]
    fn test_list_user_mappings() {
        let journal = Journal::default();
        let mut session = MockSession::new("local", &journal).with_row_values(
            "information_schema.user_mappings",
            Some("films"),
            vec![
                Row::from_strs(&["app", "films", "remote_app", "pw"]),
                Row::new(vec![
                    Some("PUBLIC".into()),
                    Some("films".into()),
                    Some(String::new()),
                    None,
                ]),
            ],
        );

        let mappings = list_user_mappings(&mut session, Some("films")).unwrap();
        assert_eq!(mappings.len(), 2);
        assert_eq!(mappings[0].local_user, "app");
        assert_eq!(mappings[0].remote_user, "remote_app");
        assert_eq!(mappings[0].stored_password(), Some("pw"));
        assert_eq!(mappings[1].stored_password(), None);

        let entries = journal.entries();
        assert!(entries[0].contains("WHERE um.foreign_server_name::text = $1"));
        assert!(entries[0].contains("[\"films\"]"));
    }

    #[test]
    fn test_list_all_user_mappings_has_no_filter() {
        let journal = Journal::default();
        let mut session = MockSession::new("local", &journal);
        list_user_mappings(&mut session, None).unwrap();
        assert!(!journal.entries()[0].contains("WHERE"));
    }

    #[test]
    fn test_create_user_mapping_ensures_user_first() {
        let journal = Journal::default();
        let mut session = MockSession::new("local", &journal);
        let mapping =
            UserMapping::new("films", "app", "remote_app").with_secret(Secret::literal("pw"));
        create_user_mapping(&mut session, &SecretResolver::default(), &mapping).unwrap();
        assert_eq!(
            journal.executed(),
            [
                "CREATE USER \"app\"",
                "CREATE USER MAPPING FOR \"app\" SERVER \"films\" \
                 OPTIONS (user 'remote_app', password 'pw')",
            ]
        );
    }

    #[test]
    fn test_create_user_mapping_without_secret_uses_empty_password() {
        let journal = Journal::default();
        let mut session =
            MockSession::new("local", &journal).with_rows_for("pg_roles", "app", &[&["app"]]);
        let mapping = UserMapping::new("films", "app", "remote_app");
        create_user_mapping(&mut session, &SecretResolver::default(), &mapping).unwrap();
        assert_eq!(
            journal.executed(),
            ["CREATE USER MAPPING FOR \"app\" SERVER \"films\" \
              OPTIONS (user 'remote_app', password '')"]
        );
    }

    #[test]
    fn test_create_public_mapping_skips_role() {
        let journal = Journal::default();
        let mut session = MockSession::new("local", &journal);
        let mapping = UserMapping::new("films", "public", "reader");
        create_user_mapping(&mut session, &SecretResolver::default(), &mapping).unwrap();
        assert_eq!(
            journal.executed(),
            ["CREATE USER MAPPING FOR PUBLIC SERVER \"films\" \
              OPTIONS (user 'reader', password '')"]
        );
        assert!(journal.position("pg_roles").is_none());
    }

    #[test]
    fn test_create_user_mapping_fails_on_unresolved_secret() {
        let journal = Journal::default();
        let mut session = MockSession::new("local", &journal);
        let mapping = UserMapping::new("films", "app", "r")
            .with_secret(Secret::env("FDWKIT_TEST_USERMAP_UNSET"));
        let err =
            create_user_mapping(&mut session, &SecretResolver::default(), &mapping).unwrap_err();
        assert!(matches!(err, Error::SecretUnresolved { .. }));
        assert!(journal.entries().is_empty());
    }

    #[test]
    fn test_update_user_mapping_partial() {
        let journal = Journal::default();
        let mut session = MockSession::new("local", &journal);
        let mapping = UserMapping::new("films", "app", "");
        assert!(update_user_mapping(&mut session, &mapping, Some("new")).unwrap());
        assert_eq!(
            journal.executed(),
            ["ALTER USER MAPPING FOR \"app\" SERVER \"films\" OPTIONS (SET password 'new')"]
        );
    }

    #[test]
    fn test_update_user_mapping_always_sets_password() {
        let journal = Journal::default();
        let mut session = MockSession::new("local", &journal);
        let mapping = UserMapping::new("films", "app", "r2");
        update_user_mapping(&mut session, &mapping, Some("pw")).unwrap();
        assert_eq!(
            journal.executed(),
            ["ALTER USER MAPPING FOR \"app\" SERVER \"films\" \
              OPTIONS (SET user 'r2', SET password 'pw')"]
        );
        assert!(journal.position("ADD password").is_none());
    }

    #[test]
    fn test_update_user_mapping_with_nothing_to_set() {
        let journal = Journal::default();
        let mut session = MockSession::new("local", &journal);
        let mapping = UserMapping::new("films", "app", "");
        assert!(!update_user_mapping(&mut session, &mapping, None).unwrap());
        assert!(journal.executed().is_empty());
    }

    #[test]
    fn test_drop_user_mapping_optionally_drops_role() {
        let journal = Journal::default();
        let mut session = MockSession::new("local", &journal);
        let mapping = UserMapping::new("films", "app", "r");
        drop_user_mapping(&mut session, &mapping, false).unwrap();
        drop_user_mapping(&mut session, &mapping, true).unwrap();
        assert_eq!(
            journal.executed(),
            [
                "DROP USER MAPPING IF EXISTS FOR \"app\" SERVER \"films\"",
                "DROP USER MAPPING IF EXISTS FOR \"app\" SERVER \"films\"",
                "DROP USER IF EXISTS \"app\"",
            ]
        );
    }
}
