//! Foreign servers.

use super::{execute, query_map, require};
use crate::backend::Session;
use crate::error::Result;
use crate::model::ForeignServer;
use crate::sql::{quote_ident, quote_literal};

const LIST_SERVERS: &str = "\
SELECT fs.foreign_server_name::text,
       fs.foreign_data_wrapper_name::text,
       fs.authorization_identifier::text,
       COALESCE(fsoh.option_value, '')::text,
       COALESCE(fsop.option_value, '')::text,
       COALESCE(fsod.option_value, '')::text
FROM information_schema.foreign_servers fs
LEFT JOIN information_schema.foreign_server_options fsoh
       ON fsoh.foreign_server_name = fs.foreign_server_name AND fsoh.option_name = 'host'
LEFT JOIN information_schema.foreign_server_options fsop
       ON fsop.foreign_server_name = fs.foreign_server_name AND fsop.option_name = 'port'
LEFT JOIN information_schema.foreign_server_options fsod
       ON fsod.foreign_server_name = fs.foreign_server_name AND fsod.option_name = 'dbname'
ORDER BY fs.foreign_server_name";

/// Servers visible to the connecting role, without nested objects.
pub fn list_servers(session: &mut dyn Session) -> Result<Vec<ForeignServer>> {
    query_map(session, "list servers", LIST_SERVERS, &[], |row| {
        Ok(ForeignServer {
            name: row.text(0)?.to_string(),
            wrapper: row.text(1)?.to_string(),
            owner: row.opt_text(2)?.unwrap_or_default().to_string(),
            host: row.text(3)?.to_string(),
            port: row.port(4)?,
            database: row.text(5)?.to_string(),
            ..ForeignServer::default()
        })
    })
}

/// Find a server by name.
pub fn find_server(session: &mut dyn Session, name: &str) -> Result<Option<ForeignServer>> {
    Ok(list_servers(session)?.into_iter().find(|s| s.name == name))
}

pub fn create_server(session: &mut dyn Session, server: &ForeignServer) -> Result<()> {
    require("server", "name", &server.name)?;
    let sql = format!(
        "CREATE SERVER {} FOREIGN DATA WRAPPER {} OPTIONS (host {}, port {}, dbname {})",
        quote_ident(&server.name),
        quote_ident(server.wrapper_or_default()),
        quote_literal(&server.host),
        quote_literal(&server.port.to_string()),
        quote_literal(&server.database),
    );
    execute(session, "create server", &server.name, &sql)
}

/// Set the server's non-empty connection options.
///
/// Empty host or database and a zero port are left unchanged. Returns
/// `false` without issuing a statement if there is nothing to set.
pub fn update_server(session: &mut dyn Session, server: &ForeignServer) -> Result<bool> {
    require("server", "name", &server.name)?;
    let mut options = Vec::new();
    if !server.host.is_empty() {
        options.push(format!("SET host {}", quote_literal(&server.host)));
    }
    if server.port > 0 {
        options.push(format!("SET port {}", quote_literal(&server.port.to_string())));
    }
    if !server.database.is_empty() {
        options.push(format!("SET dbname {}", quote_literal(&server.database)));
    }
    if options.is_empty() {
        log::debug!("server {}: no options to update", server.name);
        return Ok(false);
    }
    let sql = format!(
        "ALTER SERVER {} OPTIONS ({})",
        quote_ident(&server.name),
        options.join(", ")
    );
    execute(session, "update server", &server.name, &sql)?;
    Ok(true)
}

pub fn rename_server(session: &mut dyn Session, name: &str, new_name: &str) -> Result<()> {
    require("server", "name", name)?;
    require("server", "new name", new_name)?;
    let sql = format!(
        "ALTER SERVER {} RENAME TO {}",
        quote_ident(name),
        quote_ident(new_name)
    );
    execute(session, "rename server", name, &sql)
}

/// Drop a server. With `cascade`, its user mappings and foreign tables go too.
pub fn drop_server(session: &mut dyn Session, name: &str, cascade: bool) -> Result<()> {
    require("server", "name", name)?;
    let mut sql = format!("DROP SERVER {}", quote_ident(name));
    if cascade {
        sql.push_str(" CASCADE");
    }
    execute(session, "drop server", name, &sql)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Row;
    use crate::backend::mock::{Journal, MockSession};
    use crate::error::Error;

    #[test]
    fn test_list_servers() {
        let journal = Journal::default();
        let mut session = MockSession::new("local", &journal).with_row_values(
            "information_schema.foreign_servers",
            None,
            vec![
                Row::from_strs(&["films", "postgres_fdw", "admin", "db.internal", "5432", "films"]),
                Row::new(vec![
                    Some("bare".into()),
                    Some("postgres_fdw".into()),
                    None,
                    Some(String::new()),
                    Some(String::new()),
                    Some(String::new()),
                ]),
            ],
        );

        let servers = list_servers(&mut session).unwrap();
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0].name, "films");
        assert_eq!(servers[0].host, "db.internal");
        assert_eq!(servers[0].port, 5432);
        assert_eq!(servers[0].owner, "admin");
        assert_eq!(servers[1].port, 0);
        assert!(servers[1].owner.is_empty());
    }

    #[test]
    fn test_list_servers_rejects_bad_port() {
        let journal = Journal::default();
        let mut session = MockSession::new("local", &journal).with_rows(
            "information_schema.foreign_servers",
            &[&["s", "postgres_fdw", "admin", "h", "port", "d"]],
        );
        assert!(matches!(list_servers(&mut session), Err(Error::Scan { .. })));
    }

    #[test]
    fn test_find_server() {
        let journal = Journal::default();
        let mut session = MockSession::new("local", &journal).with_rows(
            "information_schema.foreign_servers",
            &[&["films", "postgres_fdw", "admin", "h", "5432", "d"]],
        );
        assert!(find_server(&mut session, "films").unwrap().is_some());
        assert!(find_server(&mut session, "other").unwrap().is_none());
    }

    #[test]
    fn test_create_server() {
        let journal = Journal::default();
        let mut session = MockSession::new("local", &journal);
        create_server(&mut session, &ForeignServer::new("films", "db.internal", 5432, "films"))
            .unwrap();
        assert_eq!(
            journal.executed(),
            ["CREATE SERVER \"films\" FOREIGN DATA WRAPPER \"postgres_fdw\" \
              OPTIONS (host 'db.internal', port '5432', dbname 'films')"]
        );
    }

    #[test]
    fn test_update_server_sets_only_provided_options() {
        let journal = Journal::default();
        let mut session = MockSession::new("local", &journal);
        let server = ForeignServer::new("films", "new.internal", 0, "");
        assert!(update_server(&mut session, &server).unwrap());
        assert_eq!(
            journal.executed(),
            ["ALTER SERVER \"films\" OPTIONS (SET host 'new.internal')"]
        );
    }

    #[test]
    fn test_update_server_all_options() {
        let journal = Journal::default();
        let mut session = MockSession::new("local", &journal);
        let server = ForeignServer::new("films", "h", 6543, "d");
        update_server(&mut session, &server).unwrap();
        assert_eq!(
            journal.executed(),
            ["ALTER SERVER \"films\" OPTIONS (SET host 'h', SET port '6543', SET dbname 'd')"]
        );
    }

    #[test]
    fn test_update_server_with_nothing_to_set() {
        let journal = Journal::default();
        let mut session = MockSession::new("local", &journal);
        assert!(!update_server(&mut session, &ForeignServer::new("films", "", 0, "")).unwrap());
        assert!(journal.executed().is_empty());
    }

    #[test]
    fn test_rename_and_drop() {
        let journal = Journal::default();
        let mut session = MockSession::new("local", &journal);
        rename_server(&mut session, "old", "new").unwrap();
        drop_server(&mut session, "new", true).unwrap();
        drop_server(&mut session, "other", false).unwrap();
        assert_eq!(
            journal.executed(),
            [
                "ALTER SERVER \"old\" RENAME TO \"new\"",
                "DROP SERVER \"new\" CASCADE",
                "DROP SERVER \"other\"",
            ]
        );
    }

    #[test]
    fn test_identifiers_are_quoted() {
        let journal = Journal::default();
        let mut session = MockSession::new("local", &journal);
        drop_server(&mut session, "we\"ird", false).unwrap();
        assert_eq!(journal.executed(), ["DROP SERVER \"we\"\"ird\""]);
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let journal = Journal::default();
        let mut session = MockSession::new("local", &journal);
        assert!(matches!(
            drop_server(&mut session, "", true),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            rename_server(&mut session, "a", ""),
            Err(Error::InvalidArgument(_))
        ));
    }
}
