//! SQL quoting and log redaction helpers.

use regex::Regex;
use std::sync::LazyLock;

static PASSWORD_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(password\s+)'(?:[^']|'')*'").expect("password pattern is valid")
});

/// Quote an identifier, doubling embedded double quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote a string literal, doubling embedded single quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Quote a role name for `FOR <role>` clauses. `PUBLIC` is a keyword there.
pub fn quote_role(role: &str) -> String {
    if role.eq_ignore_ascii_case("public") {
        "PUBLIC".to_string()
    } else {
        quote_ident(role)
    }
}

/// Replace every `password '<literal>'` in a statement with `password '...'`.
pub fn mask_passwords(sql: &str) -> String {
    PASSWORD_LITERAL.replace_all(sql, "${1}'...'").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("films"), "\"films\"");
        assert_eq!(quote_ident("My \"odd\" name"), "\"My \"\"odd\"\" name\"");
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal("abc"), "'abc'");
        assert_eq!(quote_literal("it's"), "'it''s'");
        assert_eq!(quote_literal(""), "''");
    }

    #[test]
    fn test_quote_role() {
        assert_eq!(quote_role("public"), "PUBLIC");
        assert_eq!(quote_role("app"), "\"app\"");
    }

    #[test]
    fn test_mask_passwords() {
        let sql = "CREATE USER MAPPING FOR \"a\" SERVER \"s\" OPTIONS (user 'r', password 'zot')";
        assert_eq!(
            mask_passwords(sql),
            "CREATE USER MAPPING FOR \"a\" SERVER \"s\" OPTIONS (user 'r', password '...')"
        );
    }

    #[test]
    fn test_mask_passwords_handles_escaped_quotes_and_case() {
        let sql = "ALTER USER MAPPING FOR \"a\" SERVER \"s\" OPTIONS (SET PASSWORD 'it''s')";
        assert_eq!(
            mask_passwords(sql),
            "ALTER USER MAPPING FOR \"a\" SERVER \"s\" OPTIONS (SET PASSWORD '...')"
        );
    }

    #[test]
    fn test_mask_passwords_leaves_other_sql_alone() {
        let sql = "CREATE SCHEMA \"password\"";
        assert_eq!(mask_passwords(sql), sql);
    }
}
