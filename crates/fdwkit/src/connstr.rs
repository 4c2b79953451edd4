//! Connection string resolution and redaction.
//!
//! Connection strings come either as URLs (`postgres://user@host/db`) or as
//! libpq keyword strings (`host=h port=5432 dbname=d user=u sslmode=require`).
//! A complete keyword string is rewritten as a URL so a resolved secret can
//! be placed in the password component.

use crate::error::{Error, Result};
use crate::secret::{Secret, SecretResolver};
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

static URL_SCHEME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").expect("scheme pattern is valid")
});

static KEYWORD_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\w+)\s*=\s*(?:'((?:[^'\\]|\\.)*)'|(\S+))").expect("keyword pattern is valid")
});

static KEYWORD_PASSWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*\bpassword\s*=\s*(?:'(?:[^'\\]|\\.)*'|\S+)")
        .expect("password pattern is valid")
});

/// Keywords that must all be present to rewrite a keyword string as a URL.
const REQUIRED_KEYWORDS: [&str; 5] = ["host", "port", "dbname", "user", "sslmode"];

/// Whether the string starts with a URL scheme.
pub fn is_url(conn: &str) -> bool {
    URL_SCHEME.is_match(conn.trim_start())
}

/// Produce a usable connection string, inserting the secret's value as the
/// password when a secret is defined.
///
/// Empty input yields empty output. A keyword string missing any of
/// `host`, `port`, `dbname`, `user` or `sslmode` is kept as-is, with a
/// `password=` keyword appended when a secret is defined.
pub fn resolve(raw: &str, secret: &Secret, secrets: &SecretResolver) -> Result<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(String::new());
    }
    let password = secrets.resolve_optional(secret)?;

    if is_url(raw) {
        let mut url = Url::parse(raw).map_err(|e| {
            Error::InvalidArgument(format!("invalid connection URL {}: {e}", sanitize(raw)))
        })?;
        if let Some(password) = &password {
            url.set_password(Some(password)).map_err(|()| {
                Error::InvalidArgument(format!(
                    "cannot set a password on connection URL {}",
                    sanitize(raw)
                ))
            })?;
        }
        return Ok(url.to_string());
    }

    let pairs = parse_keywords(raw);
    if let Some(mut url) = keywords_to_url(&pairs)? {
        if let Some(password) = &password {
            url.set_password(Some(password)).map_err(|()| {
                Error::InvalidArgument("cannot set a password on connection string".into())
            })?;
        }
        return Ok(url.to_string());
    }

    log::debug!("connection string is not a complete keyword set; using it as given");
    Ok(match password {
        Some(password) => format!("{raw} password={}", quote_keyword_value(&password)),
        None => raw.to_string(),
    })
}

/// Remove the password from a connection string for display.
pub fn sanitize(conn: &str) -> String {
    if is_url(conn)
        && let Ok(mut url) = Url::parse(conn.trim())
    {
        if url.password().is_some() {
            let _ = url.set_password(None);
        }
        return url.to_string();
    }
    KEYWORD_PASSWORD.replace_all(conn, "").into_owned()
}

fn parse_keywords(raw: &str) -> Vec<(String, String)> {
    KEYWORD_PAIR
        .captures_iter(raw)
        .map(|caps| {
            let key = caps[1].to_ascii_lowercase();
            let value = match (caps.get(2), caps.get(3)) {
                (Some(quoted), _) => unescape(quoted.as_str()),
                (None, Some(bare)) => bare.as_str().to_string(),
                (None, None) => String::new(),
            };
            (key, value)
        })
        .collect()
}

fn keywords_to_url(pairs: &[(String, String)]) -> Result<Option<Url>> {
    let get = |key: &str| {
        pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    };
    let (Some(host), Some(port), Some(dbname), Some(user), Some(sslmode)) = (
        get("host"),
        get("port"),
        get("dbname"),
        get("user"),
        get("sslmode"),
    ) else {
        return Ok(None);
    };
    // Unix socket directories cannot be expressed as a URL host.
    if host.starts_with('/') {
        return Ok(None);
    }

    let port: u16 = port
        .parse()
        .map_err(|_| Error::InvalidArgument(format!("invalid port {port} in connection string")))?;
    let mut url = Url::parse(&format!("postgres://{host}:{port}/"))
        .map_err(|e| Error::InvalidArgument(format!("invalid host {host}: {e}")))?;
    url.set_path(&format!("/{dbname}"));
    url.set_username(user)
        .map_err(|()| Error::InvalidArgument(format!("invalid user {user}")))?;
    if let Some(password) = get("password") {
        let _ = url.set_password(Some(password));
    }

    {
        let mut query = url.query_pairs_mut();
        query.append_pair("sslmode", sslmode);
        for (key, value) in pairs {
            if !REQUIRED_KEYWORDS.contains(&key.as_str()) && key != "password" {
                query.append_pair(key, value);
            }
        }
    }
    Ok(Some(url))
}

fn unescape(quoted: &str) -> String {
    let mut out = String::with_capacity(quoted.len());
    let mut chars = quoted.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn quote_keyword_value(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}
