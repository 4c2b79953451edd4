//! Domain types for FDW objects.
//!
//! The same types describe both the desired state and the live state read
//! back from the catalog. Each implements [`Keyed`] with its identity so the
//! reconciler can diff desired against live.

use crate::secret::Secret;
use declarative::Keyed;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Foreign data wrapper used when a server does not name one.
pub const DEFAULT_WRAPPER: &str = "postgres_fdw";

/// An installed (or desired) Postgres extension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Extension {
    pub name: String,
    /// Installed version; empty for desired extensions.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
}

impl Extension {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: String::new(),
        }
    }
}

impl Keyed for Extension {
    fn key(&self) -> &str {
        &self.name
    }
}

/// A foreign server and the objects that hang off it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ForeignServer {
    pub name: String,
    pub host: String,
    /// Remote port; 0 means unset.
    pub port: u16,
    pub database: String,
    /// Foreign data wrapper; empty means [`DEFAULT_WRAPPER`].
    pub wrapper: String,
    /// Owning role, only populated from the catalog.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub owner: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub user_maps: Vec<UserMapping>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub schemas: Vec<Schema>,
}

impl ForeignServer {
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
            database: database.into(),
            ..Self::default()
        }
    }

    /// The wrapper to create the server with.
    pub fn wrapper_or_default(&self) -> &str {
        if self.wrapper.is_empty() {
            DEFAULT_WRAPPER
        } else {
            &self.wrapper
        }
    }

    /// Whether the connection options match `live`.
    ///
    /// Only host, port and database are compared; nested user mappings and
    /// schemas are reconciled separately. Empty desired fields and a zero
    /// port are not compared, matching what an update would leave alone.
    pub fn same_options(&self, live: &ForeignServer) -> bool {
        (self.host.is_empty() || self.host == live.host)
            && (self.port == 0 || self.port == live.port)
            && (self.database.is_empty() || self.database == live.database)
    }

    /// Default server name derived from its connection options,
    /// e.g. `db.example.com`, 5432, `films` gives `db-example-com_5432_films`.
    pub fn default_name(host: &str, port: u16, database: &str) -> String {
        format!("{}_{port}_{database}", host.replace('.', "-"))
    }
}

impl Keyed for ForeignServer {
    fn key(&self) -> &str {
        &self.name
    }
}

/// Maps a local role to remote credentials on a server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserMapping {
    pub server_name: String,
    pub local_user: String,
    pub remote_user: String,
    /// For live mappings only `value` is populated, holding the stored
    /// password if the catalog exposes one.
    #[serde(skip)]
    pub remote_secret: Secret,
}

impl UserMapping {
    pub fn new(
        server_name: impl Into<String>,
        local_user: impl Into<String>,
        remote_user: impl Into<String>,
    ) -> Self {
        Self {
            server_name: server_name.into(),
            local_user: local_user.into(),
            remote_user: remote_user.into(),
            remote_secret: Secret::default(),
        }
    }

    /// Attach a secret for the remote password.
    pub fn with_secret(mut self, secret: Secret) -> Self {
        self.remote_secret = secret;
        self
    }

    /// Whether the mapping targets the `PUBLIC` pseudo-role.
    pub fn is_public(&self) -> bool {
        self.local_user.eq_ignore_ascii_case("public")
    }

    /// The password currently stored on a live mapping.
    pub fn stored_password(&self) -> Option<&str> {
        self.remote_secret.value.as_deref()
    }

    /// Compare a desired mapping with its live counterpart.
    ///
    /// Empty desired fields are not compared. `password` is the desired
    /// secret already resolved, or `None` if no secret is defined.
    pub fn matches_live(&self, live: &UserMapping, password: Option<&str>) -> bool {
        let user_matches = self.remote_user.is_empty() || self.remote_user == live.remote_user;
        let password_matches = password.is_none_or(|p| live.stored_password() == Some(p));
        user_matches && password_matches
    }
}

impl Keyed for UserMapping {
    fn key(&self) -> &str {
        &self.local_user
    }
}

/// Privileges granted on an imported schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Permissions {
    pub usage: bool,
    pub select: bool,
}

impl Default for Permissions {
    fn default() -> Self {
        Self {
            usage: true,
            select: true,
        }
    }
}

/// A grant of [`Permissions`] on a schema to a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Grant {
    pub user: String,
    pub permissions: Permissions,
}

impl Grant {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            permissions: Permissions::default(),
        }
    }
}

/// A remote schema imported into a local schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Schema {
    pub server_name: String,
    pub local_schema: String,
    pub remote_schema: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub import_enums: bool,
    /// Connection string for reading remote enum definitions.
    #[serde(skip)]
    pub enum_connection: String,
    #[serde(skip)]
    pub enum_secret: Secret,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub grants: Vec<Grant>,
}

impl Schema {
    pub fn new(
        server_name: impl Into<String>,
        local_schema: impl Into<String>,
        remote_schema: impl Into<String>,
    ) -> Self {
        Self {
            server_name: server_name.into(),
            local_schema: local_schema.into(),
            remote_schema: remote_schema.into(),
            ..Self::default()
        }
    }
}

impl Keyed for Schema {
    fn key(&self) -> &str {
        &self.local_schema
    }
}

/// An enum type, identified by schema and type name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SchemaEnum {
    pub schema: String,
    pub name: String,
}

impl SchemaEnum {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for SchemaEnum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// The full desired configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DesiredState {
    pub extensions: Vec<Extension>,
    pub servers: Vec<ForeignServer>,
}

impl DesiredState {
    /// Number of objects described, counting nested items.
    pub fn object_count(&self) -> usize {
        self.extensions.len()
            + self
                .servers
                .iter()
                .map(|s| 1 + s.user_maps.len() + s.schemas.len())
                .sum::<usize>()
    }
}
