//! The fdwctl config file: connection settings plus the desired state.
//!
//! Files are TOML or JSON, chosen by extension. Keys are snake_case; the
//! spellings used by earlier fdwctl configs (`FDWConnection`, `DesiredState`,
//! `UserMap`, `localuser`, `remotepassword`, ...) are accepted as aliases.

use anyhow::{Context, Result, bail};
use fdwkit::{DesiredState, Extension, ForeignServer, Grant, Permissions, Schema, Secret, UserMapping};
use serde::Deserialize;
use std::fs;
use std::path::Path;

// ============================================================================
// Format
// ============================================================================

/// Supported config file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Detect the format from a file extension. Unknown extensions are TOML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Toml,
        }
    }

    /// File extension for this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Toml => "toml",
            Self::Json => "json",
        }
    }

    fn parse<T: for<'de> Deserialize<'de>>(self, content: &str) -> Result<T> {
        match self {
            Self::Toml => Ok(toml::from_str(content)?),
            Self::Json => Ok(serde_json::from_str(content)?),
        }
    }
}

// ============================================================================
// File Schema
// ============================================================================

/// Top-level config file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Connection string for the database holding the FDW objects
    #[serde(alias = "FDWConnection")]
    pub connection: String,

    /// Optional password for `connection`
    #[serde(alias = "FDWConnectionSecret")]
    pub connection_secret: Secret,

    #[serde(alias = "DesiredState")]
    pub desired_state: DesiredStateConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DesiredStateConfig {
    #[serde(alias = "Extensions")]
    pub extensions: Vec<ExtensionConfig>,
    #[serde(alias = "Servers")]
    pub servers: Vec<ServerConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ExtensionConfig {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub name: String,
    pub host: String,
    pub port: u16,
    #[serde(alias = "dbname", alias = "database")]
    pub db: String,
    pub wrapper: Option<String>,
    #[serde(alias = "UserMap", alias = "usermaps", alias = "user_map")]
    pub user_maps: Vec<UserMapConfig>,
    #[serde(alias = "Schemas")]
    pub schemas: Vec<SchemaConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UserMapConfig {
    #[serde(alias = "localuser", alias = "localUser")]
    pub local_user: String,
    #[serde(alias = "remoteuser", alias = "remoteUser")]
    pub remote_user: String,
    /// Shorthand for a literal `remote_secret`
    #[serde(alias = "remotepassword", alias = "remotePassword")]
    pub remote_password: Option<String>,
    #[serde(alias = "remotesecret", alias = "remoteSecret")]
    pub remote_secret: Option<Secret>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    #[serde(alias = "localschema", alias = "localSchema")]
    pub local_schema: String,
    #[serde(alias = "remoteschema", alias = "remoteSchema")]
    pub remote_schema: String,
    #[serde(alias = "importenums", alias = "importEnums")]
    pub import_enums: bool,
    #[serde(alias = "enumconnection", alias = "enumConnection")]
    pub enum_connection: String,
    #[serde(alias = "enumsecret", alias = "enumSecret")]
    pub enum_secret: Secret,
    pub grants: GrantsConfig,
}

/// Grants as a list of `{user, permissions}` or as `{users = [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum GrantsConfig {
    List(Vec<GrantConfig>),
    Users { users: Vec<String> },
}

impl Default for GrantsConfig {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

#[derive(Debug, Deserialize)]
pub struct GrantConfig {
    pub user: String,
    #[serde(default)]
    pub permissions: Permissions,
}

// ============================================================================
// Loading
// ============================================================================

impl AppConfig {
    /// Load a config file. A missing file yields an empty config.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("config file {} not found; using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let format = ConfigFormat::from_path(path);
        log::debug!("loading {} config from {}", format.extension(), path.display());
        format
            .parse(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Convert the desired state section into domain types.
    pub fn desired_state(&self) -> Result<DesiredState> {
        self.desired_state.to_model()
    }
}

impl DesiredStateConfig {
    /// Build the desired state, trimming every identity.
    pub fn to_model(&self) -> Result<DesiredState> {
        let extensions = self
            .extensions
            .iter()
            .map(|e| Extension::new(e.name.trim()))
            .collect();
        let servers = self
            .servers
            .iter()
            .map(ServerConfig::to_model)
            .collect::<Result<Vec<_>>>()?;
        Ok(DesiredState {
            extensions,
            servers,
        })
    }
}

impl ServerConfig {
    fn to_model(&self) -> Result<ForeignServer> {
        let name = self.name.trim();
        if name.is_empty() {
            bail!("server for host {:?} has no name", self.host);
        }

        let user_maps = self
            .user_maps
            .iter()
            .map(|m| m.to_model(name))
            .collect::<Result<Vec<_>>>()?;
        let schemas = self.schemas.iter().map(|s| s.to_model(name)).collect();

        Ok(ForeignServer {
            name: name.to_string(),
            host: self.host.trim().to_string(),
            port: self.port,
            database: self.db.trim().to_string(),
            wrapper: self.wrapper.as_deref().unwrap_or_default().trim().to_string(),
            owner: String::new(),
            user_maps,
            schemas,
        })
    }
}

impl UserMapConfig {
    fn to_model(&self, server: &str) -> Result<UserMapping> {
        let secret = match (&self.remote_password, &self.remote_secret) {
            (Some(_), Some(_)) => bail!(
                "user mapping {} on server {server} sets both remote_password and remote_secret",
                self.local_user
            ),
            (Some(password), None) => Secret::literal(password.clone()),
            (None, Some(secret)) => secret.clone(),
            (None, None) => Secret::default(),
        };
        Ok(UserMapping::new(server, self.local_user.trim(), self.remote_user.trim()).with_secret(secret))
    }
}

impl SchemaConfig {
    fn to_model(&self, server: &str) -> Schema {
        let grants = match &self.grants {
            GrantsConfig::List(list) => list
                .iter()
                .map(|g| Grant {
                    user: g.user.trim().to_string(),
                    permissions: g.permissions,
                })
                .collect(),
            GrantsConfig::Users { users } => users.iter().map(|u| Grant::new(u.trim())).collect(),
        };
        Schema {
            server_name: server.to_string(),
            local_schema: self.local_schema.trim().to_string(),
            remote_schema: self.remote_schema.trim().to_string(),
            import_enums: self.import_enums,
            enum_connection: self.enum_connection.trim().to_string(),
            enum_secret: self.enum_secret.clone(),
            grants,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
