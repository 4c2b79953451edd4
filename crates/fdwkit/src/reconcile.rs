//! Converge the database towards a [`DesiredState`].
//!
//! A run is strictly sequential and fail-fast:
//!
//! 1. extensions (add only; extensions are never dropped)
//! 2. servers: drop removed, create added, update changed options
//! 3. for each added or kept server: user mappings, then schemas
//!
//! The first failing statement aborts the run. Nothing is rolled back;
//! re-running converges whatever was left undone.

use crate::backend::{Connector, Session};
use crate::catalog::{extension, schema, server, usermap};
use crate::error::{Error, Result};
use crate::model::{DesiredState, ForeignServer, Schema, UserMapping};
use crate::secret::SecretResolver;
use declarative::{
    ApplyResult, DiffSummary, ExecuteSummary, Keyed, ProgressCallback, diff, find_by_key,
};
use std::collections::HashSet;

/// Policy switches for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Drop removed servers and schemas with CASCADE.
    pub cascade_drop: bool,
    /// Drop and re-import schemas that already exist.
    pub recreate_schemas: bool,
    /// Drop the local role along with a removed user mapping.
    pub drop_local_users: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            cascade_drop: true,
            recreate_schemas: false,
            drop_local_users: false,
        }
    }
}

/// Applies a desired state over one session.
pub struct Reconciler<'a> {
    session: &'a mut dyn Session,
    connector: &'a dyn Connector,
    secrets: &'a SecretResolver,
    options: ReconcileOptions,
    progress: &'a mut dyn ProgressCallback,
    summary: ExecuteSummary,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        session: &'a mut dyn Session,
        connector: &'a dyn Connector,
        secrets: &'a SecretResolver,
        options: ReconcileOptions,
        progress: &'a mut dyn ProgressCallback,
    ) -> Self {
        Self {
            session,
            connector,
            secrets,
            options,
            progress,
            summary: ExecuteSummary::default(),
        }
    }

    /// Run reconciliation. Returns totals for every object considered.
    pub fn apply(mut self, desired: &DesiredState) -> Result<ExecuteSummary> {
        validate(desired)?;
        log::debug!(
            "applying desired state with {} objects",
            desired.object_count()
        );

        self.apply_extensions(desired)?;
        let to_process = self.apply_servers(desired)?;
        for server in &to_process {
            self.apply_user_maps(server)?;
            self.apply_schemas(server)?;
        }

        log::info!("desired state applied");
        Ok(self.summary)
    }

    fn record(&mut self, kind: &str, id: &str, result: ApplyResult) {
        self.summary.add_result(&result);
        self.progress.on_applied(kind, id, &result);
    }

    fn apply_extensions(&mut self, desired: &DesiredState) -> Result<()> {
        self.progress.on_stage("extensions");
        let live = extension::list_extensions(self.session)?;
        let d = diff(&desired.extensions, &live);
        log::debug!("extensions: {}", DiffSummary::from_diff(&d));

        for ext in &d.remove {
            log::debug!("extension {} is not in desired state; leaving it installed", ext.name);
        }
        for ext in &d.add {
            log::debug!("creating extension {}", ext.name);
            extension::create_extension(self.session, ext)?;
            log::info!("extension {} created", ext.name);
            self.record("extension", &ext.name, ApplyResult::Created);
        }
        for ext in &d.modify {
            self.record("extension", &ext.name, ApplyResult::NoChange);
        }
        Ok(())
    }

    /// Returns the desired servers whose children should be processed.
    fn apply_servers(&mut self, desired: &DesiredState) -> Result<Vec<ForeignServer>> {
        self.progress.on_stage("servers");
        let live = server::list_servers(self.session)?;
        let d = diff(&desired.servers, &live);
        log::debug!("servers: {}", DiffSummary::from_diff(&d));
        log::trace!(
            "servers: remove {:?}, add {:?}, modify {:?}",
            names(&d.remove),
            names(&d.add),
            names(&d.modify)
        );

        for srv in &d.remove {
            log::debug!("removing server {}", srv.name);
            server::drop_server(self.session, &srv.name, self.options.cascade_drop)?;
            log::info!("server {} dropped", srv.name);
            self.record("server", &srv.name, ApplyResult::Removed);
        }
        for srv in &d.add {
            log::debug!("creating server {}", srv.name);
            server::create_server(self.session, srv)?;
            log::info!("server {} created", srv.name);
            self.record("server", &srv.name, ApplyResult::Created);
        }
        for srv in &d.modify {
            let current = find_by_key(&live, &srv.name).ok_or_else(|| Error::IdentityNotFound {
                kind: "server",
                name: srv.name.clone(),
            })?;
            if srv.same_options(current) {
                log::debug!("server {} is no different from the database; skipping it", srv.name);
                self.record("server", &srv.name, ApplyResult::NoChange);
                continue;
            }
            log::debug!("updating server {}", srv.name);
            if server::update_server(self.session, srv)? {
                log::info!("server {} updated", srv.name);
                self.record("server", &srv.name, ApplyResult::Modified);
            } else {
                self.record("server", &srv.name, ApplyResult::NoChange);
            }
        }

        Ok(d.add.into_iter().chain(d.modify).collect())
    }

    fn apply_user_maps(&mut self, srv: &ForeignServer) -> Result<()> {
        self.progress.on_stage(&format!("user mappings for {}", srv.name));
        let live: Vec<UserMapping> = usermap::list_user_mappings(self.session, Some(&srv.name))?
            .into_iter()
            .filter(|m| m.server_name == srv.name)
            .collect();
        let desired: Vec<UserMapping> = srv
            .user_maps
            .iter()
            .map(|m| UserMapping {
                server_name: srv.name.clone(),
                ..m.clone()
            })
            .collect();
        let d = diff(&desired, &live);
        log::debug!("user mappings on {}: {}", srv.name, DiffSummary::from_diff(&d));

        for mapping in &d.remove {
            log::debug!("removing user mapping for local user {}", mapping.local_user);
            usermap::drop_user_mapping(self.session, mapping, self.options.drop_local_users)?;
            log::info!("user mapping for {} dropped", mapping.local_user);
            self.record("usermap", &mapping_id(mapping), ApplyResult::Removed);
        }
        for mapping in &d.add {
            log::debug!("adding user mapping for local user {}", mapping.local_user);
            usermap::create_user_mapping(self.session, self.secrets, mapping)?;
            log::info!(
                "user mapping {} -> {} created",
                mapping.local_user,
                mapping.remote_user
            );
            self.record("usermap", &mapping_id(mapping), ApplyResult::Created);
        }
        for mapping in &d.modify {
            let current =
                find_by_key(&live, &mapping.local_user).ok_or_else(|| Error::IdentityNotFound {
                    kind: "user mapping",
                    name: mapping_id(mapping),
                })?;
            let password = self.secrets.resolve_optional(&mapping.remote_secret)?;
            if mapping.matches_live(current, password.as_deref()) {
                log::debug!(
                    "user mapping {} -> {} is no different from the database; skipping it",
                    mapping.local_user,
                    mapping.remote_user
                );
                self.record("usermap", &mapping_id(mapping), ApplyResult::NoChange);
                continue;
            }
            usermap::update_user_mapping(self.session, mapping, password.as_deref())?;
            log::info!(
                "user mapping {} -> {} updated",
                mapping.local_user,
                mapping.remote_user
            );
            self.record("usermap", &mapping_id(mapping), ApplyResult::Modified);
        }
        Ok(())
    }

    fn apply_schemas(&mut self, srv: &ForeignServer) -> Result<()> {
        self.progress.on_stage(&format!("schemas for {}", srv.name));
        let live: Vec<Schema> = schema::list_schemas(self.session, Some(&srv.name))?
            .into_iter()
            .filter(|s| s.server_name == srv.name)
            .collect();
        let desired: Vec<Schema> = srv
            .schemas
            .iter()
            .map(|s| Schema {
                server_name: srv.name.clone(),
                ..s.clone()
            })
            .collect();
        let d = diff(&desired, &live);
        log::debug!("schemas on {}: {}", srv.name, DiffSummary::from_diff(&d));

        for sch in &d.remove {
            log::debug!("removing schema {}", sch.local_schema);
            schema::drop_schema(self.session, &sch.local_schema, self.options.cascade_drop)?;
            log::info!("local schema {} dropped", sch.local_schema);
            self.record("schema", &sch.local_schema, ApplyResult::Removed);
        }
        for sch in &d.add {
            log::debug!("importing schema {}", sch.local_schema);
            schema::import_schema(self.session, self.connector, self.secrets, sch)?;
            log::info!("foreign schema {} imported", sch.remote_schema);
            self.record("schema", &sch.local_schema, ApplyResult::Created);
        }
        for sch in &d.modify {
            if !self.options.recreate_schemas {
                log::info!("foreign schema {} exists; will not re-create it", sch.remote_schema);
                self.record(
                    "schema",
                    &sch.local_schema,
                    ApplyResult::Skipped {
                        reason: "already imported".into(),
                    },
                );
                continue;
            }
            log::debug!("recreating schema {}", sch.local_schema);
            schema::drop_schema(self.session, &sch.local_schema, true)?;
            schema::import_schema(self.session, self.connector, self.secrets, sch)?;
            log::info!("foreign schema {} re-imported", sch.remote_schema);
            self.record("schema", &sch.local_schema, ApplyResult::Recreated);
        }
        Ok(())
    }
}

/// Reject desired states with blank or duplicate identities, or schemas
/// that cannot be imported as configured, before any statement runs.
pub fn validate(desired: &DesiredState) -> Result<()> {
    unique("extension", desired.extensions.iter().map(|e| e.key()))?;
    unique("server", desired.servers.iter().map(|s| s.key()))?;
    for srv in &desired.servers {
        unique(
            &format!("user mapping on server {}", srv.name),
            srv.user_maps.iter().map(|m| m.key()),
        )?;
        unique(
            &format!("schema on server {}", srv.name),
            srv.schemas.iter().map(|s| s.key()),
        )?;
        for sch in &srv.schemas {
            schema::check_enum_connection(sch)?;
        }
    }
    Ok(())
}

fn unique<'k>(kind: &str, keys: impl Iterator<Item = &'k str>) -> Result<()> {
    let mut seen = HashSet::new();
    for key in keys {
        if key.trim().is_empty() {
            return Err(Error::InvalidArgument(format!("{kind} with an empty name")));
        }
        if !seen.insert(key) {
            return Err(Error::InvalidArgument(format!("duplicate {kind} {key}")));
        }
    }
    Ok(())
}

fn names(servers: &[ForeignServer]) -> Vec<&str> {
    servers.iter().map(|s| s.name.as_str()).collect()
}

fn mapping_id(mapping: &UserMapping) -> String {
    format!("{}@{}", mapping.local_user, mapping.server_name)
}
