//! # fdwkit
//!
//! Desired-state management of Postgres foreign data wrapper objects.
//!
//! This crate provides functionality for:
//! - Reading live extensions, foreign servers, user mappings and imported
//!   schemas from the catalog
//! - Creating, updating and dropping those objects one statement at a time
//! - Resolving credentials from literal values, environment variables,
//!   files or Kubernetes secrets
//! - Cloning remote enum types ahead of `IMPORT FOREIGN SCHEMA`
//! - Reconciling the database against a [`DesiredState`]
//!
//! ## Example
//!
//! ```no_run
//! use fdwkit::{
//!     CancelToken, DesiredState, ForeignServer, PostgresConnector, PostgresSession,
//!     ReconcileOptions, Reconciler, SecretResolver,
//! };
//! use declarative::NoProgress;
//!
//! let cancel = CancelToken::new();
//! let mut session = PostgresSession::connect("postgres://admin@localhost/app", cancel.clone())
//!     .expect("connect");
//! let connector = PostgresConnector::new(cancel.clone());
//! let secrets = SecretResolver::new(cancel);
//!
//! let desired = DesiredState {
//!     extensions: Vec::new(),
//!     servers: vec![ForeignServer::new("films", "films.internal", 5432, "films")],
//! };
//!
//! let mut progress = NoProgress;
//! let summary = Reconciler::new(
//!     &mut session,
//!     &connector,
//!     &secrets,
//!     ReconcileOptions::default(),
//!     &mut progress,
//! )
//! .apply(&desired)
//! .expect("reconcile");
//! println!("{} changes", summary.total_changes());
//! ```

pub mod backend;
pub mod cancel;
pub mod catalog;
pub mod connstr;
pub mod error;
pub mod model;
pub mod reconcile;
pub mod secret;
pub mod sql;

pub use backend::dry_run::DryRunSession;
pub use backend::pg::{PostgresConnector, PostgresSession};
pub use backend::{Connector, DbError, Row, Session};
pub use cancel::CancelToken;
pub use error::{Error, ErrorCategory, Result};
pub use model::{
    DEFAULT_WRAPPER, DesiredState, Extension, ForeignServer, Grant, Permissions, Schema,
    SchemaEnum, UserMapping,
};
pub use reconcile::{ReconcileOptions, Reconciler};
pub use secret::{ExternalSecret, Secret, SecretResolver, SecretSource};
