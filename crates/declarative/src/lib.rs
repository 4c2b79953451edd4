//! # Declarative
//!
//! Desired-state diffing for named objects.
//!
//! This crate provides the pieces shared by every reconciliation: a single
//! three-way diff over any object kind with a natural identity, the result
//! types an apply step reports, and the callback seam used to surface each
//! change as it happens.
//!
//! ## Core Concepts
//!
//! - **Keyed**: An object with a stable identity (its name)
//! - **Diff**: The `{remove, add, modify}` partition of desired vs live
//! - **ApplyResult**: What happened to one object during apply
//! - **ExecuteSummary**: Running totals over a whole run
//! - **ProgressCallback**: Receives each applied change
//!
//! ## Example
//!
//! ```
//! use declarative::{diff, Keyed};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Role { name: String }
//!
//! impl Keyed for Role {
//!     fn key(&self) -> &str { &self.name }
//! }
//!
//! let desired = vec![Role { name: "reader".into() }, Role { name: "writer".into() }];
//! let live = vec![Role { name: "writer".into() }, Role { name: "legacy".into() }];
//!
//! let d = diff(&desired, &live);
//! assert_eq!(d.remove, vec![Role { name: "legacy".into() }]);
//! assert_eq!(d.add, vec![Role { name: "reader".into() }]);
//! assert_eq!(d.modify, vec![Role { name: "writer".into() }]);
//! ```

pub mod context;
pub mod diff;
pub mod types;

// Re-export main types at crate root
pub use context::{NoProgress, ProgressCallback};
pub use diff::{Diff, DiffSummary, Keyed, diff, diff_by, find_by_key};
pub use types::{ApplyResult, ExecuteSummary};
