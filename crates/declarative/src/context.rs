//! Progress reporting seam
//!
//! The reconciler reports through this trait so the crate never depends on
//! a particular terminal UI.

use crate::types::ApplyResult;

/// Receives one call per applied object
pub trait ProgressCallback {
    /// Called when a stage of the run starts (e.g. "servers")
    fn on_stage(&mut self, _stage: &str) {}

    /// Called after an object was applied
    ///
    /// # Arguments
    /// * `kind` - Object kind (e.g. "server", "usermap")
    /// * `id` - Object identity
    /// * `result` - What happened
    fn on_applied(&mut self, kind: &str, id: &str, result: &ApplyResult);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_applied(&mut self, _kind: &str, _id: &str, _result: &ApplyResult) {}
}
