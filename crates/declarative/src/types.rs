//! Result types for applying a diff

use serde::{Deserialize, Serialize};

/// Result of applying one object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyResult {
    /// Live object already matches
    NoChange,
    /// Object was created
    Created,
    /// Object was modified in place
    Modified,
    /// Object was dropped and created again
    Recreated,
    /// Object was dropped
    Removed,
    /// Apply was skipped
    Skipped { reason: String },
}

impl ApplyResult {
    /// Check if the result represents a change
    pub fn is_change(&self) -> bool {
        matches!(
            self,
            Self::Created | Self::Modified | Self::Recreated | Self::Removed
        )
    }

    /// Short verb for reporting
    pub fn verb(&self) -> &'static str {
        match self {
            Self::NoChange => "unchanged",
            Self::Created => "created",
            Self::Modified => "updated",
            Self::Recreated => "recreated",
            Self::Removed => "dropped",
            Self::Skipped { .. } => "skipped",
        }
    }
}

/// Summary of execution results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub modified: usize,
    pub recreated: usize,
    pub removed: usize,
    pub skipped: usize,
    pub no_change: usize,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.modified + self.recreated + self.removed
    }

    /// Total number of objects processed
    pub fn total(&self) -> usize {
        self.total_changes() + self.skipped + self.no_change
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => self.no_change += 1,
            ApplyResult::Created => self.created += 1,
            ApplyResult::Modified => self.modified += 1,
            ApplyResult::Recreated => self.recreated += 1,
            ApplyResult::Removed => self.removed += 1,
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }
}
