//! Three-way diff between desired and live objects

use serde::Serialize;
use std::fmt;

/// An object with a natural identity
///
/// Identity comparison is exact string equality. No case folding or
/// whitespace normalization happens here; callers trim names up front.
pub trait Keyed {
    /// The identity key (usually the object's name)
    fn key(&self) -> &str;
}

/// Partition of desired vs live objects
///
/// - `remove`: live objects with no desired counterpart
/// - `add`: desired objects with no live counterpart
/// - `modify`: desired objects that do have a live counterpart
///
/// Order within each list is the order of the input slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diff<T> {
    pub remove: Vec<T>,
    pub add: Vec<T>,
    pub modify: Vec<T>,
}

impl<T> Default for Diff<T> {
    fn default() -> Self {
        Self {
            remove: Vec::new(),
            add: Vec::new(),
            modify: Vec::new(),
        }
    }
}

/// Diff two lists using an identity-extraction function
///
/// O(n·m); object counts here are administrative-scale.
pub fn diff_by<T, K>(desired: &[T], live: &[T], key: K) -> Diff<T>
where
    T: Clone,
    K: Fn(&T) -> &str,
{
    let mut out = Diff::default();

    for l in live {
        if !desired.iter().any(|d| key(d) == key(l)) {
            out.remove.push(l.clone());
        }
    }

    for d in desired {
        if live.iter().any(|l| key(l) == key(d)) {
            out.modify.push(d.clone());
        } else {
            out.add.push(d.clone());
        }
    }

    out
}

/// Diff two lists of [`Keyed`] objects
pub fn diff<T: Keyed + Clone>(desired: &[T], live: &[T]) -> Diff<T> {
    diff_by(desired, live, T::key)
}

/// Find an object by identity key
pub fn find_by_key<'a, T: Keyed>(items: &'a [T], key: &str) -> Option<&'a T> {
    items.iter().find(|item| item.key() == key)
}

/// Diff summary statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    /// Number of objects to add
    pub additions: usize,
    /// Number of objects to remove
    pub removals: usize,
    /// Number of objects that exist on both sides
    pub modifications: usize,
}

impl DiffSummary {
    /// Create a summary from a diff
    pub fn from_diff<T>(diff: &Diff<T>) -> Self {
        Self {
            additions: diff.add.len(),
            removals: diff.remove.len(),
            modifications: diff.modify.len(),
        }
    }
}

impl fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "+{} -{} ~{}",
            self.additions, self.removals, self.modifications
        )
    }
}
