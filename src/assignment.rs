//! Assignment Table
//!
//! The mutable postcode → store-set mapping. Assignments are seeded in bulk
//! from classifier output (`set`) and then flipped one at a time by operator
//! actions (`toggle`). Multi-assignment is permitted: overlapping coverage
//! means a postcode can belong to several stores at once, and no store's
//! toggle evicts another store's membership.
//!
//! The table is the only mutable state in the engine. Readers (exports,
//! diagnostics, UI) get immutable snapshots, never live references.

use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Immutable, ordered copy of the table handed to readers
pub type TableSnapshot = BTreeMap<String, BTreeSet<String>>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssignmentError {
    /// Toggle attempted with no store selected; the table is unchanged and
    /// the caller should prompt for a selection
    #[error("no active store selected")]
    NoActiveStore,
    /// The referenced store id is not part of this session's store set; the
    /// table is unchanged
    #[error("unknown store id: {0}")]
    UnknownStore(String),
}

/// New membership state after a toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Assigned,
    Unassigned,
}

#[derive(Debug, Clone)]
pub struct AssignmentTable {
    known_stores: FxHashSet<String>,
    assignments: FxHashMap<String, BTreeSet<String>>,
}

impl AssignmentTable {
    /// Empty table that accepts only the given store ids
    pub fn new<I>(store_ids: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        AssignmentTable {
            known_stores: store_ids.into_iter().map(Into::into).collect(),
            assignments: FxHashMap::default(),
        }
    }

    /// Flip membership of `active_store` in the postcode's assignment set
    ///
    /// Double-toggle with the same arguments restores the original set,
    /// including the absence of an entry when the set empties out.
    pub fn toggle(
        &mut self,
        postcode_id: &str,
        active_store: Option<&str>,
    ) -> Result<ToggleOutcome, AssignmentError> {
        let store_id = active_store.ok_or(AssignmentError::NoActiveStore)?;
        if !self.known_stores.contains(store_id) {
            return Err(AssignmentError::UnknownStore(store_id.to_string()));
        }

        let set = self.assignments.entry(postcode_id.to_string()).or_default();
        if set.remove(store_id) {
            if set.is_empty() {
                self.assignments.remove(postcode_id);
            }
            Ok(ToggleOutcome::Unassigned)
        } else {
            set.insert(store_id.to_string());
            Ok(ToggleOutcome::Assigned)
        }
    }

    /// Total replacement of the postcode's assignment set (not a merge)
    ///
    /// Every id is validated before anything is written; a failed validation
    /// leaves the table untouched. An empty set removes the entry.
    pub fn set(
        &mut self,
        postcode_id: &str,
        store_ids: BTreeSet<String>,
    ) -> Result<(), AssignmentError> {
        if let Some(unknown) = store_ids.iter().find(|id| !self.known_stores.contains(id.as_str()))
        {
            return Err(AssignmentError::UnknownStore(unknown.clone()));
        }

        if store_ids.is_empty() {
            self.assignments.remove(postcode_id);
        } else {
            self.assignments.insert(postcode_id.to_string(), store_ids);
        }
        Ok(())
    }

    /// Assignment set for a postcode; empty set if absent, never an error
    pub fn get(&self, postcode_id: &str) -> BTreeSet<String> {
        self.assignments.get(postcode_id).cloned().unwrap_or_default()
    }

    /// Deep immutable copy for exports and diagnostics
    pub fn snapshot(&self) -> TableSnapshot {
        self.assignments
            .iter()
            .map(|(code, set)| (code.clone(), set.clone()))
            .collect()
    }

    /// Total number of (store, postcode) pairs
    pub fn assignment_count(&self) -> usize {
        self.assignments.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn known_store(&self, store_id: &str) -> bool {
        self.known_stores.contains(store_id)
    }
}
