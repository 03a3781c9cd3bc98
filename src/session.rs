//! Session Coordination
//!
//! Owns the per-session state: the store list, the postcode dataset, the
//! assignment table, the nullable active-store pointer and any geometry
//! issues recorded at load time. All engine operations run synchronously to
//! completion in the order issued; readers only ever see snapshots.

use anyhow::Result;

use crate::assignment::{AssignmentError, AssignmentTable, TableSnapshot, ToggleOutcome};
use crate::coverage::{classify_all, GeometryIssue};
use crate::data::{self, Postcode, Store};
use crate::diagnostics::{self, CheckResult, Expectation};
use crate::export;

pub struct Session {
    stores: Vec<Store>,
    postcodes: Vec<Postcode>,
    table: AssignmentTable,
    issues: Vec<GeometryIssue>,
    active_store: Option<String>,
    expectations: Vec<Expectation>,
}

impl Session {
    /// Session over loaded data; the table starts empty
    pub fn new(stores: Vec<Store>, postcodes: Vec<Postcode>, issues: Vec<GeometryIssue>) -> Self {
        let table = AssignmentTable::new(stores.iter().map(|s| s.id.clone()));
        Session {
            stores,
            postcodes,
            table,
            issues,
            active_store: None,
            expectations: Vec::new(),
        }
    }

    /// Session over the embedded sample dataset, with its known expectations
    pub fn sample() -> Result<Self> {
        let stores = data::sample_stores();
        let (postcodes, issues) = data::load_postcodes_geojson(data::SAMPLE_POSTCODES_GEOJSON)?;
        let mut session = Session::new(stores, postcodes, issues);
        session.expectations = diagnostics::sample_expectations();
        Ok(session)
    }

    pub fn with_expectations(mut self, expectations: Vec<Expectation>) -> Self {
        self.expectations = expectations;
        self
    }

    /// Seed the table from classifier output, replacing any prior state
    ///
    /// Safe to re-run after data edits; classification is pure, so re-seeding
    /// is idempotent for unchanged inputs.
    pub fn seed_from_classifier(&mut self) -> Result<(), AssignmentError> {
        let mut table = AssignmentTable::new(self.stores.iter().map(|s| s.id.clone()));
        for (code, assigned) in classify_all(&self.stores, &self.postcodes) {
            table.set(&code, assigned)?;
        }
        self.table = table;
        Ok(())
    }

    /// Select the store that subsequent toggles target; `None` deselects
    pub fn set_active_store(&mut self, store_id: Option<&str>) -> Result<(), AssignmentError> {
        if let Some(id) = store_id {
            if !self.table.known_store(id) {
                return Err(AssignmentError::UnknownStore(id.to_string()));
            }
        }
        self.active_store = store_id.map(String::from);
        Ok(())
    }

    pub fn active_store(&self) -> Option<&str> {
        self.active_store.as_deref()
    }

    /// Toggle the postcode against the currently active store
    pub fn toggle(&mut self, postcode_id: &str) -> Result<ToggleOutcome, AssignmentError> {
        self.table.toggle(postcode_id, self.active_store.as_deref())
    }

    pub fn snapshot(&self) -> TableSnapshot {
        self.table.snapshot()
    }

    pub fn assignment_count(&self) -> usize {
        self.table.assignment_count()
    }

    /// True when there is nothing to export; the collaborator decides whether
    /// to decline the download
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn stores(&self) -> &[Store] {
        &self.stores
    }

    pub fn postcodes(&self) -> &[Postcode] {
        &self.postcodes
    }

    pub fn issues(&self) -> &[GeometryIssue] {
        &self.issues
    }

    pub fn combined_csv(&self) -> Result<String> {
        export::combined_csv(&self.snapshot(), &self.stores)
    }

    pub fn matrix_csv(&self) -> Result<String> {
        export::matrix_csv(&self.snapshot(), &self.stores, &self.postcodes)
    }

    pub fn per_store_csv(&self, store_id: &str) -> Result<String> {
        let store = self
            .stores
            .iter()
            .find(|s| s.id == store_id)
            .ok_or_else(|| AssignmentError::UnknownStore(store_id.to_string()))?;
        export::per_store_csv(&self.snapshot(), store)
    }

    pub fn diagnostics(&self) -> Vec<CheckResult> {
        diagnostics::run(
            &self.snapshot(),
            &self.stores,
            &self.postcodes,
            &self.issues,
            &self.expectations,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn set_of(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_sample_seed_matches_expected_coverage() {
        let mut session = Session::sample().unwrap();
        assert!(session.issues().is_empty());
        session.seed_from_classifier().unwrap();

        let snapshot = session.snapshot();
        assert_eq!(snapshot.get("2000"), Some(&set_of(&["SYD"])));
        assert_eq!(snapshot.get("3000"), Some(&set_of(&["MEL"])));
        assert_eq!(snapshot.get("3057"), Some(&set_of(&["MEL"])));
    }

    #[test]
    fn test_toggle_requires_active_store() {
        let mut session = Session::sample().unwrap();
        assert_eq!(session.toggle("2000"), Err(AssignmentError::NoActiveStore));

        session.set_active_store(Some("SYD")).unwrap();
        assert_eq!(session.toggle("2000"), Ok(ToggleOutcome::Assigned));

        session.set_active_store(None).unwrap();
        assert_eq!(session.toggle("2000"), Err(AssignmentError::NoActiveStore));
    }

    #[test]
    fn test_set_active_store_validates_id() {
        let mut session = Session::sample().unwrap();
        assert_eq!(
            session.set_active_store(Some("PER")),
            Err(AssignmentError::UnknownStore("PER".to_string()))
        );
        assert_eq!(session.active_store(), None);
    }

    #[test]
    fn test_reseed_is_idempotent() {
        let mut session = Session::sample().unwrap();
        session.seed_from_classifier().unwrap();
        let first = session.snapshot();

        // Operator edits, then a re-seed recomputes from scratch
        session.set_active_store(Some("SYD")).unwrap();
        session.toggle("3000").unwrap();
        session.seed_from_classifier().unwrap();
        assert_eq!(session.snapshot(), first);
    }

    #[test]
    fn test_per_store_csv_unknown_store() {
        let session = Session::sample().unwrap();
        assert!(session.per_store_csv("PER").is_err());
    }

    #[test]
    fn test_custom_expectations_show_up_in_diagnostics() {
        let mut session = Session::sample()
            .unwrap()
            .with_expectations(vec![Expectation::new("SYD", "3057")]);
        session.seed_from_classifier().unwrap();

        let results = session.diagnostics();
        let check = results
            .iter()
            .find(|c| c.name == "store SYD covers postcode 3057")
            .unwrap();
        // Sydney's 5 km radius is nowhere near Brunswick
        assert!(!check.pass);
    }
}
