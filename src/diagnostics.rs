//! Diagnostics Checker
//!
//! A fixed battery of sanity checks over a table snapshot plus the session's
//! stores, postcodes and recorded geometry issues. Every check is an
//! independent pure predicate; a failing check never stops the others from
//! running, so the full pass/fail status is available on every run.

use std::collections::BTreeSet;

use crate::assignment::TableSnapshot;
use crate::coverage::{classify, classify_all, GeometryIssue};
use crate::data::{Postcode, Store};
use crate::export;

/// One check's outcome, consumed by a presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub name: String,
    pub pass: bool,
}

/// A coverage expectation: the named store must classify the named postcode
/// as covered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expectation {
    pub store_id: String,
    pub postcode_id: String,
}

impl Expectation {
    pub fn new(store_id: &str, postcode_id: &str) -> Self {
        Expectation { store_id: store_id.to_string(), postcode_id: postcode_id.to_string() }
    }
}

/// Known expectations for the embedded sample dataset
pub fn sample_expectations() -> Vec<Expectation> {
    vec![
        Expectation::new("SYD", "2000"),
        Expectation::new("MEL", "3000"),
        Expectation::new("MEL", "3057"),
    ]
}

/// Run the full battery; all checks always execute, in a fixed order
pub fn run(
    snapshot: &TableSnapshot,
    stores: &[Store],
    postcodes: &[Postcode],
    issues: &[GeometryIssue],
    expectations: &[Expectation],
) -> Vec<CheckResult> {
    let mut results = Vec::with_capacity(5 + expectations.len());

    let known: BTreeSet<&str> = stores.iter().map(|s| s.id.as_str()).collect();
    results.push(CheckResult {
        name: "table references known stores only".to_string(),
        pass: snapshot
            .values()
            .flatten()
            .all(|store_id| known.contains(store_id.as_str())),
    });

    results.push(CheckResult {
        name: "classification is deterministic".to_string(),
        pass: classify_all(stores, postcodes) == classify_all(stores, postcodes),
    });

    let assignment_total: usize = snapshot.values().map(BTreeSet::len).sum();
    results.push(CheckResult {
        name: "combined rows match assignment total".to_string(),
        pass: match export::combined_frame(snapshot, stores) {
            Ok(frame) => frame.height() == assignment_total,
            Err(_) => false,
        },
    });

    results.push(CheckResult {
        name: "matrix round-trip preserves assignments".to_string(),
        pass: match export::matrix_csv(snapshot, stores, postcodes)
            .and_then(|csv| export::table_from_matrix_csv(&csv))
        {
            Ok(rebuilt) => {
                let mut expected = snapshot.clone();
                expected.retain(|_, assigned| !assigned.is_empty());
                rebuilt == expected
            }
            Err(_) => false,
        },
    });

    results.push(CheckResult {
        name: "all geometries valid".to_string(),
        pass: issues.is_empty(),
    });

    for expectation in expectations {
        let store = stores.iter().find(|s| s.id == expectation.store_id);
        let postcode = postcodes.iter().find(|p| p.code == expectation.postcode_id);
        let pass = match (store, postcode) {
            (Some(store), Some(postcode)) => classify(store, postcode),
            _ => false,
        };
        results.push(CheckResult {
            name: format!(
                "store {} covers postcode {}",
                expectation.store_id, expectation.postcode_id
            ),
            pass,
        });
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::AssignmentTable;
    use crate::coverage::classify_all;
    use crate::data::{load_postcodes_geojson, sample_stores, SAMPLE_POSTCODES_GEOJSON};

    fn seeded_sample() -> (TableSnapshot, Vec<Store>, Vec<Postcode>) {
        let stores = sample_stores();
        let (postcodes, _) = load_postcodes_geojson(SAMPLE_POSTCODES_GEOJSON).unwrap();
        let mut table = AssignmentTable::new(stores.iter().map(|s| s.id.clone()));
        for (code, assigned) in classify_all(&stores, &postcodes) {
            table.set(&code, assigned).unwrap();
        }
        (table.snapshot(), stores, postcodes)
    }

    #[test]
    fn test_sample_battery_all_pass() {
        let (snapshot, stores, postcodes) = seeded_sample();
        let results = run(&snapshot, &stores, &postcodes, &[], &sample_expectations());

        assert_eq!(results.len(), 8);
        for check in &results {
            assert!(check.pass, "check failed: {}", check.name);
        }
    }

    #[test]
    fn test_failing_check_does_not_short_circuit() {
        let (snapshot, stores, postcodes) = seeded_sample();
        // Expect coverage that does not exist, plus one valid expectation
        let expectations = vec![
            Expectation::new("SYD", "3000"),
            Expectation::new("NOPE", "2000"),
            Expectation::new("MEL", "3057"),
        ];
        let results = run(&snapshot, &stores, &postcodes, &[], &expectations);

        assert_eq!(results.len(), 8);
        let by_name = |name: &str| results.iter().find(|c| c.name == name).unwrap();
        assert!(!by_name("store SYD covers postcode 3000").pass);
        assert!(!by_name("store NOPE covers postcode 2000").pass);
        assert!(by_name("store MEL covers postcode 3057").pass);
    }

    #[test]
    fn test_unknown_store_in_snapshot_fails_integrity_only() {
        let (mut snapshot, stores, postcodes) = seeded_sample();
        snapshot
            .get_mut("2000")
            .unwrap()
            .insert("GHOST".to_string());

        let results = run(&snapshot, &stores, &postcodes, &[], &[]);
        let integrity = results
            .iter()
            .find(|c| c.name == "table references known stores only")
            .unwrap();
        assert!(!integrity.pass);

        // Determinism check still ran and passed
        let determinism = results
            .iter()
            .find(|c| c.name == "classification is deterministic")
            .unwrap();
        assert!(determinism.pass);
    }

    #[test]
    fn test_geometry_issues_reported() {
        let (snapshot, stores, postcodes) = seeded_sample();
        let issues = vec![GeometryIssue {
            kind: crate::coverage::GeometryKind::Postcode,
            id: "9999".to_string(),
            detail: "ring has 2 distinct points, need at least 3".to_string(),
        }];

        let results = run(&snapshot, &stores, &postcodes, &issues, &[]);
        let geometry = results.iter().find(|c| c.name == "all geometries valid").unwrap();
        assert!(!geometry.pass);
    }
}
