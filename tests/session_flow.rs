//! Session Flow Integration Tests
//!
//! Drives the full pipeline on the embedded sample dataset: load → classify →
//! toggle → export → diagnostics, asserting the exact export text so any
//! ordering or escaping regression shows up as a string diff.

use postcode_mapper::{
    export, AssignmentError, Session, Store, ToggleOutcome,
};
use std::collections::BTreeSet;

fn seeded_session() -> Session {
    let mut session = Session::sample().expect("sample dataset loads");
    session.seed_from_classifier().expect("classifier seed");
    session
}

#[test]
fn classifier_seeds_expected_sample_assignments() {
    let session = seeded_session();
    let snapshot = session.snapshot();

    let expect = |code: &str, stores: &[&str]| {
        let want: BTreeSet<String> = stores.iter().map(|s| s.to_string()).collect();
        assert_eq!(snapshot.get(code), Some(&want), "postcode {}", code);
    };
    expect("2000", &["SYD"]);
    expect("3000", &["MEL"]);
    expect("3057", &["MEL"]);
}

#[test]
fn toggle_overrides_and_multi_assignment() {
    let mut session = seeded_session();

    // Operator assigns 2000 to MEL as well; SYD's membership is untouched
    session.set_active_store(Some("MEL")).unwrap();
    assert_eq!(session.toggle("2000"), Ok(ToggleOutcome::Assigned));
    let both: BTreeSet<String> = ["MEL", "SYD"].iter().map(|s| s.to_string()).collect();
    assert_eq!(session.snapshot().get("2000"), Some(&both));

    // And takes it back
    assert_eq!(session.toggle("2000"), Ok(ToggleOutcome::Unassigned));
    let syd_only: BTreeSet<String> = std::iter::once("SYD".to_string()).collect();
    assert_eq!(session.snapshot().get("2000"), Some(&syd_only));
}

#[test]
fn toggle_twice_on_untouched_postcode_restores_empty_state() {
    let mut session = Session::sample().expect("sample dataset loads");
    // No classifier seed: the table starts empty
    session.set_active_store(Some("SYD")).unwrap();

    session.toggle("2000").unwrap();
    session.toggle("2000").unwrap();
    assert!(session.is_empty());
    assert_eq!(session.snapshot().get("2000"), None);
}

#[test]
fn combined_export_exact_text() {
    let session = seeded_session();
    assert_eq!(
        session.combined_csv().unwrap(),
        "store,postcode\nSYD,2000\nMEL,3000\nMEL,3057\n"
    );
}

#[test]
fn matrix_export_exact_text_and_roundtrip() {
    let session = seeded_session();
    let matrix = session.matrix_csv().unwrap();
    assert_eq!(
        matrix,
        "postcode,SYD,MEL\n2000,1,0\n3000,0,1\n3057,0,1\n"
    );

    let rebuilt = export::table_from_matrix_csv(&matrix).unwrap();
    assert_eq!(rebuilt, session.snapshot());
}

#[test]
fn per_store_export_and_filename() {
    let session = seeded_session();
    assert_eq!(
        session.per_store_csv("MEL").unwrap(),
        "store,postcode\nMEL,3000\nMEL,3057\n"
    );

    let mel: &Store = session
        .stores()
        .iter()
        .find(|s| s.id == "MEL")
        .unwrap();
    assert_eq!(export::store_filename(mel), "melbourne_cbd_postcodes.csv");

    assert_eq!(
        session.per_store_csv("PER").unwrap_err().downcast::<AssignmentError>().unwrap(),
        AssignmentError::UnknownStore("PER".to_string())
    );
}

#[test]
fn empty_session_exports_are_not_errors() {
    let session = Session::sample().expect("sample dataset loads");
    assert!(session.is_empty());

    assert_eq!(session.combined_csv().unwrap(), "store,postcode\n");

    let matrix = session.matrix_csv().unwrap();
    let mut lines = matrix.lines();
    assert_eq!(lines.next(), Some("postcode,SYD,MEL"));
    for line in lines {
        let (_, cells) = line.split_once(',').unwrap();
        assert!(cells.split(',').all(|cell| cell == "0"), "line: {}", line);
    }
}

#[test]
fn diagnostics_battery_passes_on_sample() {
    let session = seeded_session();
    let results = session.diagnostics();
    assert_eq!(results.len(), 8);
    for check in &results {
        assert!(check.pass, "check failed: {}", check.name);
    }
}
