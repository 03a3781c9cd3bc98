//! End-to-end run over the embedded sample dataset
//!
//! Seeds assignments from the classifier, applies a couple of operator
//! toggles, writes the three export files to the working directory and prints
//! the diagnostics battery.

use postcode_mapper::{export, Session, ToggleOutcome};
use std::time::Instant;

fn main() {
    println!("Initializing postcode session (sample data)...\n");
    let start = Instant::now();

    let mut session = Session::sample().expect("Failed to load sample dataset");
    session
        .seed_from_classifier()
        .expect("Failed to seed assignments from classifier");

    println!("  Stores: {}", session.stores().len());
    println!("  Postcodes: {}", session.postcodes().len());
    println!("  Seeded assignments: {}", session.assignment_count());
    for issue in session.issues() {
        println!("  ⚠ skipped geometry: {}", issue);
    }

    println!("\n{}", "=".repeat(70));
    println!("OPERATOR TOGGLES");
    println!("{}", "=".repeat(70));

    // Override: add Melbourne CBD coverage of 2000, then take it back
    session.set_active_store(Some("MEL")).expect("MEL is a sample store");
    for _ in 0..2 {
        let outcome = session.toggle("2000").expect("toggle with active store");
        let verb = match outcome {
            ToggleOutcome::Assigned => "assigned to",
            ToggleOutcome::Unassigned => "unassigned from",
        };
        println!("  2000 {} MEL", verb);
    }

    println!("\n{}", "=".repeat(70));
    println!("EXPORTS");
    println!("{}", "=".repeat(70));

    let combined = session.combined_csv().expect("combined export");
    std::fs::write("combined_store_postcodes.csv", &combined)
        .expect("write combined CSV");
    println!("  combined_store_postcodes.csv ({} rows)", combined.lines().count() - 1);

    let matrix = session.matrix_csv().expect("matrix export");
    std::fs::write("postcode_store_matrix.csv", &matrix).expect("write matrix CSV");
    println!("  postcode_store_matrix.csv ({} rows)", matrix.lines().count() - 1);

    for store in session.stores() {
        let csv = session.per_store_csv(&store.id).expect("per-store export");
        let filename = export::store_filename(store);
        std::fs::write(&filename, &csv).expect("write per-store CSV");
        println!("  {} ({} rows)", filename, csv.lines().count() - 1);
    }

    println!("\n{}", "=".repeat(70));
    println!("DIAGNOSTICS");
    println!("{}", "=".repeat(70));

    for check in session.diagnostics() {
        let glyph = if check.pass { "✅" } else { "❌" };
        println!("  {} {}", glyph, check.name);
    }

    println!("\nDone in {:.2?}", start.elapsed());
}
