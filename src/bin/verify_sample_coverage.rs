//! Verify the sample coverage battery
//!
//! Expected: SYD covers 2000; MEL covers 3000 and 3057. Exits non-zero when
//! any diagnostic fails, for use in scripted checks.

use postcode_mapper::Session;

fn main() {
    let mut session = Session::sample().expect("Failed to load sample dataset");
    session
        .seed_from_classifier()
        .expect("Failed to seed assignments from classifier");

    println!("{}", "=".repeat(65));
    println!("SAMPLE COVERAGE VERIFICATION");
    println!("{}", "=".repeat(65));

    let results = session.diagnostics();
    let mut failures = 0;
    for check in &results {
        let glyph = if check.pass { "✅" } else { "❌" };
        println!("{} {}", glyph, check.name);
        if !check.pass {
            failures += 1;
        }
    }

    println!("{}", "=".repeat(65));
    if failures == 0 {
        println!("RESULT: all {} checks passed", results.len());
    } else {
        println!("RESULT: {} of {} checks failed", failures, results.len());
        std::process::exit(1);
    }
}
