//! Postcode Coverage Engine
//!
//! Assigns postcode regions to retail stores by spatial coverage (radius or
//! polygon containment), tracks operator toggles in a mutable assignment
//! table, and serializes the result as combined / matrix CSV exports.
//!
//! Module layout:
//! - `data`: store configuration and postcode dataset loading
//! - `coverage`: haversine + point-in-polygon classification
//! - `assignment`: the mutable postcode → store-set table
//! - `export`: CSV serialization over table snapshots
//! - `diagnostics`: fixed pass/fail check battery
//! - `session`: per-session coordinator tying the pieces together
//!
//! Map rendering, marker icons and download mechanics live with the caller;
//! the engine only computes memberships and produces text blobs.

pub mod assignment;
pub mod coverage;
pub mod data;
pub mod diagnostics;
pub mod export;
pub mod session;

// Re-export commonly used types
pub use assignment::{AssignmentError, AssignmentTable, TableSnapshot, ToggleOutcome};
pub use coverage::{
    classify, classify_all, haversine_km, Coverage, GeometryIssue, GeometryKind,
};
pub use data::{Postcode, Store, StoreConfig};
pub use diagnostics::{sample_expectations, CheckResult, Expectation};
pub use session::Session;
