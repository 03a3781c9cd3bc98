//! Export Formatting
//!
//! Pure transforms from a table snapshot to CSV text. Three shapes:
//! - combined: one `store,postcode` row per assignment pair
//! - matrix: rows = all known postcodes, columns = stores, cells 1/0
//! - per-store: combined rows filtered to a single store
//!
//! Row order is fully deterministic: stores in declaration order, postcodes
//! ascending lexicographically. Serialization goes through polars' CSV writer
//! so untrusted ids and names get standard quote-when-needed escaping. A
//! zero-assignment snapshot yields a header-only combined CSV and an all-zero
//! matrix; whether to offer such a download is the caller's call.

use anyhow::{Context, Result};
use polars::prelude::*;
use std::collections::BTreeSet;
use std::io::Cursor;

use crate::assignment::TableSnapshot;
use crate::data::{Postcode, Store};

/// Combined export as a two-column frame, one row per assignment pair
pub fn combined_frame(snapshot: &TableSnapshot, stores: &[Store]) -> Result<DataFrame> {
    let mut store_col: Vec<String> = Vec::new();
    let mut postcode_col: Vec<String> = Vec::new();

    for store in stores {
        // Snapshot is ordered, so postcodes come out ascending per store group
        for (code, assigned) in snapshot {
            if assigned.contains(&store.id) {
                store_col.push(store.id.clone());
                postcode_col.push(code.clone());
            }
        }
    }

    df!("store" => store_col, "postcode" => postcode_col)
        .context("Failed to build combined export frame")
}

/// Combined CSV: `store,postcode` header plus one row per assignment pair
pub fn combined_csv(snapshot: &TableSnapshot, stores: &[Store]) -> Result<String> {
    csv_string(&mut combined_frame(snapshot, stores)?)
}

/// Matrix export frame: `postcode` column plus one 1/0 column per store
pub fn matrix_frame(
    snapshot: &TableSnapshot,
    stores: &[Store],
    postcodes: &[Postcode],
) -> Result<DataFrame> {
    let mut codes: Vec<String> = postcodes.iter().map(|p| p.code.clone()).collect();
    codes.sort_unstable();
    codes.dedup();

    let mut columns = Vec::with_capacity(stores.len() + 1);
    columns.push(Column::new("postcode".into(), &codes));
    for store in stores {
        let cells: Vec<i32> = codes
            .iter()
            .map(|code| {
                snapshot
                    .get(code)
                    .is_some_and(|assigned| assigned.contains(&store.id)) as i32
            })
            .collect();
        columns.push(Column::new(store.id.as_str().into(), cells));
    }

    DataFrame::new(columns).context("Failed to build matrix export frame")
}

/// Matrix CSV over all known postcodes
pub fn matrix_csv(
    snapshot: &TableSnapshot,
    stores: &[Store],
    postcodes: &[Postcode],
) -> Result<String> {
    csv_string(&mut matrix_frame(snapshot, stores, postcodes)?)
}

/// Combined CSV filtered to a single store
pub fn per_store_csv(snapshot: &TableSnapshot, store: &Store) -> Result<String> {
    let postcode_col: Vec<String> = snapshot
        .iter()
        .filter(|(_, assigned)| assigned.contains(&store.id))
        .map(|(code, _)| code.clone())
        .collect();
    let store_col = vec![store.id.clone(); postcode_col.len()];

    let mut frame = df!("store" => store_col, "postcode" => postcode_col)
        .context("Failed to build per-store export frame")?;
    csv_string(&mut frame)
}

/// Download filename for a per-store export, derived from the display name
pub fn store_filename(store: &Store) -> String {
    let token: String = store
        .name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    let token = token.trim_matches('_');
    if token.is_empty() {
        format!("store_{}_postcodes.csv", store.id.to_lowercase())
    } else {
        format!("{}_postcodes.csv", token)
    }
}

/// Rebuild a snapshot from matrix CSV text (cell `1` → assigned)
///
/// Inverse of `matrix_csv` up to empty rows: postcodes with no assignments
/// have no snapshot entry.
pub fn table_from_matrix_csv(csv_text: &str) -> Result<TableSnapshot> {
    let frame = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(Cursor::new(csv_text.as_bytes().to_vec()))
        .finish()
        .context("Failed to parse matrix CSV")?;

    let codes = frame
        .column("postcode")
        .context("matrix CSV missing 'postcode' column")?
        .as_materialized_series()
        .str()
        .context("'postcode' column is not a string column")?;

    let mut snapshot = TableSnapshot::new();
    for column in frame.get_columns() {
        if column.name().as_str() == "postcode" {
            continue;
        }
        let cells = column
            .as_materialized_series()
            .str()
            .context("matrix cell column is not a string column")?;
        for row in 0..frame.height() {
            if cells.get(row) == Some("1") {
                if let Some(code) = codes.get(row) {
                    snapshot
                        .entry(code.to_string())
                        .or_insert_with(BTreeSet::new)
                        .insert(column.name().to_string());
                }
            }
        }
    }
    Ok(snapshot)
}

fn csv_string(frame: &mut DataFrame) -> Result<String> {
    let mut buffer = Vec::new();
    CsvWriter::new(&mut buffer)
        .include_header(true)
        .finish(frame)
        .context("Failed to serialize CSV")?;
    String::from_utf8(buffer).context("CSV output was not valid UTF-8")
}
