//! Extraction of the named data worksheet from an uploaded workbook file.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::Datelike;
use tracing::debug;

use crate::error::{Result, SyncError};
use crate::grid::{Cell, RawGrid};

/// Name of the worksheet the upload template stores expense rows in.
pub const DATA_SHEET: &str = "Data";

/// Opens a workbook file and extracts the "Data" worksheet as a raw grid.
///
/// A workbook without that tab has no data section to upload; that is the
/// same failure as a grid without a header row, and it is surfaced before
/// anything is sent anywhere.
pub fn extract_grid(path: &Path) -> Result<RawGrid> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| SyncError::SchemaNotFound(format!("could not open workbook: {e}")))?;
    let range = workbook
        .worksheet_range(DATA_SHEET)
        .map_err(|e| SyncError::SchemaNotFound(format!("worksheet '{DATA_SHEET}' not found: {e}")))?;

    let rows: Vec<Vec<Cell>> = range
        .rows()
        .map(|row| row.iter().map(convert_cell).collect())
        .collect();
    debug!(rows = rows.len(), "extracted worksheet grid");
    Ok(RawGrid { rows })
}

fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(naive) => Cell::Date(naive.year(), naive.month(), naive.day()),
            // A datetime cell that does not resolve still carries its raw
            // serial value, which the date formatter knows how to read.
            None => Cell::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Text(format!("{e:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_a_schema_failure() {
        let err = extract_grid(Path::new("/nonexistent/expenses.xlsx")).unwrap_err();
        assert!(matches!(err, SyncError::SchemaNotFound(_)));
    }

    #[test]
    fn cells_convert_to_the_closed_variant() {
        assert_eq!(convert_cell(&Data::Empty), Cell::Empty);
        assert_eq!(
            convert_cell(&Data::String("Oncology".to_string())),
            Cell::Text("Oncology".to_string())
        );
        assert_eq!(convert_cell(&Data::Int(42)), Cell::Number(42.0));
        assert_eq!(convert_cell(&Data::Float(44941.0)), Cell::Number(44941.0));
        assert_eq!(
            convert_cell(&Data::Bool(true)),
            Cell::Text("true".to_string())
        );
    }
}
