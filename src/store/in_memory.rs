use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use super::SheetStore;
use crate::error::{Result, SyncError};

/// In-memory sheet store for development and testing.
///
/// Reading a sheet that was never written fails with the same "Unable to
/// parse range" wording the remote service uses for an unknown tab, so
/// callers exercise the same fallback paths locally.
#[derive(Default)]
pub struct InMemorySheetStore {
    sheets: Mutex<HashMap<String, Vec<Vec<String>>>>,
}

impl InMemorySheetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates a sheet; the given rows start at row 1.
    pub fn seed(&self, sheet: &str, rows: Vec<Vec<String>>) {
        self.sheets.lock().unwrap().insert(sheet.to_string(), rows);
    }

    /// Full contents of a sheet, empty when it does not exist.
    pub fn snapshot(&self, sheet: &str) -> Vec<Vec<String>> {
        self.sheets
            .lock()
            .unwrap()
            .get(sheet)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl SheetStore for InMemorySheetStore {
    async fn read_rows(&self, sheet: &str, first_row: u32) -> Result<Vec<Vec<String>>> {
        let sheets = self.sheets.lock().unwrap();
        let rows = sheets
            .get(sheet)
            .ok_or_else(|| SyncError::Upstream(format!("Unable to parse range: '{sheet}'")))?;
        let skip = first_row.saturating_sub(1) as usize;
        Ok(rows.iter().skip(skip).cloned().collect())
    }

    async fn append_rows(&self, sheet: &str, rows: &[Vec<String>]) -> Result<usize> {
        let mut sheets = self.sheets.lock().unwrap();
        let target = sheets.entry(sheet.to_string()).or_default();
        target.extend(rows.iter().cloned());
        debug!(sheet, count = rows.len(), "appended rows");
        Ok(rows.len())
    }

    async fn write_rows(
        &self,
        sheet: &str,
        first_row: u32,
        rows: &[Vec<String>],
    ) -> Result<usize> {
        let mut sheets = self.sheets.lock().unwrap();
        let target = sheets.entry(sheet.to_string()).or_default();
        let start = first_row.saturating_sub(1) as usize;
        if target.len() < start {
            target.resize(start, Vec::new());
        }
        for (offset, row) in rows.iter().enumerate() {
            let at = start + offset;
            if at < target.len() {
                target[at] = row.clone();
            } else {
                target.push(row.clone());
            }
        }
        Ok(rows.len())
    }

    async fn clear_rows(&self, sheet: &str, first_row: u32) -> Result<()> {
        let mut sheets = self.sheets.lock().unwrap();
        let target = sheets.entry(sheet.to_string()).or_default();
        target.truncate(first_row.saturating_sub(1) as usize);
        Ok(())
    }

    async fn set_cell(&self, sheet: &str, cell: &str, value: &str) -> Result<()> {
        let (row, col) = parse_a1(cell)?;
        let mut sheets = self.sheets.lock().unwrap();
        let target = sheets.entry(sheet.to_string()).or_default();
        if target.len() <= row {
            target.resize(row + 1, Vec::new());
        }
        if target[row].len() <= col {
            target[row].resize(col + 1, String::new());
        }
        target[row][col] = value.to_string();
        Ok(())
    }
}

/// Minimal A1 parser ("B1" → row 0, col 1). Enough for the single metadata
/// cell the reconciler touches.
fn parse_a1(cell: &str) -> Result<(usize, usize)> {
    let letters: String = cell
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    let digits = &cell[letters.len()..];
    if letters.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SyncError::BadInput(format!("invalid A1 address: {cell}")));
    }
    let col = letters
        .to_ascii_uppercase()
        .bytes()
        .fold(0usize, |acc, b| acc * 26 + (b - b'A') as usize + 1)
        - 1;
    let row: usize = digits
        .parse()
        .map_err(|_| SyncError::BadInput(format!("invalid A1 address: {cell}")))?;
    if row == 0 {
        return Err(SyncError::BadInput(format!("invalid A1 address: {cell}")));
    }
    Ok((row - 1, col))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn read_of_unknown_sheet_matches_remote_wording() {
        let store = InMemorySheetStore::new();
        let err = store.read_rows("UploadLog", 1).await.unwrap_err();
        assert!(err.to_string().contains("Unable to parse range"));
    }

    #[tokio::test]
    async fn read_skips_rows_above_first_row() {
        let store = InMemorySheetStore::new();
        store.seed("Data", vec![row(&["header"]), row(&["a"]), row(&["b"])]);
        let rows = store.read_rows("Data", 2).await.unwrap();
        assert_eq!(rows, vec![row(&["a"]), row(&["b"])]);
    }

    #[tokio::test]
    async fn append_then_clear_preserves_the_header_region() {
        let store = InMemorySheetStore::new();
        store.seed("Data", vec![row(&["header"])]);
        store
            .append_rows("Data", &[row(&["a"]), row(&["b"])])
            .await
            .unwrap();
        assert_eq!(store.snapshot("Data").len(), 3);

        store.clear_rows("Data", 2).await.unwrap();
        assert_eq!(store.snapshot("Data"), vec![row(&["header"])]);
    }

    #[tokio::test]
    async fn write_rows_overwrites_in_place() {
        let store = InMemorySheetStore::new();
        store.seed("Data", vec![row(&["header"]), row(&["old"])]);
        store
            .write_rows("Data", 2, &[row(&["new"]), row(&["extra"])])
            .await
            .unwrap();
        assert_eq!(
            store.snapshot("Data"),
            vec![row(&["header"]), row(&["new"]), row(&["extra"])]
        );
    }

    #[tokio::test]
    async fn set_cell_grows_the_grid_as_needed() {
        let store = InMemorySheetStore::new();
        store.set_cell("Data", "AD1", "15/01/2023").await.unwrap();
        let rows = store.snapshot("Data");
        assert_eq!(rows[0][29], "15/01/2023");

        assert!(store.set_cell("Data", "11", "x").await.is_err());
        assert!(store.set_cell("Data", "A0", "x").await.is_err());
    }
}
