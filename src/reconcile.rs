//! Merge policy between incoming normalized rows and what the destination
//! sheet already holds.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::normalize::{SheetRow, OUTPUT_WIDTH, UPLOAD_STAMP_POS};
use crate::store::SheetStore;
use crate::upload_log::{self, UploadLogEntry};

/// Output positions whose values identify a row for deduplication: date,
/// team, cost center, account, hospital, doctor, request amount.
const MERGE_KEY_POSITIONS: [usize; 7] = [0, 3, 4, 7, 8, 10, 14];

/// A row needs at least this many fields before a merge key can be built.
/// Shorter rows are never treated as duplicates and never block insertion.
const MERGE_KEY_MIN_WIDTH: usize = 15;

const MERGE_KEY_SEPARATOR: &str = "||";

/// Composite identity over the designated key fields, or `None` when the
/// row is too short to carry them.
pub fn merge_key(row: &[String]) -> Option<String> {
    if row.len() < MERGE_KEY_MIN_WIDTH {
        return None;
    }
    let parts: Vec<&str> = MERGE_KEY_POSITIONS
        .iter()
        .map(|&i| row.get(i).map(String::as_str).unwrap_or(""))
        .collect();
    Some(parts.join(MERGE_KEY_SEPARATOR))
}

/// How incoming rows interact with the sheet's existing contents. The
/// original deployment exposed these as five separate endpoints; they are
/// five points on one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ReconcileMode {
    /// Write every incoming row after the existing data.
    #[default]
    AppendAll,
    /// As `AppendAll`, but the service stamps the upload-timestamp column.
    AppendAllWithTimestamp,
    /// Append only rows whose merge key is not already present.
    AppendNewOnly,
    /// Clear the data region, then write all incoming rows from the top.
    ReplaceAll,
    /// As `ReplaceAll`; kept distinct because the original exposed it as
    /// its own logged endpoint. Logging itself is driven by whether the
    /// caller supplied uploader metadata.
    ReplaceAllWithLog,
}

impl ReconcileMode {
    pub fn is_replace(self) -> bool {
        matches!(self, ReconcileMode::ReplaceAll | ReconcileMode::ReplaceAllWithLog)
    }
}

/// Where the reconciler reads and writes.
#[derive(Debug, Clone)]
pub struct SheetLayout {
    /// Tab holding the expense rows.
    pub data_sheet: String,
    /// First row of the data region (1-based). Everything above is header
    /// and template furniture that replace modes must not touch.
    pub first_data_row: u32,
    /// Tab holding the append-only upload log.
    pub log_sheet: String,
    /// Tab and A1 address of the "last updated" cell.
    pub last_updated_sheet: String,
    pub last_updated_cell: String,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            data_sheet: "All expense".to_string(),
            first_data_row: 2,
            log_sheet: "UploadLog".to_string(),
            last_updated_sheet: "All expense".to_string(),
            last_updated_cell: "AD1".to_string(),
        }
    }
}

/// Per-request inputs that are the caller's to compute, never derived from
/// row content.
#[derive(Debug, Clone)]
pub struct ReconcileContext {
    /// Full timestamp stamped into the upload-timestamp column when the
    /// mode asks for it.
    pub timestamp: String,
    /// Value for the "last updated" cell, set whenever anything was
    /// written.
    pub last_updated: String,
    /// Upload-log metadata. Callers that did not receive uploader/file
    /// information leave this unset, and logging is skipped.
    pub log: Option<UploadLogEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileOutcome {
    pub written: usize,
    pub mode: ReconcileMode,
}

pub struct Reconciler<'a> {
    store: &'a dyn SheetStore,
    layout: &'a SheetLayout,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a dyn SheetStore, layout: &'a SheetLayout) -> Self {
        Self { store, layout }
    }

    /// Applies `incoming` to the destination sheet under `mode`. Writing
    /// zero rows is success.
    ///
    /// Known consistency gap: two append-new-only calls racing each other
    /// can both read the same snapshot and each append overlapping rows.
    /// The store exposes no transaction or lock that could close that
    /// window.
    pub async fn reconcile(
        &self,
        incoming: &[SheetRow],
        mode: ReconcileMode,
        ctx: &ReconcileContext,
    ) -> Result<ReconcileOutcome> {
        let mut rows: Vec<SheetRow> = incoming.to_vec();
        if mode == ReconcileMode::AppendAllWithTimestamp {
            for row in &mut rows {
                stamp_row(row, &ctx.timestamp);
            }
        }

        let written;
        let mutated;
        if mode.is_replace() {
            // Clearing happens even for an empty incoming set: replace
            // semantics include "clear to empty".
            self.store
                .clear_rows(&self.layout.data_sheet, self.layout.first_data_row)
                .await?;
            mutated = true;
            written = if rows.is_empty() {
                0
            } else {
                self.store
                    .write_rows(&self.layout.data_sheet, self.layout.first_data_row, &rows)
                    .await?
            };
        } else {
            if mode == ReconcileMode::AppendNewOnly {
                rows = self.filter_new(rows).await?;
            }
            written = if rows.is_empty() {
                0
            } else {
                self.store
                    .append_rows(&self.layout.data_sheet, &rows)
                    .await?
            };
            mutated = written > 0;
        }

        if mutated {
            self.store
                .set_cell(
                    &self.layout.last_updated_sheet,
                    &self.layout.last_updated_cell,
                    &ctx.last_updated,
                )
                .await?;
        }

        if let Some(entry) = &ctx.log {
            upload_log::append(self.store, &self.layout.log_sheet, entry).await?;
        }

        info!(written, ?mode, "reconciliation finished");
        Ok(ReconcileOutcome { written, mode })
    }

    /// Drops incoming rows whose merge key already exists in the sheet.
    /// Keyless rows always pass through.
    async fn filter_new(&self, rows: Vec<SheetRow>) -> Result<Vec<SheetRow>> {
        let existing = self
            .store
            .read_rows(&self.layout.data_sheet, self.layout.first_data_row)
            .await?;
        let seen: HashSet<String> = existing.iter().filter_map(|row| merge_key(row)).collect();
        Ok(rows
            .into_iter()
            .filter(|row| match merge_key(row) {
                Some(key) => !seen.contains(&key),
                None => true,
            })
            .collect())
    }
}

fn stamp_row(row: &mut SheetRow, timestamp: &str) {
    if row.len() < OUTPUT_WIDTH {
        row.resize(OUTPUT_WIDTH, String::new());
    }
    row[UPLOAD_STAMP_POS] = timestamp.to_string();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wide_row(fill: &str) -> SheetRow {
        vec![fill.to_string(); OUTPUT_WIDTH]
    }

    #[test]
    fn merge_key_ignores_non_key_columns() {
        let a = wide_row("x");
        let mut b = wide_row("x");
        b[11] = "different event".to_string();
        b[20] = "different plan".to_string();
        assert_eq!(merge_key(&a), merge_key(&b));

        let mut c = wide_row("x");
        c[3] = "other team".to_string();
        assert_ne!(merge_key(&a), merge_key(&c));
    }

    #[test]
    fn short_rows_have_no_merge_key() {
        let short: SheetRow = vec!["a".to_string(); MERGE_KEY_MIN_WIDTH - 1];
        assert_eq!(merge_key(&short), None);
        let exact: SheetRow = vec!["a".to_string(); MERGE_KEY_MIN_WIDTH];
        assert!(merge_key(&exact).is_some());
    }

    #[test]
    fn stamp_pads_short_rows_to_full_width() {
        let mut row: SheetRow = vec!["a".to_string(); 3];
        stamp_row(&mut row, "now");
        assert_eq!(row.len(), OUTPUT_WIDTH);
        assert_eq!(row[UPLOAD_STAMP_POS], "now");
    }
}
