//! The append-only record of who uploaded which file when.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};
use crate::store::SheetStore;

/// How many entries the log endpoint returns.
pub const RECENT_LIMIT: usize = 5;

/// One upload-log record, stored as a 3-column row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadLogEntry {
    pub uploader: String,
    pub file_name: String,
    pub timestamp: String,
}

impl UploadLogEntry {
    fn to_row(&self) -> Vec<String> {
        vec![
            self.uploader.clone(),
            self.file_name.clone(),
            self.timestamp.clone(),
        ]
    }

    fn from_row(row: &[String]) -> Self {
        let field = |i: usize| row.get(i).cloned().unwrap_or_default();
        Self {
            uploader: field(0),
            file_name: field(1),
            timestamp: field(2),
        }
    }
}

/// Appends one entry to the log sheet. The log is insertion-ordered and
/// never mutated or pruned from here.
pub async fn append(store: &dyn SheetStore, sheet: &str, entry: &UploadLogEntry) -> Result<()> {
    store.append_rows(sheet, &[entry.to_row()]).await?;
    Ok(())
}

/// The `limit` most recent entries, most recent first. A log sheet that
/// does not exist yet reads as empty rather than failing, so a fresh
/// deployment serves an empty log.
pub async fn recent(
    store: &dyn SheetStore,
    sheet: &str,
    limit: usize,
) -> Result<Vec<UploadLogEntry>> {
    let rows = match store.read_rows(sheet, 1).await {
        Ok(rows) => rows,
        Err(SyncError::Upstream(message)) if message.contains("Unable to parse range") => {
            Vec::new()
        }
        Err(e) => return Err(e),
    };
    Ok(rows
        .iter()
        .rev()
        .take(limit)
        .map(|row| UploadLogEntry::from_row(row))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemorySheetStore;

    fn entry(n: usize) -> UploadLogEntry {
        UploadLogEntry {
            uploader: format!("user{n}"),
            file_name: format!("file{n}.xlsx"),
            timestamp: format!("0{n}/01/2023, 09:00:00"),
        }
    }

    #[tokio::test]
    async fn missing_log_sheet_reads_as_empty() {
        let store = InMemorySheetStore::new();
        let entries = recent(&store, "UploadLog", RECENT_LIMIT).await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn recent_returns_newest_first_capped_at_limit() {
        let store = InMemorySheetStore::new();
        for n in 1..=7 {
            append(&store, "UploadLog", &entry(n)).await.unwrap();
        }
        let entries = recent(&store, "UploadLog", RECENT_LIMIT).await.unwrap();
        assert_eq!(entries.len(), RECENT_LIMIT);
        assert_eq!(entries[0], entry(7));
        assert_eq!(entries[4], entry(3));
    }

    #[tokio::test]
    async fn ragged_log_rows_read_as_blank_fields() {
        let store = InMemorySheetStore::new();
        store.seed("UploadLog", vec![vec!["only-uploader".to_string()]]);
        let entries = recent(&store, "UploadLog", RECENT_LIMIT).await.unwrap();
        assert_eq!(entries[0].uploader, "only-uploader");
        assert_eq!(entries[0].file_name, "");
        assert_eq!(entries[0].timestamp, "");
    }
}
