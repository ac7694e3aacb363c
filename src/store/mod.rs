//! The destination spreadsheet service, reduced to the calls the
//! reconciler needs.

pub mod auth;
pub mod google;
pub mod in_memory;

pub use google::GoogleSheetsStore;
pub use in_memory::InMemorySheetStore;

use async_trait::async_trait;

use crate::error::Result;

/// Row-level access to one named tab of the shared spreadsheet document.
///
/// The store is externally owned and exposes no transaction or locking
/// primitive; implementations do not retry, and any failure is terminal for
/// the current request.
#[async_trait]
pub trait SheetStore: Send + Sync {
    /// All rows of `sheet` from `first_row` (1-based) downward.
    async fn read_rows(&self, sheet: &str, first_row: u32) -> Result<Vec<Vec<String>>>;

    /// Appends after the last populated row; returns the number of rows
    /// written.
    async fn append_rows(&self, sheet: &str, rows: &[Vec<String>]) -> Result<usize>;

    /// Overwrites starting at `first_row`; returns the number of rows
    /// written.
    async fn write_rows(&self, sheet: &str, first_row: u32, rows: &[Vec<String>])
        -> Result<usize>;

    /// Clears everything from `first_row` downward.
    async fn clear_rows(&self, sheet: &str, first_row: u32) -> Result<()>;

    /// Sets a single cell addressed in A1 notation.
    async fn set_cell(&self, sheet: &str, cell: &str, value: &str) -> Result<()>;
}
