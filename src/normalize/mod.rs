//! Normalization of an uploaded cell grid into fixed-schema destination
//! rows.
//!
//! The destination sheet has 28 columns in a fixed order. Source workbooks
//! name their columns but may reorder them, omit some, or (for the
//! "Updated By"/"Updated At" pairs) repeat them on purpose. Normalization
//! resolves columns by header label, reformats the date-bearing columns,
//! and fills the caller-supplied metadata columns.

pub mod dates;

use crate::error::{Result, SyncError};
use crate::grid::{Cell, HeaderIndex, RawGrid};
use dates::{format_date, DateRender, DateStyle};

/// One destination row: 28 text fields in fixed output order.
pub type SheetRow = Vec<String>;

/// Width of the destination schema. Every normalized row has exactly this
/// many fields regardless of the source grid's width.
pub const OUTPUT_WIDTH: usize = 28;

/// Output position carrying the upload timestamp (blank unless stamped).
pub const UPLOAD_STAMP_POS: usize = 27;

/// How the upload-timestamp column is filled.
#[derive(Debug, Clone)]
pub enum StampMode {
    /// The caller captured a timestamp and wants it stamped client-side.
    Client(String),
    /// Left blank; the service stamps it later when the mode asks for it.
    Deferred,
}

/// One slot of the destination schema.
enum OutputColumn {
    /// Copy the nth occurrence of a named source column verbatim.
    Source { header: &'static str, nth: usize },
    /// Same, but reformatted as a date with a fixed component order.
    SourceDate {
        header: &'static str,
        nth: usize,
        style: DateStyle,
    },
    /// Reserved, always blank.
    Blank,
    /// The uploader's name, supplied by the caller.
    Uploader,
    /// The client-captured upload timestamp, or blank when deferred.
    UploadStamp,
}

use OutputColumn::*;

/// The destination column order. Positions 9 and 12 are reserved remark and
/// description fields that stay blank.
const OUTPUT_COLUMNS: [OutputColumn; OUTPUT_WIDTH] = [
    SourceDate { header: "Date", nth: 0, style: DateStyle::MonthFirst }, // 0
    Source { header: "Month", nth: 0 },                                  // 1
    Source { header: "Year", nth: 0 },                                   // 2
    Source { header: "Team", nth: 0 },                                   // 3
    Source { header: "Cost Center", nth: 0 },                            // 4
    Source { header: "Type", nth: 0 },                                   // 5
    Source { header: "Account Group", nth: 0 },                          // 6
    Source { header: "Account", nth: 0 },                                // 7
    Source { header: "Hospital", nth: 0 },                               // 8
    Blank,                                                               // 9
    Source { header: "Doctor", nth: 0 },                                 // 10
    Source { header: "Event", nth: 0 },                                  // 11
    Blank,                                                               // 12
    Source { header: "Request", nth: 0 },                                // 13
    Source { header: "Request Amount", nth: 0 },                         // 14
    Source { header: "Payby", nth: 0 },                                  // 15
    Source { header: "Payee", nth: 0 },                                  // 16
    Source { header: "Status", nth: 0 },                                 // 17
    SourceDate { header: "Clearing Date", nth: 0, style: DateStyle::DayFirst }, // 18
    Source { header: "Clearing Amount", nth: 0 },                        // 19
    Source { header: "Plan", nth: 0 },                                   // 20
    Uploader,                                                            // 21
    SourceDate { header: "Created At", nth: 0, style: DateStyle::MonthFirst }, // 22
    Source { header: "Updated By", nth: 0 },                             // 23
    SourceDate { header: "Updated At", nth: 0, style: DateStyle::DayFirst }, // 24
    Source { header: "Updated By", nth: 1 },                             // 25
    SourceDate { header: "Updated At", nth: 1, style: DateStyle::DayFirst }, // 26
    UploadStamp,                                                         // 27
];

/// Caller-scoped inputs for one normalization run. Nothing here is ambient
/// state; the uploader and stamp always arrive as explicit parameters.
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    pub uploader: String,
    pub stamp: StampMode,
    pub render: DateRender,
}

/// Maps every non-blank data row of `grid` onto the destination schema.
///
/// A grid with no header row fails the whole batch (there is no data
/// section to map). A grid with a header but no data rows is a valid,
/// empty upload. Within a row, a missing source column or an unparseable
/// date degrades to an empty field and processing continues.
pub fn normalize(grid: &RawGrid, opts: &NormalizeOptions) -> Result<Vec<SheetRow>> {
    let header = grid
        .header()
        .ok_or_else(|| SyncError::SchemaNotFound("workbook has no header row".to_string()))?;
    let index = HeaderIndex::new(header);

    let mut out = Vec::new();
    for row in grid.data_rows() {
        if row.iter().all(Cell::is_empty) {
            continue;
        }
        out.push(normalize_row(row, &index, opts));
    }
    Ok(out)
}

fn normalize_row(row: &[Cell], index: &HeaderIndex, opts: &NormalizeOptions) -> SheetRow {
    OUTPUT_COLUMNS
        .iter()
        .map(|column| match column {
            Blank => String::new(),
            Uploader => opts.uploader.clone(),
            UploadStamp => match &opts.stamp {
                StampMode::Client(ts) => ts.clone(),
                StampMode::Deferred => String::new(),
            },
            Source { header, nth } => source_cell(row, index, header, *nth)
                .map(Cell::as_text)
                .unwrap_or_default(),
            SourceDate { header, nth, style } => source_cell(row, index, header, *nth)
                .map(|cell| format_date(cell, *style, opts.render))
                .unwrap_or_default(),
        })
        .collect()
}

fn source_cell<'a>(
    row: &'a [Cell],
    index: &HeaderIndex,
    header: &str,
    nth: usize,
) -> Option<&'a Cell> {
    index.find_nth(header, nth).and_then(|col| row.get(col))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn opts() -> NormalizeOptions {
        NormalizeOptions {
            uploader: "Somsak".to_string(),
            stamp: StampMode::Deferred,
            render: DateRender::Slashed,
        }
    }

    /// A minimal template-shaped grid: reordered columns, one duplicated
    /// "Updated By"/"Updated At" pair.
    fn template_grid() -> RawGrid {
        RawGrid {
            rows: vec![
                vec![
                    text(" Date "),
                    text("Team"),
                    text("Cost Center"),
                    text("Request Amount"),
                    text("Updated By"),
                    text("Updated At"),
                    text("Updated By"),
                    text("Updated At"),
                ],
                vec![
                    Cell::Number(44941.0),
                    text("Oncology"),
                    text("CC-104"),
                    Cell::Number(2500.0),
                    text("first editor"),
                    text("15/01/23"),
                    text("second editor"),
                    text("16/01/23"),
                ],
            ],
        }
    }

    #[test]
    fn rows_are_always_28_wide() {
        let rows = normalize(&template_grid(), &opts()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), OUTPUT_WIDTH);
    }

    #[test]
    fn columns_land_at_fixed_positions() {
        let rows = normalize(&template_grid(), &opts()).unwrap();
        let row = &rows[0];
        assert_eq!(row[0], "01/15/2023"); // Date, month-first
        assert_eq!(row[3], "Oncology");
        assert_eq!(row[4], "CC-104");
        assert_eq!(row[14], "2500");
        assert_eq!(row[21], "Somsak");
        assert_eq!(row[23], "first editor");
        assert_eq!(row[24], "15/01/2023"); // Updated At #1, day-first
        assert_eq!(row[25], "second editor");
        assert_eq!(row[26], "16/01/2023"); // Updated At #2, day-first
    }

    #[test]
    fn reserved_positions_stay_blank() {
        let rows = normalize(&template_grid(), &opts()).unwrap();
        assert_eq!(rows[0][9], "");
        assert_eq!(rows[0][12], "");
    }

    #[test]
    fn missing_source_columns_render_empty() {
        // No "Hospital", "Doctor", etc. in the template grid above.
        let rows = normalize(&template_grid(), &opts()).unwrap();
        assert_eq!(rows[0][8], "");
        assert_eq!(rows[0][10], "");
        assert_eq!(rows[0][17], "");
    }

    #[test]
    fn all_empty_rows_are_skipped() {
        let mut grid = template_grid();
        grid.rows.insert(1, vec![Cell::Empty, text(""), Cell::Empty]);
        let duplicate = grid.rows[2].clone();
        grid.rows.push(duplicate);
        let rows = normalize(&grid, &opts()).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn header_only_grid_is_an_empty_upload() {
        let grid = RawGrid {
            rows: vec![vec![text("Date"), text("Team")]],
        };
        assert_eq!(normalize(&grid, &opts()).unwrap().len(), 0);
    }

    #[test]
    fn gridless_input_is_a_schema_failure() {
        let err = normalize(&RawGrid::default(), &opts()).unwrap_err();
        assert!(matches!(err, SyncError::SchemaNotFound(_)));
    }

    #[test]
    fn client_stamp_fills_the_last_column() {
        let stamped = NormalizeOptions {
            stamp: StampMode::Client("15/01/2023, 10:30:00".to_string()),
            ..opts()
        };
        let rows = normalize(&template_grid(), &stamped).unwrap();
        assert_eq!(rows[0][UPLOAD_STAMP_POS], "15/01/2023, 10:30:00");

        let deferred = normalize(&template_grid(), &opts()).unwrap();
        assert_eq!(deferred[0][UPLOAD_STAMP_POS], "");
    }
}
