//! The untyped cell grid extracted from one worksheet, and header lookup
//! over it.

/// A single spreadsheet cell. Source files funnel text, numbers, dates and
/// blanks through the same column, so the variants are matched exhaustively
/// wherever a cell is consumed.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    /// A wall-clock calendar date (year, month, day). No timezone attached.
    Date(i32, u32, u32),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.is_empty(),
            Cell::Number(_) | Cell::Date(..) => false,
        }
    }

    /// Renders the cell the way a spreadsheet UI would show it in a plain
    /// text column.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            Cell::Date(y, m, d) => format!("{:04}-{:02}-{:02}", y, m, d),
        }
    }
}

/// The two-dimensional cell table from one worksheet: a header row followed
/// by data rows. Rows may be ragged; a missing cell reads as absent, not as
/// an error.
#[derive(Debug, Clone, Default)]
pub struct RawGrid {
    pub rows: Vec<Vec<Cell>>,
}

impl RawGrid {
    /// The trimmed header labels, or `None` when the grid has no rows at all.
    pub fn header(&self) -> Option<Vec<String>> {
        self.rows
            .first()
            .map(|row| row.iter().map(|c| c.as_text().trim().to_string()).collect())
    }

    pub fn data_rows(&self) -> &[Vec<Cell>] {
        if self.rows.is_empty() {
            &[]
        } else {
            &self.rows[1..]
        }
    }
}

/// Column lookup over a trimmed header row.
///
/// Labels are matched literally (case-sensitive) after trimming. The upload
/// template names two distinct "Updated By"/"Updated At" column pairs, so
/// lookup supports both the first occurrence and the first occurrence after
/// a given position.
#[derive(Debug)]
pub struct HeaderIndex {
    labels: Vec<String>,
}

impl HeaderIndex {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    /// First column whose label equals `name` exactly.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.labels.iter().position(|label| label == name)
    }

    /// First matching column strictly after `pos`.
    pub fn find_after(&self, name: &str, pos: usize) -> Option<usize> {
        self.labels
            .iter()
            .enumerate()
            .skip(pos + 1)
            .find(|(_, label)| label.as_str() == name)
            .map(|(i, _)| i)
    }

    /// The nth (0-based) occurrence of `name`.
    pub fn find_nth(&self, name: &str, nth: usize) -> Option<usize> {
        let mut at = self.find(name)?;
        for _ in 0..nth {
            at = self.find_after(name, at)?;
        }
        Some(at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    #[test]
    fn header_labels_are_trimmed() {
        let grid = RawGrid {
            rows: vec![vec![text(" Date "), text("Team")]],
        };
        assert_eq!(
            grid.header(),
            Some(vec!["Date".to_string(), "Team".to_string()])
        );
    }

    #[test]
    fn find_resolves_first_occurrence() {
        let index = HeaderIndex::new(
            ["Date", "Updated By", "Updated At", "Updated By", "Updated At"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );
        assert_eq!(index.find("Updated By"), Some(1));
        assert_eq!(index.find_after("Updated By", 1), Some(3));
        assert_eq!(index.find_nth("Updated At", 0), Some(2));
        assert_eq!(index.find_nth("Updated At", 1), Some(4));
        assert_eq!(index.find_nth("Updated At", 2), None);
        assert_eq!(index.find("Missing"), None);
    }

    #[test]
    fn numbers_render_without_trailing_zero() {
        assert_eq!(Cell::Number(1500.0).as_text(), "1500");
        assert_eq!(Cell::Number(1500.5).as_text(), "1500.5");
    }

    #[test]
    fn empty_cells() {
        assert!(Cell::Empty.is_empty());
        assert!(text("").is_empty());
        assert!(!Cell::Number(0.0).is_empty());
    }
}
