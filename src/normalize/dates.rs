//! Date reformatting for the handful of date-bearing output columns.
//!
//! Source workbooks encode dates three different ways (native date cells,
//! day-count serials, and a few text shapes), and each destination column
//! has a fixed component order. All parsing degrades to an empty string
//! rather than failing the row.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Deserialize;
use tracing::warn;

use crate::grid::Cell;

/// Which component leads when a date is rendered. Fixed per output column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateStyle {
    MonthFirst,
    DayFirst,
}

/// Whether rendered dates carry separators (`MM/DD/YYYY`) or are compact
/// digit runs (`MMDDYYYY`). Selected once per deployment, not per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateRender {
    #[default]
    Slashed,
    Compact,
}

/// Day 0 of the spreadsheet serial-date epoch; serial 25569 is 1970-01-01.
fn serial_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).expect("fixed epoch")
}

/// Reformats one cell as a date. Empty input and anything unparseable
/// render as `""`; unparseable values additionally log a warning so bad
/// source files can be diagnosed without failing the batch.
pub fn format_date(cell: &Cell, style: DateStyle, render: DateRender) -> String {
    match cell {
        Cell::Empty => String::new(),
        Cell::Date(y, m, d) => render_numeric(*d, *m, *y, style, render),
        Cell::Number(n) => format_serial(*n, style, render),
        Cell::Text(s) => format_text(s, style, render),
    }
}

fn format_serial(serial: f64, style: DateStyle, render: DateRender) -> String {
    if !serial.is_finite() || serial <= 0.0 {
        warn!(serial, "numeric cell is not a usable serial date");
        return String::new();
    }
    let days = serial.floor() as i64;
    match serial_epoch().checked_add_signed(Duration::days(days)) {
        Some(date) => render_numeric(date.day(), date.month(), date.year(), style, render),
        None => {
            warn!(serial, "serial date out of range");
            String::new()
        }
    }
}

fn format_text(raw: &str, style: DateStyle, render: DateRender) -> String {
    let text = raw.trim();
    if text.is_empty() {
        return String::new();
    }

    let parts: Vec<&str> = text.split(['/', '-', '.']).collect();
    if parts.len() == 3 {
        // Three-part strings are read day-first; there is no locale
        // detection, so "02/03/24" means the 2nd of March. A two-digit
        // year is taken as 20xx.
        let year_part = parts[2].trim();
        let year = if year_part.len() == 2 {
            format!("20{year_part}")
        } else {
            year_part.to_string()
        };
        if let (Ok(d), Ok(m), Ok(y)) = (
            parts[0].trim().parse::<u32>(),
            parts[1].trim().parse::<u32>(),
            year.parse::<i32>(),
        ) {
            if NaiveDate::from_ymd_opt(y, m, d).is_some() {
                return render_numeric(d, m, y, style, render);
            }
        }
        warn!(value = %raw, "text cell is not a parseable date");
        return String::new();
    }

    // Legacy rule: a bare 6-digit run is DDMMYY, re-rendered by slicing
    // alone. The digits are NOT validated as a calendar date ("310223"
    // still renders); callers rely on this passing through untouched.
    if parts.len() == 1 && text.len() == 6 && text.bytes().all(|b| b.is_ascii_digit()) {
        let year = format!("20{}", &text[4..6]);
        return render_parts(&text[0..2], &text[2..4], &year, style, render);
    }

    warn!(value = %raw, "text cell is not a recognizable date");
    String::new()
}

fn render_numeric(day: u32, month: u32, year: i32, style: DateStyle, render: DateRender) -> String {
    render_parts(
        &format!("{day:02}"),
        &format!("{month:02}"),
        &format!("{year:04}"),
        style,
        render,
    )
}

fn render_parts(day: &str, month: &str, year: &str, style: DateStyle, render: DateRender) -> String {
    match (style, render) {
        (DateStyle::MonthFirst, DateRender::Slashed) => format!("{month}/{day}/{year}"),
        (DateStyle::DayFirst, DateRender::Slashed) => format!("{day}/{month}/{year}"),
        (DateStyle::MonthFirst, DateRender::Compact) => format!("{month}{day}{year}"),
        (DateStyle::DayFirst, DateRender::Compact) => format!("{day}{month}{year}"),
    }
}
