// src/parse/solar.rs

use super::{collapse, ParseError};
use crate::sheet::{Cell, Rows};

pub const SOLAR_SHEET: &str = "Monthly Totals- States";

/// Positional names of the sheet's columns. The published header spans
/// several rows (group labels above sector labels), so names are assigned
/// by position once the `Year | Month | State` row is found.
pub const SOLAR_COLUMNS: [&str; 12] = [
    "year", "month", "state", "status", "res_mw", "com_mw", "ind_mw", "tot_mw", "res_mwh",
    "com_mwh", "ind_mwh", "tot_mwh",
];

const STATUS: usize = 3;
const HEADER_SEARCH_ROWS: usize = 10;

pub(super) fn parse(grid: Rows) -> Result<(Vec<String>, Rows), ParseError> {
    let header_idx = grid
        .iter()
        .take(HEADER_SEARCH_ROWS)
        .position(|row| is_column_row(row))
        .ok_or_else(|| {
            ParseError::Layout(format!(
                "no 'Year | Month | State' header row in the first {HEADER_SEARCH_ROWS} rows"
            ))
        })?;

    let width = grid[header_idx].len();
    if width < SOLAR_COLUMNS.len() {
        return Err(ParseError::Layout(format!(
            "expected {} columns, header row has {width}",
            SOLAR_COLUMNS.len()
        )));
    }

    // rows without a status are footnotes
    let rows: Rows = grid
        .into_iter()
        .skip(header_idx + 1)
        .filter(|row| row.get(STATUS).is_some_and(|c| !c.is_empty()))
        .map(|mut row| {
            row.truncate(SOLAR_COLUMNS.len());
            row
        })
        .collect();
    Ok((SOLAR_COLUMNS.iter().map(ToString::to_string).collect(), rows))
}

fn is_column_row(row: &[Cell]) -> bool {
    let lead: Vec<String> = row
        .iter()
        .take(3)
        .map(|c| collapse(&c.text()).to_ascii_lowercase())
        .collect();
    lead == ["year", "month", "state"]
}
