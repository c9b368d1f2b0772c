// src/parse/generators.rs

use super::{collapse, ParseError};
use crate::sheet::Rows;

/// Headers every 860m subset sheet must carry.
pub const REQUIRED_GENERATOR_HEADERS: [&str; 5] = [
    "Plant ID",
    "Generator ID",
    "Plant State",
    "Technology",
    "Nameplate Capacity (MW)",
];

/// Title rows above the header vary by vintage (one before late 2020, two
/// after), so the header is searched for rather than skipped by count.
const HEADER_SEARCH_ROWS: usize = 10;

pub(super) fn parse(grid: Rows) -> Result<(Vec<String>, Rows), ParseError> {
    let header_idx = grid
        .iter()
        .take(HEADER_SEARCH_ROWS)
        .position(|row| row.iter().any(|c| collapse(&c.text()) == "Plant ID"))
        .ok_or_else(|| {
            ParseError::Layout(format!(
                "no header row containing 'Plant ID' in the first {HEADER_SEARCH_ROWS} rows"
            ))
        })?;

    let headers: Vec<String> = grid[header_idx]
        .iter()
        .map(|c| collapse(&c.text()))
        .collect();
    let missing: Vec<&str> = REQUIRED_GENERATOR_HEADERS
        .iter()
        .copied()
        .filter(|h| !headers.iter().any(|have| have == h))
        .collect();
    if !missing.is_empty() {
        return Err(ParseError::Layout(format!(
            "missing expected header(s) {missing:?}"
        )));
    }

    let plant = headers
        .iter()
        .position(|h| h == "Plant ID")
        .unwrap_or_default();
    // footnote rows at the bottom have no plant
    let rows: Rows = grid
        .into_iter()
        .skip(header_idx + 1)
        .filter(|row| row.get(plant).is_some_and(|c| !c.is_empty()))
        .collect();
    Ok((headers, rows))
}
