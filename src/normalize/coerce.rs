// src/normalize/coerce.rs
//
// Cell -> typed value conversions shared by every form.

use crate::{
    error::{Error, Result},
    model::{state::NATIONAL, StateCode},
    sheet::Cell,
};

/// Markers EIA prints in place of a value (not meaningful, withheld, ...).
pub const PLACEHOLDERS: [&str; 6] = ["NM", ".", "*", "W", "-", "--"];

fn is_placeholder(text: &str) -> bool {
    PLACEHOLDERS.iter().any(|p| p.eq_ignore_ascii_case(text))
}

/// Non-negative quantity. Blanks and placeholders are missing (`None`),
/// never zero.
pub fn quantity(field: &str, cell: &Cell) -> Result<Option<f64>> {
    let value = match cell {
        Cell::Empty => return Ok(None),
        Cell::Number(n) => *n,
        Cell::Bool(_) => {
            return Err(Error::normalization(field, cell.to_string(), "expected a number"))
        }
        Cell::Text(s) => {
            let text = s.trim();
            if text.is_empty() || is_placeholder(text) {
                return Ok(None);
            }
            text.replace(',', "")
                .parse::<f64>()
                .map_err(|_| Error::normalization(field, text, "not a number"))?
        }
    };
    if !value.is_finite() {
        return Err(Error::normalization(field, cell.to_string(), "not a finite number"));
    }
    if value < 0.0 {
        return Err(Error::normalization(field, cell.to_string(), "negative value"));
    }
    Ok(Some(value))
}

/// Whole number, e.g. a plant id or a calendar field.
pub fn integer(field: &str, cell: &Cell) -> Result<i64> {
    match cell {
        Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Ok(*n as i64),
        Cell::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| Error::normalization(field, s.trim(), "not an integer")),
        Cell::Empty => Err(Error::normalization(field, "", "missing value")),
        other => Err(Error::normalization(field, other.to_string(), "not an integer")),
    }
}

/// USPS code; the national aggregate `US` maps to `None`.
pub fn state(field: &str, cell: &Cell) -> Result<Option<StateCode>> {
    let text = cell.text();
    if text.eq_ignore_ascii_case(NATIONAL) {
        return Ok(None);
    }
    StateCode::parse(&text)
        .map(Some)
        .ok_or_else(|| Error::normalization(field, text.to_string(), "unknown state code"))
}

/// Trimmed text, `None` when blank.
pub fn text(cell: &Cell) -> Option<String> {
    let t = cell.text();
    (!t.is_empty()).then(|| t.into_owned())
}
