// src/normalize/mod.rs
//! Maps each form's parsed columns onto [`CanonicalRow`]s.

pub mod coerce;
mod generators;
mod solar;

use tracing::{debug, instrument};

use crate::{
    error::{Error, Result},
    model::{CanonicalRow, FormKind},
    parse::ParsedTable,
};

pub use solar::TOTAL_SECTOR;

/// Capacity unit of every form currently read. Production is MWh.
pub const CAPACITY_UNIT: &str = "MW";

/// Canonical rows of one parsed source file.
///
/// - 860m: one row per generator, period = the file's month.
/// - 861m: one row per (state, sector, month).
/// - 861: the monthly rows rolled up per (state, sector, year).
#[instrument(level = "debug", skip(table), fields(url = %table.location.url, form = %table.form))]
pub fn normalize(table: &ParsedTable) -> Result<Vec<CanonicalRow>> {
    let rows = match table.form {
        FormKind::F860m => generators::normalize(table)?,
        FormKind::F861m => solar::monthly(table)?,
        FormKind::F861 => solar::annual(table)?,
    };
    debug!(parsed = table.rows.len(), canonical = rows.len(), "normalized");
    Ok(rows)
}

/// Index of a column the parser guaranteed, reported as a layout problem
/// if it is somehow absent.
fn required_column(table: &ParsedTable, name: &str) -> Result<usize> {
    table
        .column(name)
        .ok_or_else(|| Error::malformed(&table.location, format!("missing column '{name}'")))
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::{
        fetch::Location,
        model::{FormKind, Period},
        parse::ParsedTable,
        sheet::Cell,
    };
    use url::Url;

    pub(crate) fn table(form: FormKind, period: Period, headers: &[&str], rows: Vec<Vec<Cell>>) -> ParsedTable {
        ParsedTable {
            form,
            location: Location {
                form,
                period,
                url: Url::parse("https://example.test/book.xlsx").unwrap(),
            },
            headers: headers.iter().map(ToString::to_string).collect(),
            rows,
        }
    }
}
