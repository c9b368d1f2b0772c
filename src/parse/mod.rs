// src/parse/mod.rs
//! Strips the published layouts (title rows, multi-row headers, footnotes)
//! down to flat rows with named fields. One variant per layout.

mod generators;
mod solar;

use thiserror::Error;
use tracing::{debug, instrument};

use crate::{
    error::Error,
    fetch::{Location, RawRecord},
    model::{FormKind, Subset},
    sheet::{Cell, Rows, SheetError, Workbook},
};

pub use generators::REQUIRED_GENERATOR_HEADERS;
pub use solar::{SOLAR_COLUMNS, SOLAR_SHEET};

/// Rows of one source file with the header row resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTable {
    pub form: FormKind,
    pub location: Location,
    pub headers: Vec<String>,
    pub rows: Rows,
}

impl ParsedTable {
    /// Index of the column called `name`.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// The cell of `row` under `column`; short rows read as empty.
    pub fn cell<'a>(&self, row: &'a [Cell], column: usize) -> &'a Cell {
        row.get(column).unwrap_or(&EMPTY)
    }
}

static EMPTY: Cell = Cell::Empty;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error(transparent)]
    Sheet(#[from] SheetError),

    #[error("{0}")]
    Layout(String),
}

impl ParseError {
    /// The payload is not a workbook at all (truncated download, HTML error
    /// page), as opposed to a workbook with an unexpected layout.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, ParseError::Sheet(e) if e.is_corrupt())
    }

    pub fn into_error(self, location: &Location) -> Error {
        Error::malformed(location, self.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormParser {
    /// 860m generator inventory, one sheet per subset.
    Generators { subset: Subset },
    /// Small-scale solar workbook shared by 861 and 861m.
    SmallScaleSolar,
}

impl FormParser {
    pub fn for_form(form: FormKind, subset: Subset) -> Self {
        match form {
            FormKind::F860m => FormParser::Generators { subset },
            FormKind::F861 | FormKind::F861m => FormParser::SmallScaleSolar,
        }
    }

    pub fn sheet_name(&self) -> &'static str {
        match self {
            FormParser::Generators { subset } => subset.sheet_name(),
            FormParser::SmallScaleSolar => SOLAR_SHEET,
        }
    }

    #[instrument(level = "debug", skip(self, raw), fields(url = %raw.location().url, sheet = self.sheet_name()))]
    pub fn parse(&self, raw: &RawRecord) -> Result<ParsedTable, ParseError> {
        let mut book = Workbook::open(raw.bytes(), raw.content_type())?;
        let grid = book.sheet(self.sheet_name())?;
        let (headers, rows) = match self {
            FormParser::Generators { .. } => generators::parse(grid)?,
            FormParser::SmallScaleSolar => solar::parse(grid)?,
        };
        debug!(columns = headers.len(), rows = rows.len(), "parsed sheet");
        Ok(ParsedTable {
            form: raw.location().form,
            location: raw.location().clone(),
            headers,
            rows,
        })
    }
}

/// Header text with runs of whitespace (including line breaks inside merged
/// header cells) collapsed to single spaces.
pub(crate) fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
