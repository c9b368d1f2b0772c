// src/sheet/mod.rs
//
// Minimal spreadsheet access: enough of SpreadsheetML to read the EIA
// workbooks (and to write simple ones), plus CSV payloads treated as a
// single sheet.

pub mod write;
pub mod xlsx;

use std::{borrow::Cow, fmt};
use thiserror::Error;

pub use write::write_xlsx;
pub use xlsx::XlsxWorkbook;

/// A decoded cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
}

impl Cell {
    /// Text cells that are only whitespace count as empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Trimmed textual form; integral numbers print without a fraction.
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            Cell::Text(s) => Cow::Borrowed(s.trim()),
            Cell::Empty => Cow::Borrowed(""),
            other => Cow::Owned(other.to_string()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Text(s) => f.write_str(s),
            Cell::Bool(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s.to_string())
        }
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

pub type Rows = Vec<Vec<Cell>>;

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("not a readable workbook: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("workbook part {0} is missing")]
    MissingPart(String),

    #[error("cell reference {0:?} is outside the worksheet grid")]
    CellReference(String),

    #[error("sheet {name:?} not found (available: {available:?})")]
    MissingSheet {
        name: String,
        available: Vec<String>,
    },
}

impl SheetError {
    /// True when the bytes are not a workbook at all, as opposed to a
    /// readable workbook lacking an expected sheet or addressing cells
    /// outside the grid.
    pub fn is_corrupt(&self) -> bool {
        !matches!(
            self,
            SheetError::MissingSheet { .. } | SheetError::CellReference(_)
        )
    }
}

/// Payload kinds a workbook can be opened from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Xlsx,
    Csv,
}

impl ContentType {
    /// Guess from a file name or URL path.
    pub fn from_path(path: &str) -> Self {
        if path.to_ascii_lowercase().ends_with(".csv") {
            ContentType::Csv
        } else {
            ContentType::Xlsx
        }
    }
}

/// A source of sheets.
pub enum Workbook<'a> {
    Xlsx(XlsxWorkbook<'a>),
    /// A CSV payload is a workbook with one anonymous sheet.
    Csv(Rows),
}

impl<'a> Workbook<'a> {
    pub fn open(bytes: &'a [u8], content_type: ContentType) -> Result<Self, SheetError> {
        match content_type {
            ContentType::Xlsx => Ok(Workbook::Xlsx(XlsxWorkbook::open(bytes)?)),
            ContentType::Csv => Ok(Workbook::Csv(read_csv(bytes)?)),
        }
    }

    /// Rows of the named sheet. CSV workbooks answer any name.
    pub fn sheet(&mut self, name: &str) -> Result<Rows, SheetError> {
        match self {
            Workbook::Xlsx(book) => book.read_sheet(name),
            Workbook::Csv(rows) => Ok(rows.clone()),
        }
    }
}

fn read_csv(bytes: &[u8]) -> Result<Rows, SheetError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    let mut rows = Vec::new();
    for record in rdr.records() {
        rows.push(record?.iter().map(Cell::from).collect());
    }
    Ok(rows)
}
