// src/export/mod.rs
//! Serialization of result tables: CSV text, in-memory rows, and files
//! whose format follows the extension.

pub mod parquet;

use flate2::{write::GzEncoder, Compression};
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};
use tracing::info;
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

use crate::{
    error::{Error, Result},
    model::{CanonicalRow, ResultTable, COLUMNS},
    parse::ParsedTable,
    sheet::{write_xlsx, Cell, Rows},
};

/// Sheet name used for workbook output.
const SHEET_NAME: &str = "data";

/// CSV with the canonical header. Missing values are empty fields.
pub fn to_csv(table: &ResultTable) -> Result<String> {
    let mut buf = Vec::new();
    write_csv(table, &mut buf).map_err(|e| Error::output("<memory>", e))?;
    String::from_utf8(buf)
        .map_err(|e| Error::output("<memory>", io::Error::new(io::ErrorKind::InvalidData, e)))
}

pub fn to_rows(table: &ResultTable) -> &[CanonicalRow] {
    table.rows()
}

/// Reads back what [`to_csv`] wrote.
pub fn from_csv(text: &str) -> Result<ResultTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());
    let headers = rdr
        .headers()
        .map_err(|e| Error::malformed("csv", e.to_string()))?;
    if headers.iter().ne(COLUMNS.iter().copied()) {
        return Err(Error::malformed(
            "csv",
            format!("header {:?} does not match {:?}", headers, COLUMNS),
        ));
    }
    let mut rows = Vec::new();
    for record in rdr.deserialize::<CanonicalRow>() {
        rows.push(record.map_err(|e| Error::malformed("csv", e.to_string()))?);
    }
    rows.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
    Ok(ResultTable::from_sorted(rows))
}

fn write_csv<W: Write>(table: &ResultTable, out: W) -> io::Result<()> {
    // the header is written by hand so an empty table still has one
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(out);
    wtr.write_record(COLUMNS)?;
    for row in table.rows() {
        wtr.serialize(row)?;
    }
    wtr.flush()
}

/// File formats chosen by output path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    CsvGz,
    CsvZip,
    Json,
    Parquet,
    Xlsx,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        let format = if name.ends_with(".csv.zip") {
            OutputFormat::CsvZip
        } else if name.ends_with(".csv.gz") {
            OutputFormat::CsvGz
        } else if name.ends_with(".csv") {
            OutputFormat::Csv
        } else if name.ends_with(".json") {
            OutputFormat::Json
        } else if name.ends_with(".parquet") {
            OutputFormat::Parquet
        } else if name.ends_with(".xlsx") {
            OutputFormat::Xlsx
        } else {
            return Err(Error::invalid(format!(
                "output format for '{}' is invalid (use .csv, .csv.gz, .csv.zip, .json, .parquet or .xlsx)",
                path.display()
            )));
        };
        Ok(format)
    }
}

/// Writes `table` to `path` in the format its extension names.
pub fn write(table: &ResultTable, path: &Path) -> Result<()> {
    let format = OutputFormat::from_path(path)?;
    let fail = |e: io::Error| Error::output(path, e);
    let file = File::create(path).map_err(fail)?;
    let mut out = BufWriter::new(file);

    match format {
        OutputFormat::Csv => write_csv(table, &mut out).map_err(fail)?,
        OutputFormat::CsvGz => {
            let mut gz = GzEncoder::new(&mut out, Compression::default());
            write_csv(table, &mut gz).map_err(fail)?;
            gz.finish().map_err(fail)?;
        }
        OutputFormat::CsvZip => {
            let mut body = Vec::new();
            write_csv(table, &mut body).map_err(fail)?;
            write_zipped(path, &body, out).map_err(fail)?;
            info!(path = %path.display(), rows = table.len(), ?format, "wrote table");
            return Ok(());
        }
        OutputFormat::Json => serde_json::to_writer_pretty(&mut out, table.rows())
            .map_err(|e| fail(e.into()))?,
        OutputFormat::Parquet => {
            parquet::write(table, &mut out).map_err(|e| fail(io::Error::other(e)))?
        }
        OutputFormat::Xlsx => {
            let bytes = write_xlsx(&[(SHEET_NAME, table_grid(table).as_slice())])
                .map_err(|e| fail(io::Error::other(e)))?;
            out.write_all(&bytes).map_err(fail)?;
        }
    }
    out.flush().map_err(fail)?;
    info!(path = %path.display(), rows = table.len(), ?format, "wrote table");
    Ok(())
}

/// A zip holding one CSV named after the archive (`out.csv.zip` -> `out.csv`).
fn write_zipped<W: Write + io::Seek>(path: &Path, body: &[u8], out: W) -> io::Result<()> {
    let entry = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .and_then(|n| n.strip_suffix(".zip").map(str::to_string))
        .unwrap_or_else(|| "data.csv".to_string());
    let mut zip = ZipWriter::new(out);
    zip.start_file(
        entry,
        SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
    )?;
    zip.write_all(body)?;
    zip.finish()?.flush()
}

fn table_grid(table: &ResultTable) -> Rows {
    let text = |s: Option<&str>| s.map_or(Cell::Empty, Cell::from);
    let number = |v: Option<f64>| v.map_or(Cell::Empty, Cell::Number);
    let mut grid: Rows = vec![COLUMNS.iter().map(|c| Cell::from(*c)).collect()];
    grid.extend(table.rows().iter().map(|r| {
        vec![
            Cell::from(r.entity_id.as_str()),
            Cell::from(r.period.to_string().as_str()),
            text(r.state.as_ref().map(|s| s.as_str())),
            text(r.sector.as_deref()),
            text(r.technology.as_deref()),
            number(r.capacity_value),
            number(r.production_value),
            Cell::from(r.unit.as_str()),
        ]
    }));
    grid
}

/// Column name prepended to raw output, naming the file a row came from.
pub const RAW_SOURCE_COLUMN: &str = "source_period";

/// Raw (unnormalized) tables stacked into one grid. Columns are the union
/// of every table's headers in first-seen order, preceded by the period of
/// the source file.
pub fn raw_grid(tables: &[ParsedTable]) -> Rows {
    let mut headers: Vec<&str> = Vec::new();
    for table in tables {
        for h in &table.headers {
            if !h.is_empty() && !headers.contains(&h.as_str()) {
                headers.push(h);
            }
        }
    }

    let mut grid: Rows = vec![std::iter::once(RAW_SOURCE_COLUMN)
        .chain(headers.iter().copied())
        .map(Cell::from)
        .collect()];
    for table in tables {
        let index: Vec<Option<usize>> = headers.iter().map(|h| table.column(h)).collect();
        let source = Cell::from(table.location.period.to_string().as_str());
        for row in &table.rows {
            let mut out = Vec::with_capacity(index.len() + 1);
            out.push(source.clone());
            out.extend(
                index
                    .iter()
                    .map(|i| i.map_or(Cell::Empty, |i| table.cell(row, i).clone())),
            );
            grid.push(out);
        }
    }
    grid
}

/// Writes raw tables as plain, gzipped or zipped CSV, or as a workbook.
pub fn write_raw(tables: &[ParsedTable], path: Option<&Path>) -> Result<Option<String>> {
    let grid = raw_grid(tables);
    let csv_text = || -> io::Result<Vec<u8>> {
        let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(Vec::new());
        for row in &grid {
            wtr.write_record(row.iter().map(|c| c.to_string()))?;
        }
        wtr.into_inner().map_err(|e| e.into_error())
    };

    let Some(path) = path else {
        let bytes = csv_text().map_err(|e| Error::output("<stdout>", e))?;
        return Ok(Some(String::from_utf8_lossy(&bytes).into_owned()));
    };
    let fail = |e: io::Error| Error::output(path, e);
    match OutputFormat::from_path(path)? {
        OutputFormat::Csv => std::fs::write(path, csv_text().map_err(fail)?).map_err(fail)?,
        OutputFormat::CsvGz => {
            let body = csv_text().map_err(fail)?;
            let file = File::create(path).map_err(fail)?;
            let mut gz = GzEncoder::new(BufWriter::new(file), Compression::default());
            gz.write_all(&body).map_err(fail)?;
            gz.finish().and_then(|mut out| out.flush()).map_err(fail)?;
        }
        OutputFormat::CsvZip => {
            let body = csv_text().map_err(fail)?;
            let file = File::create(path).map_err(fail)?;
            write_zipped(path, &body, BufWriter::new(file)).map_err(fail)?;
        }
        OutputFormat::Xlsx => {
            let bytes = write_xlsx(&[(SHEET_NAME, grid.as_slice())])
                .map_err(|e| fail(io::Error::other(e)))?;
            std::fs::write(path, bytes).map_err(fail)?;
        }
        other => {
            return Err(Error::invalid(format!(
                "raw output supports .csv, .csv.gz, .csv.zip and .xlsx, not {other:?}"
            )))
        }
    }
    info!(path = %path.display(), rows = grid.len().saturating_sub(1), "wrote raw table");
    Ok(None)
}
