// src/sheet/xlsx.rs

use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};
use std::{
    collections::HashMap,
    io::{Cursor, Read},
};
use tracing::{debug, trace};
use zip::{result::ZipError, ZipArchive};

use super::{Cell, Rows, SheetError};

/// Read-only view over an in-memory `.xlsx` package.
#[derive(Debug)]
pub struct XlsxWorkbook<'a> {
    archive: ZipArchive<Cursor<&'a [u8]>>,
    /// (sheet name, part path) in workbook order.
    sheets: Vec<(String, String)>,
    shared: Vec<String>,
}

impl<'a> XlsxWorkbook<'a> {
    pub fn open(bytes: &'a [u8]) -> Result<Self, SheetError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;

        let workbook = require_part(&mut archive, "xl/workbook.xml")?;
        let rels = require_part(&mut archive, "xl/_rels/workbook.xml.rels")?;
        let targets = parse_relationships(&rels)?;
        let sheets: Vec<(String, String)> = parse_sheet_list(&workbook)?
            .into_iter()
            .filter_map(|(name, rid)| targets.get(&rid).map(|t| (name, part_path(t))))
            .collect();

        let shared = match read_part(&mut archive, "xl/sharedStrings.xml")? {
            Some(xml) => parse_shared_strings(&xml)?,
            None => Vec::new(),
        };
        debug!(
            sheets = sheets.len(),
            shared_strings = shared.len(),
            "opened workbook"
        );

        Ok(XlsxWorkbook {
            archive,
            sheets,
            shared,
        })
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Rows of the sheet called `name` (compared case-insensitively).
    /// Row and column gaps are filled with `Cell::Empty`.
    pub fn read_sheet(&mut self, name: &str) -> Result<Rows, SheetError> {
        let part = self
            .sheets
            .iter()
            .find(|(n, _)| n.trim().eq_ignore_ascii_case(name.trim()))
            .map(|(_, p)| p.clone())
            .ok_or_else(|| SheetError::MissingSheet {
                name: name.to_string(),
                available: self.sheets.iter().map(|(n, _)| n.clone()).collect(),
            })?;
        let xml = require_part(&mut self.archive, &part)?;
        let rows = parse_sheet(&xml, &self.shared)?;
        trace!(sheet = name, rows = rows.len(), "read sheet");
        Ok(rows)
    }
}

fn read_part(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &str,
) -> Result<Option<String>, SheetError> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut xml = String::new();
    entry.read_to_string(&mut xml)?;
    Ok(Some(xml))
}

fn require_part(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> Result<String, SheetError> {
    read_part(archive, name)?.ok_or_else(|| SheetError::MissingPart(name.to_string()))
}

/// Relationship targets are relative to `xl/` unless absolute.
fn part_path(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(abs) => abs.to_string(),
        None => format!("xl/{target}"),
    }
}

fn attribute(event: &BytesStart, key: &str) -> Result<Option<String>, SheetError> {
    for attr in event.attributes().with_checks(false) {
        let attr = attr?;
        if attr.key.local_name().as_ref() == key.as_bytes() {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// `Id -> Target` from a relationships part.
fn parse_relationships(xml: &str) -> Result<HashMap<String, String>, SheetError> {
    let mut reader = Reader::from_str(xml);
    let mut out = HashMap::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attribute(&e, "Id")?, attribute(&e, "Target")?) {
                    out.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(out)
}

/// `(name, relationship id)` for every sheet in `xl/workbook.xml`.
fn parse_sheet_list(xml: &str) -> Result<Vec<(String, String)>, SheetError> {
    let mut reader = Reader::from_str(xml);
    let mut out = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                if let (Some(name), Some(rid)) = (attribute(&e, "name")?, attribute(&e, "id")?) {
                    out.push((name, rid));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(out)
}

fn parse_shared_strings(xml: &str) -> Result<Vec<String>, SheetError> {
    let mut reader = Reader::from_str(xml);
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    // phonetic runs (<rPh>) repeat the text as a reading aid
    let mut phonetic = 0usize;
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current.clear(),
                b"t" => in_text = phonetic == 0,
                b"rPh" => phonetic += 1,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => out.push(String::new()),
            Event::Text(t) if in_text => current.push_str(&t.unescape()?),
            Event::CData(c) if in_text => current.push_str(&String::from_utf8_lossy(&c.into_inner())),
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => out.push(std::mem::take(&mut current)),
                b"t" => in_text = false,
                b"rPh" => phonetic = phonetic.saturating_sub(1),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(out)
}

struct PendingCell {
    col: usize,
    kind: Option<String>,
    text: String,
}

impl PendingCell {
    fn start(e: &BytesStart, next_col: usize) -> Result<Self, SheetError> {
        let col = match attribute(e, "r")? {
            Some(r) => column_index(&r).ok_or(SheetError::CellReference(r))?,
            None => next_col,
        };
        Ok(PendingCell {
            col,
            kind: attribute(e, "t")?,
            text: String::new(),
        })
    }

    fn finish(self, shared: &[String]) -> Result<Cell, SheetError> {
        Ok(match self.kind.as_deref() {
            Some("s") => {
                let idx = self.text.trim().parse::<usize>().ok();
                let s = idx.and_then(|i| shared.get(i)).ok_or_else(|| {
                    SheetError::MissingPart(format!("shared string {:?}", self.text))
                })?;
                Cell::from(s.as_str())
            }
            Some("b") => Cell::Bool(self.text.trim() == "1"),
            Some("str") | Some("inlineStr") | Some("e") | Some("d") => Cell::from(self.text.as_str()),
            _ => match self.text.trim().parse::<f64>() {
                Ok(n) => Cell::Number(n),
                Err(_) => Cell::from(self.text.as_str()),
            },
        })
    }
}

/// Last column and row a worksheet can address (`XFD1048576`).
const MAX_COLUMN: usize = 16_383;
const MAX_ROW: usize = 1_048_576;

/// Zero-based column of a cell reference such as `AB12`; `None` past `XFD`.
fn column_index(reference: &str) -> Option<usize> {
    let letters = reference
        .bytes()
        .take_while(u8::is_ascii_alphabetic);
    let mut n = 0usize;
    for b in letters {
        let digit = (b.to_ascii_uppercase() - b'A' + 1) as usize;
        n = n.checked_mul(26)?.checked_add(digit)?;
    }
    n.checked_sub(1).filter(|&col| col <= MAX_COLUMN)
}

/// Pushes empty rows until the next row lands at its `r` (1-based) index.
fn pad_rows(rows: &mut Rows, e: &BytesStart) -> Result<(), SheetError> {
    if let Some(r) = attribute(e, "r")? {
        let index = r
            .parse::<usize>()
            .ok()
            .filter(|&i| i <= MAX_ROW)
            .ok_or(SheetError::CellReference(r))?;
        while rows.len() + 1 < index {
            rows.push(Vec::new());
        }
    }
    Ok(())
}

fn place(row: &mut Vec<Cell>, col: usize, cell: Cell) {
    if row.len() <= col {
        row.resize(col + 1, Cell::Empty);
    }
    row[col] = cell;
}

fn parse_sheet(xml: &str, shared: &[String]) -> Result<Rows, SheetError> {
    let mut reader = Reader::from_str(xml);
    let mut rows: Rows = Vec::new();
    let mut row: Vec<Cell> = Vec::new();
    let mut cell: Option<PendingCell> = None;
    let mut in_value = false;
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => {
                    pad_rows(&mut rows, &e)?;
                    row = Vec::new();
                }
                b"c" => cell = Some(PendingCell::start(&e, row.len())?),
                b"v" | b"t" => in_value = cell.is_some(),
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"row" => {
                pad_rows(&mut rows, &e)?;
                rows.push(Vec::new());
            }
            Event::Text(t) if in_value => {
                if let Some(pending) = cell.as_mut() {
                    pending.text.push_str(&t.unescape()?);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    if let Some(pending) = cell.take() {
                        let col = pending.col;
                        place(&mut row, col, pending.finish(shared)?);
                    }
                }
                b"row" => rows.push(std::mem::take(&mut row)),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::write_xlsx;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn package(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            for (name, body) in parts {
                zip.start_file(*name, SimpleFileOptions::default()).unwrap();
                zip.write_all(body.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        buf
    }

    const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"
          xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets>
    <sheet name="Monthly Totals- States" sheetId="1" r:id="rId7"/>
  </sheets>
</workbook>"#;

    const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId7" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="/xl/worksheets/data.xml"/>
</Relationships>"#;

    const SHARED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="3" uniqueCount="3">
  <si><t>State</t></si>
  <si><r><t>Capacity </t></r><r><t>(MW)</t></r><rPh><t>ignored</t></rPh></si>
  <si><t>AT&amp;T</t></si>
</sst>"#;

    const SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <sheetData>
    <row r="1"><c r="A1" t="s"><v>0</v></c><c r="C1" t="s"><v>1</v></c></row>
    <row r="3">
      <c r="A3" t="inlineStr"><is><t>CA</t></is></c>
      <c r="B3"><v>1234.5</v></c>
      <c r="C3" t="b"><v>1</v></c>
      <c r="D3" t="s"><v>2</v></c>
      <c r="E3"><f>SUM(B3)</f><v>1234.5</v></c>
    </row>
  </sheetData>
</worksheet>"#;

    #[test]
    fn reads_shared_inline_and_numeric_cells() {
        let bytes = package(&[
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", RELS),
            ("xl/sharedStrings.xml", SHARED),
            ("xl/worksheets/data.xml", SHEET),
        ]);
        let mut book = XlsxWorkbook::open(&bytes).unwrap();
        assert_eq!(book.sheet_names(), ["Monthly Totals- States"]);

        let rows = book.read_sheet("monthly totals- states").unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[0],
            vec![
                Cell::Text("State".into()),
                Cell::Empty,
                Cell::Text("Capacity (MW)".into())
            ]
        );
        assert!(rows[1].is_empty());
        assert_eq!(
            rows[2],
            vec![
                Cell::Text("CA".into()),
                Cell::Number(1234.5),
                Cell::Bool(true),
                Cell::Text("AT&T".into()),
                Cell::Number(1234.5),
            ]
        );
    }

    #[test]
    fn missing_sheet_lists_available() {
        let bytes = package(&[
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", RELS),
            ("xl/worksheets/data.xml", SHEET),
        ]);
        let mut book = XlsxWorkbook::open(&bytes).unwrap();
        let err = book.read_sheet("Operating").unwrap_err();
        assert!(!err.is_corrupt());
        match err {
            SheetError::MissingSheet { available, .. } => {
                assert_eq!(available, ["Monthly Totals- States"])
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn garbage_is_corrupt() {
        let err = XlsxWorkbook::open(b"<html>not found</html>").unwrap_err();
        assert!(err.is_corrupt());
    }

    #[test]
    fn reads_what_the_writer_wrote() {
        let rows = vec![
            vec![Cell::from("Plant ID"), Cell::from("Generator ID")],
            vec![Cell::Number(56812.0), Cell::from(" GEN 1")],
            vec![Cell::Empty, Cell::Bool(false)],
        ];
        let bytes = write_xlsx(&[("Operating", rows.as_slice())]).unwrap();
        let mut book = XlsxWorkbook::open(&bytes).unwrap();
        assert_eq!(book.read_sheet("Operating").unwrap(), rows);
    }

    #[test]
    fn column_letters() {
        assert_eq!(column_index("A1"), Some(0));
        assert_eq!(column_index("Z9"), Some(25));
        assert_eq!(column_index("AA10"), Some(26));
        assert_eq!(column_index("AB12"), Some(27));
        assert_eq!(column_index("12"), None);
        assert_eq!(column_index("XFD1"), Some(16_383));
        assert_eq!(column_index("XFE1"), None);
        assert_eq!(column_index("ZZZZZZZZZZZZZZZ1"), None);
    }

    fn sheet_with(rows: &str) -> Vec<u8> {
        let sheet = format!(
            r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{rows}</sheetData></worksheet>"#
        );
        package(&[
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", RELS),
            ("xl/worksheets/data.xml", &sheet),
        ])
    }

    #[test]
    fn out_of_grid_references_are_errors_not_corruption() {
        for rows in [
            r#"<row r="1"><c r="ZZZZZZZZZZZZZZZ1"><v>1</v></c></row>"#,
            r#"<row r="1"><c r="7"><v>1</v></c></row>"#,
            r#"<row r="99999999999999999999"><c><v>1</v></c></row>"#,
        ] {
            let bytes = sheet_with(rows);
            let mut book = XlsxWorkbook::open(&bytes).unwrap();
            let err = book.read_sheet("Monthly Totals- States").unwrap_err();
            assert!(matches!(err, SheetError::CellReference(_)), "{rows}: {err}");
            assert!(!err.is_corrupt());
        }
    }

    #[test]
    fn cells_without_references_follow_each_other() {
        let bytes = sheet_with(r#"<row><c><v>1</v></c><c r="C1"><v>3</v></c><c><v>4</v></c></row>"#);
        let mut book = XlsxWorkbook::open(&bytes).unwrap();
        let rows = book.read_sheet("Monthly Totals- States").unwrap();
        assert_eq!(
            rows,
            vec![vec![Cell::Number(1.0), Cell::Empty, Cell::Number(3.0), Cell::Number(4.0)]]
        );
    }
}
