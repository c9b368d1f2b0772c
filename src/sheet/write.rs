// src/sheet/write.rs
//
// Writes plain workbooks: inline strings, numbers and booleans, no styles.

use quick_xml::escape::escape;
use std::{
    fmt::Write as _,
    io::{Cursor, Write},
};
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

use super::{Cell, SheetError};

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// Serializes `(sheet name, rows)` pairs into `.xlsx` bytes.
pub fn write_xlsx(sheets: &[(&str, &[Vec<Cell>])]) -> Result<Vec<u8>, SheetError> {
    let opts = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    let parts = [
        ("[Content_Types].xml", content_types(sheets.len())),
        ("_rels/.rels", root_rels()),
        ("xl/workbook.xml", workbook(sheets)),
        ("xl/_rels/workbook.xml.rels", workbook_rels(sheets.len())),
    ];
    for (name, body) in parts {
        zip.start_file(name, opts)?;
        zip.write_all(body.as_bytes())?;
    }
    for (i, (_, rows)) in sheets.iter().enumerate() {
        zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), opts)?;
        zip.write_all(worksheet(rows).as_bytes())?;
    }

    Ok(zip.finish()?.into_inner())
}

fn content_types(sheets: usize) -> String {
    let mut xml = format!(
        r#"{XML_DECL}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#
    );
    for i in 1..=sheets {
        let _ = write!(
            xml,
            r#"<Override PartName="/xl/worksheets/sheet{i}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
        );
    }
    xml.push_str("</Types>");
    xml
}

fn root_rels() -> String {
    format!(
        r#"{XML_DECL}<Relationships xmlns="{PKG_REL_NS}"><Relationship Id="rId1" Type="{REL_NS}/officeDocument" Target="xl/workbook.xml"/></Relationships>"#
    )
}

fn workbook(sheets: &[(&str, &[Vec<Cell>])]) -> String {
    let mut xml = format!(r#"{XML_DECL}<workbook xmlns="{MAIN_NS}" xmlns:r="{REL_NS}"><sheets>"#);
    for (i, (name, _)) in sheets.iter().enumerate() {
        let n = i + 1;
        let _ = write!(
            xml,
            r#"<sheet name="{}" sheetId="{n}" r:id="rId{n}"/>"#,
            escape(*name)
        );
    }
    xml.push_str("</sheets></workbook>");
    xml
}

fn workbook_rels(sheets: usize) -> String {
    let mut xml = format!(r#"{XML_DECL}<Relationships xmlns="{PKG_REL_NS}">"#);
    for n in 1..=sheets {
        let _ = write!(
            xml,
            r#"<Relationship Id="rId{n}" Type="{REL_NS}/worksheet" Target="worksheets/sheet{n}.xml"/>"#
        );
    }
    xml.push_str("</Relationships>");
    xml
}

fn worksheet(rows: &[Vec<Cell>]) -> String {
    let mut xml = format!(r#"{XML_DECL}<worksheet xmlns="{MAIN_NS}"><sheetData>"#);
    for (r, row) in rows.iter().enumerate() {
        let r = r + 1;
        let _ = write!(xml, r#"<row r="{r}">"#);
        for (c, cell) in row.iter().enumerate() {
            let reference = format!("{}{r}", column_name(c));
            let _ = match cell {
                Cell::Empty => Ok(()),
                Cell::Number(n) => write!(xml, r#"<c r="{reference}"><v>{n}</v></c>"#),
                Cell::Bool(b) => write!(xml, r#"<c r="{reference}" t="b"><v>{}</v></c>"#, u8::from(*b)),
                Cell::Text(s) => {
                    let space = if s.trim() != s { r#" xml:space="preserve""# } else { "" };
                    write!(
                        xml,
                        r#"<c r="{reference}" t="inlineStr"><is><t{space}>{}</t></is></c>"#,
                        escape(s.as_str())
                    )
                }
            };
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

/// Spreadsheet column letters for a zero-based index.
fn column_name(mut idx: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (idx % 26) as u8);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }
    letters.iter().rev().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::XlsxWorkbook;

    #[test]
    fn column_names() {
        assert_eq!(column_name(0), "A");
        assert_eq!(column_name(25), "Z");
        assert_eq!(column_name(26), "AA");
        assert_eq!(column_name(27), "AB");
        assert_eq!(column_name(701), "ZZ");
        assert_eq!(column_name(702), "AAA");
    }

    #[test]
    fn escapes_text_and_keeps_sheet_order() {
        let first = vec![vec![Cell::from("R&D <solar>")]];
        let second = vec![vec![Cell::Number(-0.25)]];
        let bytes = write_xlsx(&[("A & B", first.as_slice()), ("Second", second.as_slice())]).unwrap();

        let mut book = XlsxWorkbook::open(&bytes).unwrap();
        assert_eq!(book.sheet_names(), ["A & B", "Second"]);
        assert_eq!(book.read_sheet("A & B").unwrap(), first);
        assert_eq!(book.read_sheet("second").unwrap(), second);
    }
}
