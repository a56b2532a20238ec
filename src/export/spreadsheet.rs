//! Spreadsheet packing: tabular rows to a single-sheet XLSX byte buffer.
//!
//! An XLSX workbook is a zip archive of XML parts, so the packer writes the
//! four required parts directly through the `zip` crate: content types, the
//! package relationships, the workbook, and one worksheet using inline
//! strings. Pure function of its input: no network, no filesystem, and
//! byte-identical output for identical rows.

use std::io::{Cursor, Write};

use chrono::{DateTime, Local, SecondsFormat};

use crate::config::ExportConfig;
use crate::error::{Error, ExportError, Result};
use crate::types::Cell;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

/// Packs ordered rows of cells into one single-sheet workbook
#[derive(Clone, Debug)]
pub struct SpreadsheetPacker {
    sheet_name: String,
}

impl SpreadsheetPacker {
    /// Create a packer from the export configuration
    pub fn new(config: &ExportConfig) -> Self {
        Self {
            sheet_name: config.sheet_name.clone(),
        }
    }

    /// Serialize rows into XLSX bytes
    ///
    /// The first row is expected to be the header; the packer itself treats
    /// all rows uniformly. Row and column order are preserved exactly.
    pub fn pack(&self, rows: &[Vec<Cell>]) -> Result<Vec<u8>> {
        let worksheet = build_worksheet_xml(rows);
        let workbook = build_workbook_xml(&self.sheet_name);

        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::FileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);

        let parts: [(&str, &str); 5] = [
            ("[Content_Types].xml", CONTENT_TYPES),
            ("_rels/.rels", PACKAGE_RELS),
            ("xl/workbook.xml", &workbook),
            ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS),
            ("xl/worksheets/sheet1.xml", &worksheet),
        ];
        for (name, content) in parts {
            writer
                .start_file(name, options)
                .map_err(|e| sheet_error(name, e))?;
            writer.write_all(content.as_bytes())?;
        }

        let cursor = writer
            .finish()
            .map_err(|e| sheet_error("workbook", e))?;

        tracing::debug!(
            rows = rows.len(),
            bytes = cursor.get_ref().len(),
            "workbook packed"
        );
        Ok(cursor.into_inner())
    }
}

impl Default for SpreadsheetPacker {
    fn default() -> Self {
        Self::new(&ExportConfig::default())
    }
}

/// Suggested filename for an export artifact
///
/// Convention: `<platform>-<kind>-<local datetime>.xlsx` with second
/// precision. Only the filename carries the generation timestamp; the
/// workbook bytes depend on the rows alone.
pub fn export_filename(platform: &str, kind: &str, at: DateTime<Local>) -> String {
    format!("{platform}-{kind}-{}.xlsx", at.format("%Y-%m-%dT%H:%M:%S"))
}

fn sheet_error(part: &str, e: zip::result::ZipError) -> Error {
    Error::Export(ExportError::Sheet {
        reason: format!("failed to write {part}: {e}"),
    })
}

fn build_workbook_xml(sheet_name: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
        escape_xml(sheet_name)
    )
}

fn build_worksheet_xml(rows: &[Vec<Cell>]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    for (row_index, row) in rows.iter().enumerate() {
        let row_number = row_index + 1;
        xml.push_str(&format!(r#"<row r="{row_number}">"#));
        for (col_index, cell) in row.iter().enumerate() {
            let cell_ref = format!("{}{row_number}", column_name(col_index));
            match cell {
                Cell::Text(text) => {
                    xml.push_str(&format!(
                        r#"<c r="{cell_ref}" t="inlineStr"><is><t>{}</t></is></c>"#,
                        escape_xml(text)
                    ));
                }
                Cell::Int(value) => {
                    xml.push_str(&format!(r#"<c r="{cell_ref}"><v>{value}</v></c>"#));
                }
                Cell::Float(value) => {
                    xml.push_str(&format!(r#"<c r="{cell_ref}"><v>{value}</v></c>"#));
                }
                Cell::DateTime(value) => {
                    xml.push_str(&format!(
                        r#"<c r="{cell_ref}" t="inlineStr"><is><t>{}</t></is></c>"#,
                        value.to_rfc3339_opts(SecondsFormat::Secs, true)
                    ));
                }
                Cell::Empty => {}
            }
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

/// Spreadsheet column name for a zero-based index (0 -> A, 26 -> AA)
fn column_name(mut index: usize) -> String {
    let mut name = String::new();
    loop {
        name.insert(0, (b'A' + (index % 26) as u8) as char);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    name
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
