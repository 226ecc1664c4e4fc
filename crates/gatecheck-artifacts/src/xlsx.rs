// SPDX-FileCopyrightText: 2026 Gatecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Minimal xlsx codec for the string tables the pipeline moves around.
//!
//! An xlsx file is an Office Open XML zip container. The upstream's
//! listings and our enriched derivatives are plain string tables (header
//! row + data rows), so the codec reads shared and inline strings and
//! writes inline strings only. Styles, formulas, and numeric types are
//! out of scope.

use std::io::{Cursor, Read, Write};

use gatecheck_core::GatecheckError;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// An in-memory spreadsheet: one header row plus string cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Creates an empty table with the given header.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Index of a column by header name (trimmed, case-insensitive).
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.trim().eq_ignore_ascii_case(name.trim()))
    }

    /// Cell value by row index and column name. Missing cells read as `""`.
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.column_index(column)?;
        self.rows.get(row).map(|r| {
            r.get(col).map(|s| s.as_str()).unwrap_or("")
        })
    }

    /// Overwrite a cell. Returns false when the row or column is unknown.
    pub fn set_cell(&mut self, row: usize, column: &str, value: &str) -> bool {
        let Some(col) = self.column_index(column) else {
            return false;
        };
        let Some(r) = self.rows.get_mut(row) else {
            return false;
        };
        if r.len() <= col {
            r.resize(col + 1, String::new());
        }
        r[col] = value.to_string();
        true
    }

    /// Append a column, filling every existing row with `fill`.
    pub fn add_column(&mut self, name: &str, fill: &str) {
        self.columns.push(name.to_string());
        let width = self.columns.len();
        for row in &mut self.rows {
            row.resize(width, String::new());
            row[width - 1] = fill.to_string();
        }
    }
}

/// Encodes a zero-based column index as a cell-reference letter run
/// (0 -> "A", 25 -> "Z", 26 -> "AA").
fn column_ref(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.reverse();
    String::from_utf8(letters).expect("ASCII letters")
}

/// Decodes the column part of a cell reference ("B7" -> 1).
fn column_index_of_ref(cell_ref: &str) -> Option<usize> {
    let letters: String = cell_ref.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    if letters.is_empty() {
        return None;
    }
    let mut index = 0usize;
    for c in letters.chars() {
        index = index * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1);
    }
    Some(index - 1)
}

/// Serializes a table to xlsx bytes.
pub fn write_xlsx(table: &Table) -> Result<Vec<u8>, GatecheckError> {
    let mut sheet = String::with_capacity(4096);
    sheet.push_str(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\">\
         <sheetData>",
    );
    for (row_idx, row) in std::iter::once(&table.columns).chain(table.rows.iter()).enumerate() {
        sheet.push_str(&format!("<row r=\"{}\">", row_idx + 1));
        for (col_idx, value) in row.iter().enumerate() {
            let cell_ref = format!("{}{}", column_ref(col_idx), row_idx + 1);
            sheet.push_str(&format!(
                "<c r=\"{cell_ref}\" t=\"inlineStr\"><is><t xml:space=\"preserve\">{}</t></is></c>",
                escape(value.as_str())
            ));
        }
        sheet.push_str("</row>");
    }
    sheet.push_str("</sheetData></worksheet>");

    let content_types = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
        <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
        <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
        <Default Extension=\"xml\" ContentType=\"application/xml\"/>\
        <Override PartName=\"/xl/workbook.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml\"/>\
        <Override PartName=\"/xl/worksheets/sheet1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>\
        </Types>";
    let root_rels = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
        <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
        <Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"xl/workbook.xml\"/>\
        </Relationships>";
    let workbook = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
        <workbook xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" \
        xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">\
        <sheets><sheet name=\"Sheet1\" sheetId=\"1\" r:id=\"rId1\"/></sheets></workbook>";
    let workbook_rels = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
        <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
        <Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" Target=\"worksheets/sheet1.xml\"/>\
        </Relationships>";

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    let parts: [(&str, &str); 5] = [
        ("[Content_Types].xml", content_types),
        ("_rels/.rels", root_rels),
        ("xl/workbook.xml", workbook),
        ("xl/_rels/workbook.xml.rels", workbook_rels),
        ("xl/worksheets/sheet1.xml", &sheet),
    ];
    for (name, body) in parts {
        writer
            .start_file(name, options)
            .map_err(|e| codec_err("failed to start xlsx entry", e))?;
        writer
            .write_all(body.as_bytes())
            .map_err(|e| codec_err("failed to write xlsx entry", e))?;
    }
    let cursor = writer
        .finish()
        .map_err(|e| codec_err("failed to finalize xlsx", e))?;
    Ok(cursor.into_inner())
}

/// Parses xlsx bytes into a table. The first row becomes the header; all
/// data rows are padded to the header width.
pub fn read_xlsx(bytes: &[u8]) -> Result<Table, GatecheckError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| codec_err("failed to open xlsx container", e))?;

    let shared = match read_entry(&mut archive, "xl/sharedStrings.xml") {
        Some(xml) => parse_shared_strings(&xml)?,
        None => Vec::new(),
    };

    let sheet_name = first_sheet_name(&mut archive)
        .ok_or_else(|| GatecheckError::artifact("xlsx has no worksheet"))?;
    let sheet_xml = read_entry(&mut archive, &sheet_name)
        .ok_or_else(|| GatecheckError::artifact("xlsx worksheet entry unreadable"))?;

    parse_sheet(&sheet_xml, &shared)
}

fn codec_err(message: &str, e: impl std::error::Error + Send + Sync + 'static) -> GatecheckError {
    GatecheckError::Artifact {
        message: message.to_string(),
        source: Some(Box::new(e)),
    }
}

fn read_entry(archive: &mut zip::ZipArchive<Cursor<&[u8]>>, name: &str) -> Option<String> {
    let mut entry = archive.by_name(name).ok()?;
    let mut xml = String::new();
    entry.read_to_string(&mut xml).ok()?;
    Some(xml)
}

fn first_sheet_name(archive: &mut zip::ZipArchive<Cursor<&[u8]>>) -> Option<String> {
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("xl/worksheets/") && n.ends_with(".xml"))
        .map(|n| n.to_string())
        .collect();
    names.sort();
    names.into_iter().next()
}

fn parse_shared_strings(xml: &str) -> Result<Vec<String>, GatecheckError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_item = false;
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"si" => {
                    in_item = true;
                    current.clear();
                }
                b"t" if in_item => in_text = true,
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"si" => {
                    in_item = false;
                    strings.push(std::mem::take(&mut current));
                }
                b"t" => in_text = false,
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_text {
                    current.push_str(&e.unescape().unwrap_or_default());
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(codec_err("shared strings parse error", e)),
            _ => {}
        }
    }
    Ok(strings)
}

fn parse_sheet(xml: &str, shared: &[String]) -> Result<Table, GatecheckError> {
    #[derive(Default)]
    struct CellState {
        column: Option<usize>,
        cell_type: String,
        value: String,
        in_value: bool,
        in_inline_text: bool,
    }

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut all_rows: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<(usize, String)> = Vec::new();
    let mut next_column = 0usize;
    let mut cell = CellState::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"row" => {
                    row.clear();
                    next_column = 0;
                }
                b"c" => {
                    cell = CellState::default();
                    for attr in e.attributes().flatten() {
                        let value = attr.unescape_value().unwrap_or_default().to_string();
                        match attr.key.local_name().as_ref() {
                            b"r" => cell.column = column_index_of_ref(&value),
                            b"t" => cell.cell_type = value,
                            _ => {}
                        }
                    }
                }
                b"v" => cell.in_value = true,
                b"t" => cell.in_inline_text = true,
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"row" => {
                    let width = row.iter().map(|(c, _)| c + 1).max().unwrap_or(0);
                    let mut dense = vec![String::new(); width];
                    for (col, value) in row.drain(..) {
                        dense[col] = value;
                    }
                    all_rows.push(dense);
                }
                b"c" => {
                    let column = cell.column.unwrap_or(next_column);
                    next_column = column + 1;
                    let resolved = if cell.cell_type == "s" {
                        cell.value
                            .trim()
                            .parse::<usize>()
                            .ok()
                            .and_then(|i| shared.get(i))
                            .cloned()
                            .unwrap_or_default()
                    } else {
                        std::mem::take(&mut cell.value)
                    };
                    row.push((column, resolved));
                    cell = CellState::default();
                }
                b"v" => cell.in_value = false,
                b"t" => cell.in_inline_text = false,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                // Styled-but-valueless cells are written self-closed.
                b"c" => {
                    let mut column = None;
                    for attr in e.attributes().flatten() {
                        if attr.key.local_name().as_ref() == b"r" {
                            let value = attr.unescape_value().unwrap_or_default();
                            column = column_index_of_ref(&value);
                        }
                    }
                    let column = column.unwrap_or(next_column);
                    next_column = column + 1;
                    row.push((column, String::new()));
                }
                b"row" => all_rows.push(Vec::new()),
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if cell.in_value || cell.in_inline_text {
                    cell.value.push_str(&e.unescape().unwrap_or_default());
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(codec_err("worksheet parse error", e)),
            _ => {}
        }
    }

    let mut rows_iter = all_rows.into_iter();
    let columns = rows_iter.next().unwrap_or_default();
    let width = columns.len();
    let rows = rows_iter
        .map(|mut r| {
            if r.len() < width {
                r.resize(width, String::new());
            }
            r
        })
        .collect();
    Ok(Table { columns, rows })
}
