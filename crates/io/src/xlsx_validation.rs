//! Candidate labels from an XLSX list data validation
//!
//! Calamine does not expose data validations, so the worksheet XML is read
//! directly: `xl/workbook.xml` gives the sheet's rId, the workbook rels map it
//! to the worksheet part, and that part's `<dataValidation type="list">`
//! elements are scanned for one whose `sqref` covers the status column.
//!
//! ## Supported list sources
//! - Inline: `"Received - Vendor A,Received - Vendor B,Missing"`
//! - Range: `$H$1:$H$4`, `Lists!$A$1:$A$3`, `'My Lists'!$A$1:$A$3`
//! - Named range resolving to one of the above
//!
//! Excel 2010 extension validations (`<x14:dataValidation>` with `<xm:f>` and
//! `<xm:sqref>` children) are read the same way.

use std::collections::HashSet;
use std::io::{Read, Seek};
use std::path::Path;

use eancheck_recon::grid::{collect_raw_column, CellGrid};
use quick_xml::events::Event;
use quick_xml::Reader;
use zip::ZipArchive;

use crate::error::{IoError, Result};
use crate::xlsx::{self, SheetSelector};
use crate::xml::{open_archive, read_zip_file, resolve_entity, xml_error};

/// A list validation as it appears in the worksheet XML.
#[derive(Debug, Clone, PartialEq)]
struct ListValidation {
    sqref: String,
    formula1: String,
}

#[derive(Debug, Clone, PartialEq)]
enum ListSource {
    Inline(Vec<String>),
    Range(CellBlock),
    NamedRange(String),
}

/// Rectangular block of cells, 1-based and inclusive.
#[derive(Debug, Clone, PartialEq)]
struct CellBlock {
    sheet: Option<String>,
    first_row: u32,
    first_col: u32,
    last_row: u32,
    last_col: u32,
}

// ============================================================================
// Public API
// ============================================================================

/// Candidate labels offered by the list validation over `column` of `sheet_name`.
///
/// Returns an empty list when no list validation covers the column.
pub fn list_labels(path: &Path, sheet_name: &str, column: u32) -> Result<Vec<String>> {
    let mut archive = open_archive(path)?;
    let xml_path = find_worksheet_xml_path(&mut archive, sheet_name)?;
    let xml = read_zip_file(&mut archive, &xml_path)?;
    let validations = parse_list_validations(&xml, &xml_path)?;

    let Some(validation) = validations.iter().find(|v| sqref_covers_column(&v.sqref, column)) else {
        tracing::debug!(sheet = sheet_name, column, "no list validation covers the column");
        return Ok(Vec::new());
    };

    let labels = match parse_list_source(&validation.formula1) {
        Some(ListSource::Inline(items)) => items,
        Some(ListSource::Range(block)) => read_block(path, sheet_name, &block)?,
        Some(ListSource::NamedRange(name)) => {
            let formula = xlsx::defined_name(path, &name)?.ok_or_else(|| IoError::Xml {
                part: "xl/workbook.xml".into(),
                message: format!("defined name '{}' not found", name),
            })?;
            match parse_block(&formula) {
                Some(block) => read_block(path, sheet_name, &block)?,
                None => Vec::new(),
            }
        }
        None => Vec::new(),
    };

    Ok(labels
        .iter()
        .map(|s| clean_label(s))
        .filter(|s| !s.is_empty())
        .collect())
}

/// Whether the file is an OOXML workbook whose validations can be read.
pub fn supports(path: &Path) -> bool {
    path.extension()
        .map(|e| matches!(e.to_string_lossy().to_lowercase().as_str(), "xlsx" | "xlsm"))
        .unwrap_or(false)
}

/// Distinct non-empty values already present in the status column, first-seen order.
///
/// Used when the workbook carries no list validation.
pub fn observed_labels<G: CellGrid + ?Sized>(grid: &G, column: u32, start_row: u32) -> Vec<String> {
    let mut seen = HashSet::new();
    collect_raw_column(grid, column, start_row)
        .into_values()
        .map(|v| clean_label(&v))
        .filter(|v| !v.is_empty() && seen.insert(v.clone()))
        .collect()
}

fn clean_label(raw: &str) -> String {
    raw.trim().trim_matches('"').trim().to_string()
}

// ============================================================================
// Workbook structure
// ============================================================================

/// Find the worksheet XML path for a given sheet name.
///
/// This requires parsing:
/// 1. xl/workbook.xml to find the sheet's rId
/// 2. xl/_rels/workbook.xml.rels to map rId to the actual XML path
fn find_worksheet_xml_path<R: Read + Seek>(archive: &mut ZipArchive<R>, sheet_name: &str) -> Result<String> {
    let workbook_xml = read_zip_file(archive, "xl/workbook.xml")?;
    let rid = find_sheet_rid(&workbook_xml, sheet_name)?;

    let rels_xml = read_zip_file(archive, "xl/_rels/workbook.xml.rels")?;
    let target = find_relationship_target(&rels_xml, &rid)?;

    // Targets are relative to xl/ unless absolute
    Ok(match target.strip_prefix('/') {
        Some(abs) => abs.to_string(),
        None => format!("xl/{}", target),
    })
}

/// Find the rId for a sheet name in workbook.xml
fn find_sheet_rid(workbook_xml: &str, sheet_name: &str) -> Result<String> {
    let mut reader = Reader::from_str(workbook_xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"sheet" => {
                let mut name = None;
                let mut rid = None;

                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"name" => name = Some(String::from_utf8_lossy(&attr.value).to_string()),
                        b"r:id" => rid = Some(String::from_utf8_lossy(&attr.value).to_string()),
                        _ => {}
                    }
                }

                if name.as_deref() == Some(sheet_name) {
                    if let Some(r) = rid {
                        return Ok(r);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error("xl/workbook.xml", e)),
            _ => {}
        }
        buf.clear();
    }

    Err(IoError::Xml {
        part: "xl/workbook.xml".into(),
        message: format!("sheet '{}' not found", sheet_name),
    })
}

/// Find the target path for a relationship ID in workbook.xml.rels
fn find_relationship_target(rels_xml: &str, rid: &str) -> Result<String> {
    let mut reader = Reader::from_str(rels_xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"Relationship" => {
                let mut id = None;
                let mut target = None;

                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"Id" => id = Some(String::from_utf8_lossy(&attr.value).to_string()),
                        b"Target" => target = Some(String::from_utf8_lossy(&attr.value).to_string()),
                        _ => {}
                    }
                }

                if id.as_deref() == Some(rid) {
                    if let Some(t) = target {
                        return Ok(t);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error("xl/_rels/workbook.xml.rels", e)),
            _ => {}
        }
        buf.clear();
    }

    Err(IoError::Xml {
        part: "xl/_rels/workbook.xml.rels".into(),
        message: format!("relationship '{}' not found", rid),
    })
}

// ============================================================================
// Worksheet XML
// ============================================================================

#[derive(Clone, Copy)]
enum Capture {
    Formula1,
    Sqref,
}

/// Collect list validations, both plain and x14 extension form.
fn parse_list_validations(xml: &str, part: &str) -> Result<Vec<ListValidation>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut out = Vec::new();
    let mut buf = Vec::new();
    let mut current: Option<(bool, ListValidation)> = None;
    let mut capture: Option<Capture> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"dataValidation" => {
                    let mut is_list = false;
                    let mut sqref = String::new();
                    for attr in e.attributes().flatten() {
                        match attr.key.local_name().as_ref() {
                            b"type" => is_list = attr.value.as_ref() == b"list",
                            b"sqref" => sqref = String::from_utf8_lossy(&attr.value).to_string(),
                            _ => {}
                        }
                    }
                    current = Some((is_list, ListValidation { sqref, formula1: String::new() }));
                }
                b"formula1" if current.is_some() => capture = Some(Capture::Formula1),
                b"sqref" if current.is_some() => capture = Some(Capture::Sqref),
                _ => {}
            },
            Ok(Event::Text(ref t)) => {
                if let (Some(c), Some((_, v))) = (capture, current.as_mut()) {
                    let text = t.decode().map_err(|e| xml_error(part, e))?;
                    push_captured(v, c, &text);
                }
            }
            Ok(Event::GeneralRef(ref r)) => {
                if let (Some(c), Some((_, v))) = (capture, current.as_mut()) {
                    let name = String::from_utf8_lossy(&r[..]);
                    if let Some(ch) = resolve_entity(&name) {
                        push_captured(v, c, ch.encode_utf8(&mut [0u8; 4]));
                    }
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"formula1" | b"sqref" => capture = None,
                b"dataValidation" => {
                    if let Some((true, v)) = current.take() {
                        out.push(v);
                    }
                    capture = None;
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(part, e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}

fn push_captured(v: &mut ListValidation, capture: Capture, text: &str) {
    match capture {
        Capture::Formula1 => v.formula1.push_str(text),
        Capture::Sqref => v.sqref.push_str(text),
    }
}

/// Whether any range of an sqref (`"F2:F100 H2"`, `"F:F"`) spans `column`.
fn sqref_covers_column(sqref: &str, column: u32) -> bool {
    sqref.split_whitespace().any(|part| {
        let (start, end) = part.split_once(':').unwrap_or((part, part));
        match (column_of(start), column_of(end)) {
            (Some(a), Some(b)) => a.min(b) <= column && column <= a.max(b),
            _ => false,
        }
    })
}

// ============================================================================
// List sources
// ============================================================================

/// Parse list source from formula1
fn parse_list_source(formula1: &str) -> Option<ListSource> {
    let formula1 = formula1.trim();
    let formula1 = formula1.strip_prefix('=').unwrap_or(formula1);

    if formula1.is_empty() {
        return None;
    }

    // Inline list: starts and ends with quotes, comma-separated
    if formula1.len() >= 2 && formula1.starts_with('"') && formula1.ends_with('"') {
        let inner = &formula1[1..formula1.len() - 1];
        return Some(ListSource::Inline(inner.split(',').map(|s| s.to_string()).collect()));
    }

    if formula1.contains('$') || formula1.contains(':') || formula1.contains('!') {
        return parse_block(formula1).map(ListSource::Range);
    }

    Some(ListSource::NamedRange(formula1.to_string()))
}

/// Parse `[Sheet!]$A$1[:$A$9]` into a cell block.
fn parse_block(reference: &str) -> Option<CellBlock> {
    let reference = reference.trim();
    let reference = reference.strip_prefix('=').unwrap_or(reference);

    let (sheet, cells) = match reference.rsplit_once('!') {
        Some((sheet, cells)) => (Some(unquote_sheet(sheet)), cells),
        None => (None, reference),
    };

    let (start, end) = cells.split_once(':').unwrap_or((cells, cells));
    let (first_row, first_col) = parse_cell_ref(start)?;
    let (last_row, last_col) = parse_cell_ref(end)?;

    Some(CellBlock {
        sheet,
        first_row: first_row.min(last_row),
        first_col: first_col.min(last_col),
        last_row: first_row.max(last_row),
        last_col: first_col.max(last_col),
    })
}

/// `'My Lists'` → `My Lists`, with doubled quotes collapsed.
fn unquote_sheet(sheet: &str) -> String {
    let sheet = sheet.trim();
    match sheet.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        Some(inner) => inner.replace("''", "'"),
        None => sheet.to_string(),
    }
}

fn read_block(path: &Path, default_sheet: &str, block: &CellBlock) -> Result<Vec<String>> {
    let sheet = block.sheet.as_deref().unwrap_or(default_sheet);
    let grid = xlsx::open_grid(path, &SheetSelector::Name(sheet.to_string()))?;

    let mut values = Vec::new();
    for row in block.first_row..=block.last_row.min(grid.last_row()) {
        for col in block.first_col..=block.last_col {
            if let Some(v) = grid.value(row, col) {
                values.push(v.as_text());
            }
        }
    }
    Ok(values)
}

/// Parse a cell reference like "A1" or "$A$1" into 1-based (row, col)
fn parse_cell_ref(cell_ref: &str) -> Option<(u32, u32)> {
    let cell_ref = cell_ref.replace('$', "");
    let cell_ref = cell_ref.trim();

    let split = cell_ref.find(|c: char| c.is_ascii_digit())?;
    if split == 0 {
        return None;
    }
    let col = col_from_letters(&cell_ref[..split])?;
    let row: u32 = cell_ref[split..].parse().ok()?;
    (row > 0).then_some((row, col))
}

/// Column of a cell reference or a bare column (`"F"` in `"F:F"`).
fn column_of(cell_ref: &str) -> Option<u32> {
    let cell_ref = cell_ref.replace('$', "");
    let letters: String = cell_ref.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    col_from_letters(&letters)
}

/// Convert column letters to a 1-based index (A=1, Z=26, AA=27)
fn col_from_letters(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut col = 0u32;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        col = col.checked_mul(26)?.checked_add(c.to_ascii_uppercase() as u32 - 'A' as u32 + 1)?;
    }
    Some(col)
}

// ============================================================================
// Tests
// ============================================================================
