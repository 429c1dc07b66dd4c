// CSV/TSV import into cell grids

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use eancheck_recon::grid::CellGrid;

use crate::error::{IoError, Result};
use crate::xlsx::SheetGrid;

/// Load a delimited text file as a grid. `.tsv` files are tab-separated,
/// anything else is sniffed.
pub fn open_grid(path: &Path) -> Result<SheetGrid> {
    let content = read_file_as_utf8(path)?;
    let is_tsv = path.extension().is_some_and(|e| e.eq_ignore_ascii_case("tsv"));
    let delimiter = if is_tsv { b'\t' } else { sniff_delimiter(&content) };
    grid_from_string(&content, delimiter, &sheet_name_for(path))
}

fn sheet_name_for(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "csv".into())
}

/// Candidate delimiters; later entries win ties.
const DELIMITERS: [u8; 4] = [b'|', b',', b';', b'\t'];

/// Pick the delimiter whose most common field count (above one) covers the
/// most sampled lines, weighted by that count. Blank lines are not sampled.
/// One identifier per line, the usual reference export, falls back to a comma.
fn sniff_delimiter(content: &str) -> u8 {
    let sample: Vec<&str> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(20)
        .collect();

    DELIMITERS
        .iter()
        .filter_map(|&delimiter| {
            let mut widths: HashMap<usize, usize> = HashMap::new();
            for line in &sample {
                *widths.entry(field_count(line, delimiter)).or_default() += 1;
            }
            let (width, lines) = widths
                .into_iter()
                .filter(|&(width, _)| width > 1)
                .max_by_key(|&(width, lines)| (lines, width))?;
            Some((lines * width, delimiter))
        })
        .max_by_key(|&(score, _)| score)
        .map(|(_, delimiter)| delimiter)
        .unwrap_or(b',')
}

fn field_count(line: &str, delimiter: u8) -> usize {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes())
        .records()
        .next()
        .and_then(|r| r.ok())
        .map_or(1, |r| r.len())
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(path).map_err(|source| IoError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|source| IoError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            // Excel-exported CSVs are usually Windows-1252
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

fn grid_from_string(content: &str, delimiter: u8, name: &str) -> Result<SheetGrid> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut grid = SheetGrid::empty(name);
    for (row_idx, result) in reader.records().enumerate() {
        let record = result?;
        for (col_idx, field) in record.iter().enumerate() {
            if !field.trim().is_empty() {
                grid.set_text(row_idx as u32 + 1, col_idx as u32 + 1, field);
            }
        }
    }

    tracing::debug!(sheet = name, rows = grid.last_row(), "csv grid loaded");
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use eancheck_recon::grid::CellValue;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn sniff_semicolon() {
        let content = "ean;name\n4012345678901;Shoes\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn sniff_ignores_a_ragged_title_line() {
        let content = "Vendor export, March\n\nean;name;qty\n4012345678901;Shoes;2\n00123456789012;Hat;1\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn single_column_defaults_to_comma() {
        assert_eq!(sniff_delimiter("4012345678901\n00123456789012\n"), b',');
        assert_eq!(sniff_delimiter(""), b',');
    }

    #[test]
    fn tsv_extension_forces_tab() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("codes.tsv");
        fs::write(&path, "4012345678901;x\t12345678\n").unwrap();
        let grid = open_grid(&path).unwrap();
        assert_eq!(grid.value(1, 1), Some(CellValue::Text("4012345678901;x".into())));
        assert_eq!(grid.value(1, 2), Some(CellValue::Text("12345678".into())));
    }

    #[test]
    fn open_grid_reads_text_cells() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vendor.csv");
        fs::write(&path, "ean,name\n00123456789012,Shoes\n,\n4012345678901,Hat\n").unwrap();

        let grid = open_grid(&path).unwrap();
        assert_eq!(grid.sheet_name(), "vendor");
        assert_eq!(grid.last_row(), 4);
        assert_eq!(grid.value(2, 1), Some(CellValue::Text("00123456789012".into())));
        assert!(!grid.has_value(3, 1));
    }

    #[test]
    fn windows_1252_is_decoded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin.csv");
        fs::write(&path, b"caf\xe9,12345678\n").unwrap();
        let grid = open_grid(&path).unwrap();
        assert_eq!(grid.value(1, 1), Some(CellValue::Text("café".into())));
    }
}
